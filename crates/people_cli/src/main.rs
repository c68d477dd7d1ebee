//! People CLI.
//!
//! # Responsibility
//! - Drive `people_core` the way a list screen would: list, add, edit,
//!   delete, and watch the list refresh.
//! - Keep output line-oriented and deterministic for scripting.

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use people_core::{
    ClientError, NewPerson, PeopleConfig, PeopleRuntime, Person, PersonListStream, PersonPatch,
    PersonResolver, ProviderTransport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const DEMO_SETTLE: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "people", version, about = "Person records with change observation")]
struct Cli {
    /// SQLite file; defaults to PEOPLE_DB_PATH, then an in-memory table.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Route calls through the JSON wire format instead of direct calls.
    #[arg(long, global = true)]
    wire: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every person in insertion order.
    List,
    /// Print the people with exactly this name.
    Find { name: String },
    /// Add a person and print the assigned id.
    Add { name: String, age: i64 },
    /// Change the name and/or age of a person.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<i64>,
    },
    /// Delete a person by id.
    Delete { id: i64 },
    /// Run an add/edit/delete session while a second observer prints every
    /// refreshed list.
    Demo {
        /// Observe the store directly instead of through the resolver.
        #[arg(long)]
        direct: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = PeopleConfig::from_env();
    if cli.db.is_some() {
        config.db_path = cli.db.clone();
    }
    if let Err(err) = PeopleRuntime::init_logging(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let runtime = match PeopleRuntime::compose(&config) {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.wire {
        run(cli.command, &runtime, runtime.json_resolver()).await
    } else {
        run(cli.command, &runtime, runtime.local_resolver()).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run<T: ProviderTransport + 'static>(
    command: Command,
    runtime: &PeopleRuntime,
    resolver: PersonResolver<T>,
) -> Result<(), ClientError> {
    match command {
        Command::List => print_people(&resolver.fetch_all()?),
        Command::Find { name } => print_people(&resolver.fetch_by_name(&name)?),
        Command::Add { name, age } => match resolver.insert(&NewPerson::new(name, age))? {
            Some(id) => println!("added id={id}"),
            None => println!("skipped"),
        },
        Command::Update { id, name, age } => {
            let count = resolver.update_fields(id, &PersonPatch { name, age })?;
            println!("updated count={count}");
        }
        Command::Delete { id } => {
            let count = resolver.delete_by_id(id)?;
            println!("deleted count={count}");
        }
        Command::Demo { direct } => {
            let observed: PersonListStream<String> = if direct {
                Box::pin(
                    runtime
                        .store()
                        .observe()
                        .map(|item| item.map_err(|err| err.to_string())),
                )
            } else {
                Box::pin(
                    resolver
                        .list()
                        .map(|item| item.map_err(|err| err.to_string())),
                )
            };
            run_demo(&resolver, observed).await?;
        }
    }
    Ok(())
}

async fn run_demo<T: ProviderTransport + 'static>(
    resolver: &PersonResolver<T>,
    mut observed: PersonListStream<String>,
) -> Result<(), ClientError> {
    let printer = tokio::spawn(async move {
        let mut emission = 0;
        while let Some(item) = observed.next().await {
            emission += 1;
            match item {
                Ok(people) => {
                    println!("-- emission {emission}: {} person(s)", people.len());
                    print_people(&people);
                }
                Err(err) => {
                    println!("-- emission {emission}: error {err}");
                    break;
                }
            }
        }
    });

    tokio::time::sleep(DEMO_SETTLE).await;
    let count = resolver.fetch_all()?.len();
    let name = format!("Jacob{}", 10 + count);
    if let Some(id) = resolver.insert(&NewPerson::new(name, 55))? {
        tokio::time::sleep(DEMO_SETTLE).await;
        resolver.update_fields(id, &PersonPatch::age(60))?;
        tokio::time::sleep(DEMO_SETTLE).await;
        if let Some(person) = resolver.fetch_all()?.into_iter().find(|p| p.id == id) {
            resolver.delete(&person)?;
        }
    }
    tokio::time::sleep(DEMO_SETTLE).await;

    printer.abort();
    let _ = printer.await;
    Ok(())
}

fn print_people(people: &[Person]) {
    for person in people {
        println!("{}\t{}\t{}", person.id, person.name, person.age);
    }
}
