use futures_util::StreamExt;
use people_core::{
    ChangeSubscription, ClientError, NewPerson, ObserverId, PeopleConfig, PeopleRuntime, Person,
    PersonListStream, PersonPatch, PersonResolver, ProviderError, ProviderRequest,
    ProviderResponse, ProviderResult, ProviderTransport, ResourceScope, TransportError,
    TransportResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(50);

fn runtime() -> PeopleRuntime {
    PeopleRuntime::compose(&PeopleConfig::default()).unwrap()
}

async fn next_list(stream: &mut PersonListStream<ClientError>) -> Vec<Person> {
    timeout(WAIT, stream.next())
        .await
        .expect("emission should arrive")
        .expect("stream should stay open")
        .expect("emission should be ok")
}

async fn run_scenario<T: ProviderTransport + 'static>(resolver: PersonResolver<T>) {
    let mut stream = resolver.list();
    assert!(next_list(&mut stream).await.is_empty());

    let id = resolver
        .insert(&NewPerson::new("Jacob42", 55))
        .unwrap()
        .unwrap();
    assert_eq!(id, 1);
    assert_eq!(
        next_list(&mut stream).await,
        vec![Person {
            id: 1,
            name: "Jacob42".to_string(),
            age: 55
        }]
    );

    resolver.update_fields(id, &PersonPatch::age(60)).unwrap();
    let updated = next_list(&mut stream).await;
    assert_eq!(updated[0].age, 60);
    assert_eq!(updated[0].name, "Jacob42");

    resolver.delete(&updated[0]).unwrap();
    assert!(next_list(&mut stream).await.is_empty());

    assert!(timeout(QUIET, stream.next()).await.is_err());
}

#[tokio::test]
async fn scenario_over_local_transport() {
    run_scenario(runtime().local_resolver()).await;
}

#[tokio::test]
async fn scenario_over_json_transport() {
    run_scenario(runtime().json_resolver()).await;
}

#[tokio::test]
async fn dropping_list_stream_unregisters_observer() {
    let runtime = runtime();
    let resolver = runtime.local_resolver();
    let notifier = runtime.provider().notifier().clone();

    let mut stream = resolver.list();
    next_list(&mut stream).await;
    assert_eq!(notifier.observer_count(), 1);

    drop(stream);
    assert_eq!(notifier.observer_count(), 0);

    resolver.insert(&NewPerson::new("Ada", 36)).unwrap();
    assert_eq!(notifier.observer_count(), 0);
}

#[tokio::test]
async fn cancelled_consumer_task_releases_registration() {
    let runtime = runtime();
    let resolver = runtime.json_resolver();
    let notifier = runtime.provider().notifier().clone();

    let mut stream = resolver.list();
    let task = tokio::spawn(async move { while stream.next().await.is_some() {} });

    timeout(WAIT, async {
        while notifier.observer_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("observer should register");

    task.abort();
    let _ = task.await;
    assert_eq!(notifier.observer_count(), 0);
}

#[tokio::test]
async fn stream_is_lazy_until_polled() {
    let runtime = runtime();
    let resolver = runtime.local_resolver();

    let stream = resolver.list();
    assert_eq!(runtime.provider().notifier().observer_count(), 0);
    drop(stream);
}

#[test]
fn transport_failure_is_distinct_from_not_found() {
    let runtime = runtime();
    let resolver = runtime.json_resolver();

    let missing = resolver
        .update_fields(404, &PersonPatch::name("Nobody"))
        .unwrap_err();
    assert!(matches!(
        missing,
        ClientError::Provider(ProviderError::NotFound(404))
    ));

    resolver.transport().disconnect();
    let unreachable = resolver.fetch_all().unwrap_err();
    assert!(matches!(
        unreachable,
        ClientError::Transport(TransportError::Disconnected)
    ));

    resolver.transport().reconnect();
    assert!(resolver.fetch_all().unwrap().is_empty());
}

#[tokio::test]
async fn list_yields_transport_error_and_ends() {
    let runtime = runtime();
    let resolver = runtime.local_resolver();
    resolver.transport().disconnect();

    let mut stream = resolver.list();
    let first = timeout(WAIT, stream.next()).await.unwrap().unwrap();
    assert!(matches!(
        first,
        Err(ClientError::Transport(TransportError::Disconnected))
    ));
    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
}

#[test]
fn fetch_by_name_and_full_update_go_through_provider() {
    let runtime = runtime();
    let resolver = runtime.json_resolver();
    let id = resolver
        .insert(&NewPerson::new("Ada", 36))
        .unwrap()
        .unwrap();
    resolver.insert(&NewPerson::new("Bob", 40)).unwrap();

    let mut ada = resolver.fetch_by_name("Ada").unwrap().remove(0);
    assert_eq!(ada.id, id);

    ada.name = "Grace".to_string();
    ada.age = 85;
    assert_eq!(resolver.update(&ada).unwrap(), 1);
    assert!(resolver.fetch_by_name("Ada").unwrap().is_empty());
    assert_eq!(runtime.store().get_by_id(id).unwrap().unwrap(), ada);
}

/// Transport whose provider answers every call with the wrong response kind.
struct MismatchedTransport;

impl ProviderTransport for MismatchedTransport {
    fn call(&self, _request: ProviderRequest) -> TransportResult<ProviderResult<ProviderResponse>> {
        Ok(Ok(ProviderResponse::Affected { count: 0 }))
    }

    fn register_observer(
        &self,
        _scope: &ResourceScope,
        _descendants: bool,
    ) -> TransportResult<ChangeSubscription> {
        Err(TransportError::Disconnected)
    }

    fn unregister_observer(&self, _id: ObserverId) -> TransportResult<bool> {
        Ok(false)
    }
}

#[test]
fn mismatched_response_kind_is_reported() {
    let resolver = PersonResolver::new(Arc::new(MismatchedTransport));
    assert!(matches!(
        resolver.fetch_all(),
        Err(ClientError::UnexpectedResponse(_))
    ));
    assert!(matches!(
        resolver.insert(&NewPerson::new("Ada", 1)),
        Err(ClientError::UnexpectedResponse(_))
    ));
}

fn assert_exact_name_lookup<T: ProviderTransport + 'static>(
    runtime: &PeopleRuntime,
    resolver: &PersonResolver<T>,
) {
    for name in ["", "Ada ", "AC/DC", "Ada", "50%"] {
        let through_resolver = resolver.fetch_by_name(name).unwrap();
        assert_eq!(
            through_resolver,
            runtime.store().select_by_name(name).unwrap(),
            "name {name:?}"
        );
        assert!(through_resolver.iter().all(|person| person.name == name));
    }
}

#[test]
fn fetch_by_name_matches_exact_names_only() {
    let runtime = runtime();
    let resolver = runtime.json_resolver();
    for (name, age) in [("Ada", 36), ("Ada ", 40), ("AC/DC", 50), ("", 5), ("50%", 1)] {
        resolver.insert(&NewPerson::new(name, age)).unwrap();
    }

    assert_eq!(resolver.fetch_by_name("").unwrap()[0].age, 5);
    assert_eq!(resolver.fetch_by_name("Ada ").unwrap()[0].id, 2);
    assert_eq!(resolver.fetch_by_name("AC/DC").unwrap()[0].age, 50);
    assert!(resolver.fetch_by_name("AC").unwrap().is_empty());

    assert_exact_name_lookup(&runtime, &resolver);
    assert_exact_name_lookup(&runtime, &runtime.local_resolver());
}

#[tokio::test]
async fn burst_of_changes_refreshes_once() {
    let runtime = runtime();
    let resolver = runtime.local_resolver();
    let mut stream = resolver.list();
    assert!(next_list(&mut stream).await.is_empty());

    for n in 0..5 {
        resolver.insert(&NewPerson::new(format!("P{n}"), n)).unwrap();
    }

    assert_eq!(next_list(&mut stream).await.len(), 5);
    assert!(timeout(QUIET, stream.next()).await.is_err());
}

#[test]
fn delete_by_id_needs_no_prior_fetch() {
    let runtime = runtime();
    let resolver = runtime.json_resolver();
    let id = resolver
        .insert(&NewPerson::new("Ada", 36))
        .unwrap()
        .unwrap();

    assert_eq!(resolver.delete_by_id(id).unwrap(), 1);
    assert_eq!(resolver.delete_by_id(id).unwrap(), 0);
    assert!(runtime.store().select_all().unwrap().is_empty());
}
