//! Observable person store.
//!
//! # Responsibility
//! - Own the single SQLite connection backing the people table.
//! - Serialize every read and write through one lock.
//! - Count successful mutations and fan full-table snapshots out to
//!   observers.
//!
//! # Invariants
//! - A snapshot is captured under the same lock as the mutation that
//!   triggered it, so observers see snapshots in mutation order.
//! - An observer that falls more than the channel capacity behind skips to
//!   the newest snapshot instead of replaying stale ones.
//! - Mutations that change no row neither bump the counter nor emit.
//! - `observe()` registers before it reads, so no mutation can fall between
//!   the initial snapshot and the first update.

use crate::db::{open_db, open_db_in_memory};
use crate::model::person::{NewPerson, Person, PersonId, PersonPatch};
use crate::repo::person_repo::{
    PersonRepository, SqlitePersonRepository, StoreError, StoreResult,
};
use futures_util::Stream;
use log::{debug, error, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Stream of full person lists, one item per observed change.
pub type PersonListStream<E> = Pin<Box<dyn Stream<Item = Result<Vec<Person>, E>> + Send>>;

struct StoreState {
    conn: Connection,
    change_count: u64,
}

/// Single-writer person store with change observation.
///
/// Construct once at composition time and share with `Arc`.
pub struct PersonStore {
    state: Mutex<StoreState>,
    snapshots: broadcast::Sender<Arc<Vec<Person>>>,
}

impl PersonStore {
    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(StoreState {
                conn,
                change_count: 0,
            }),
            snapshots,
        }
    }

    /// Opens (or creates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Inserts one person and returns the assigned id.
    ///
    /// Returns `Ok(None)` when the ignore-on-conflict policy skipped the row.
    pub fn insert(&self, person: &NewPerson) -> StoreResult<Option<PersonId>> {
        let mut state = self.state.lock();
        let id = SqlitePersonRepository::new(&state.conn).insert(person)?;
        match id {
            Some(id) => {
                debug!("event=person_insert module=store status=ok id={id}");
                self.record_change(&mut state);
            }
            None => info!("event=person_insert module=store status=ignored"),
        }
        Ok(id)
    }

    /// Applies the present fields of `patch` to the row with `id`.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when no row has `id`.
    pub fn update_by_id(&self, id: PersonId, patch: &PersonPatch) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let changed = SqlitePersonRepository::new(&state.conn).update_by_id(id, patch)?;
        debug!("event=person_update module=store status=ok id={id} changed={changed}");
        if changed > 0 {
            self.record_change(&mut state);
        }
        Ok(changed)
    }

    /// Deletes the row with `id`. Returns 0 when no such row exists.
    pub fn delete_by_id(&self, id: PersonId) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let changed = SqlitePersonRepository::new(&state.conn).delete_by_id(id)?;
        debug!("event=person_delete module=store status=ok id={id} changed={changed}");
        if changed > 0 {
            self.record_change(&mut state);
        }
        Ok(changed)
    }

    /// Deletes every row whose name equals `name` exactly.
    pub fn delete_by_name(&self, name: &str) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let changed = SqlitePersonRepository::new(&state.conn).delete_by_name(name)?;
        debug!("event=person_delete_by_name module=store status=ok changed={changed}");
        if changed > 0 {
            self.record_change(&mut state);
        }
        Ok(changed)
    }

    pub fn get_by_id(&self, id: PersonId) -> StoreResult<Option<Person>> {
        let state = self.state.lock();
        SqlitePersonRepository::new(&state.conn).get_by_id(id)
    }

    /// Returns every row in insertion order.
    pub fn select_all(&self) -> StoreResult<Vec<Person>> {
        let state = self.state.lock();
        SqlitePersonRepository::new(&state.conn).select_all()
    }

    /// Returns rows whose name equals `name` exactly, in insertion order.
    pub fn select_by_name(&self, name: &str) -> StoreResult<Vec<Person>> {
        let state = self.state.lock();
        SqlitePersonRepository::new(&state.conn).select_by_name(name)
    }

    /// Number of successful mutations since this store was opened.
    pub fn change_count(&self) -> u64 {
        self.state.lock().change_count
    }

    /// Observes the full person list.
    ///
    /// The stream yields the current list first, then one list after every
    /// mutation. Dropping the stream ends the observation.
    pub fn observe(&self) -> PersonListStream<StoreError> {
        let (initial, mut receiver) = {
            let state = self.state.lock();
            let receiver = self.snapshots.subscribe();
            (SqlitePersonRepository::new(&state.conn).select_all(), receiver)
        };

        Box::pin(async_stream::stream! {
            let failed = initial.is_err();
            yield initial;
            if failed {
                return;
            }

            loop {
                match receiver.recv().await {
                    Ok(snapshot) => yield Ok(snapshot.as_ref().clone()),
                    // Snapshots are complete lists, so a lagging observer
                    // jumps straight to the newest one.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("event=person_observe module=store status=lagged skipped={skipped}");
                        if let Some(latest) = drain_to_latest(&mut receiver) {
                            yield Ok(latest.as_ref().clone());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn record_change(&self, state: &mut StoreState) {
        state.change_count += 1;
        if self.snapshots.receiver_count() == 0 {
            return;
        }

        match SqlitePersonRepository::new(&state.conn).select_all() {
            Ok(people) => {
                let _ = self.snapshots.send(Arc::new(people));
            }
            Err(err) => error!(
                "event=person_snapshot module=store status=error change_count={} error={}",
                state.change_count, err
            ),
        }
    }
}

/// Consumes every buffered snapshot and returns the newest one.
fn drain_to_latest(
    receiver: &mut broadcast::Receiver<Arc<Vec<Person>>>,
) -> Option<Arc<Vec<Person>>> {
    let mut latest = None;
    loop {
        match receiver.try_recv() {
            Ok(snapshot) => latest = Some(snapshot),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return latest,
        }
    }
}
