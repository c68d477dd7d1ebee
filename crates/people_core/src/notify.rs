//! Scoped, payload-less change notification.
//!
//! # Responsibility
//! - Keep a registry of observers keyed by resource scope.
//! - Wake matching observers when a scope is published.
//!
//! # Invariants
//! - Registration, removal and fan-out share one lock; a publish never
//!   reaches an observer that was removed before it took the lock.
//! - Signalling never blocks, so publishing under the lock cannot deadlock.
//! - Every publish delivers exactly one signal to each matching observer.
//! - Unsubscribing is idempotent; dropping a `ChangeSubscription` unsubscribes.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque observer handle, stable across transports.
pub type ObserverId = Uuid;

/// "Something under this scope changed." Carries nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal;

/// Normalized resource path, compared segment by segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceScope {
    segments: Vec<String>,
}

impl ResourceScope {
    /// Parses `/a/b`, `a/b/` and `a//b` into the same scope.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns whether `self` equals `other` or lies below it.
    pub fn is_within(&self, other: &ResourceScope) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Returns the scope of a direct child named `segment`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

impl Display for ResourceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

struct Registration {
    scope: ResourceScope,
    descendants: bool,
    sender: mpsc::UnboundedSender<ChangeSignal>,
}

impl Registration {
    fn matches(&self, published: &ResourceScope) -> bool {
        self.scope.is_within(published) || (self.descendants && published.is_within(&self.scope))
    }
}

type Registry = Mutex<HashMap<ObserverId, Registration>>;

/// Publish/subscribe hub for change signals.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Registry>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for `scope`.
    ///
    /// The observer is woken by publishes on `scope` itself and on any scope
    /// above it. With `descendants`, publishes below `scope` wake it too.
    pub fn subscribe(&self, scope: &ResourceScope, descendants: bool) -> ChangeSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.registry.lock().insert(
            id,
            Registration {
                scope: scope.clone(),
                descendants,
                sender,
            },
        );
        debug!("event=observer_register module=notify status=ok id={id} scope={scope}");

        ChangeSubscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes the observer `id`. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        remove_registration(&self.registry, id)
    }

    /// Signals every observer matching `scope` and returns how many were
    /// signalled.
    pub fn publish(&self, scope: &ResourceScope) -> usize {
        let mut registry = self.registry.lock();
        let mut delivered = 0;
        registry.retain(|_, registration| {
            if !registration.matches(scope) {
                return true;
            }
            match registration.sender.send(ChangeSignal) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                // Receiver already dropped; its guard has not run yet.
                Err(_) => false,
            }
        });
        debug!("event=change_publish module=notify status=ok scope={scope} delivered={delivered}");
        delivered
    }

    /// Number of live registrations.
    pub fn observer_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Live observer registration.
///
/// Dropping it removes the registration.
pub struct ChangeSubscription {
    id: ObserverId,
    receiver: mpsc::UnboundedReceiver<ChangeSignal>,
    registry: Weak<Registry>,
}

impl ChangeSubscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Waits for the next signal.
    ///
    /// Returns `None` once the registration was removed and every pending
    /// signal has been consumed.
    pub async fn changed(&mut self) -> Option<ChangeSignal> {
        self.receiver.recv().await
    }

    /// Returns a pending signal without waiting.
    pub fn try_changed(&mut self) -> Option<ChangeSignal> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove_registration(&registry, self.id);
        }
    }
}

fn remove_registration(registry: &Registry, id: ObserverId) -> bool {
    let removed = registry.lock().remove(&id).is_some();
    if removed {
        debug!("event=observer_unregister module=notify status=ok id={id}");
    }
    removed
}
