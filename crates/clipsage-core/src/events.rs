//! Change notification shared by all containers.
//!
//! Containers publish a [`StateChange`] after every mutation. A UI layer
//! subscribes once to the [`ChangeBus`] and re-reads whichever slice changed.

use serde::Serialize;
use tokio::sync::broadcast;

/// Which container emitted a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Notifications,
    Library,
    Search,
    Chat,
    Player,
}

/// A single field-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub store: StoreKind,
    pub field: &'static str,
}

/// Broadcast channel carrying every [`StateChange`].
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StateChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }

    /// A publisher bound to one container.
    pub fn notifier(&self, store: StoreKind) -> Notifier {
        Notifier {
            store,
            tx: self.tx.clone(),
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Publishes changes on behalf of one container.
#[derive(Debug, Clone)]
pub struct Notifier {
    store: StoreKind,
    tx: broadcast::Sender<StateChange>,
}

impl Notifier {
    pub fn store(&self) -> StoreKind {
        self.store
    }

    pub fn notify(&self, field: &'static str) {
        // No subscribers is fine.
        let _ = self.tx.send(StateChange {
            store: self.store,
            field,
        });
    }
}
