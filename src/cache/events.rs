use tokio::sync::broadcast;
use tracing::trace;

use crate::ActiveReleaseKey;
use crate::Release;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseEventKind {
    /// A release took its active slot
    Activated,
    /// The occupant left its active slot and nothing replaced it
    Deactivated,
}

/// Published on every active slot transition, for the watch notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEvent {
    pub kind: ReleaseEventKind,
    pub key: ActiveReleaseKey,
    pub release_id: u64,
    pub release_name: String,
    pub version: u64,
}

impl ReleaseEvent {
    pub(crate) fn new(
        kind: ReleaseEventKind,
        release: &Release,
    ) -> Self {
        Self {
            kind,
            key: release.active_key(),
            release_id: release.id,
            release_name: release.name.clone(),
            version: release.version,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventPublisher {
    tx: broadcast::Sender<ReleaseEvent>,
}

impl EventPublisher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn publish(
        &self,
        event: ReleaseEvent,
    ) {
        // No subscriber is not an error, the notifier may attach later
        if let Err(e) = self.tx.send(event) {
            trace!("release event dropped, no subscriber: {:?}", e.0.key);
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ReleaseEvent> {
        self.tx.subscribe()
    }
}
