//! Broadcast bus for [`RunEvent`]s.
//!
//! Publishing with no active subscribers is a no-op. Slow subscribers may
//! observe `RecvError::Lagged` and should re-read run state from the store.

use orcha_types::event::RunEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus for run lifecycle events.
///
/// Cloning the bus clones the sender, so every substrate context can publish
/// into the same channel.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
