//! External event inboxes keyed by (instance id, event name).
//!
//! Events delivered before anyone waits are buffered; waiters registered
//! before delivery are served first come, first served. A waiter whose
//! receiver was dropped (it lost a race against a timer) is skipped.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use orcha_types::orchestration::EventResponse;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct Inbox {
    buffered: VecDeque<EventResponse>,
    waiters: VecDeque<oneshot::Sender<EventResponse>>,
}

#[derive(Debug, Clone, Default)]
pub struct EventInboxes {
    inboxes: Arc<DashMap<(String, String), Inbox>>,
}

impl EventInboxes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the next `event_name` event for an instance.
    pub fn wait(&self, instance_id: &str, event_name: &str) -> oneshot::Receiver<EventResponse> {
        let (tx, rx) = oneshot::channel();
        let mut inbox = self
            .inboxes
            .entry((instance_id.to_string(), event_name.to_string()))
            .or_default();
        match inbox.buffered.pop_front() {
            Some(payload) => {
                let _ = tx.send(payload);
            }
            None => {
                inbox.waiters.retain(|w| !w.is_closed());
                inbox.waiters.push_back(tx);
            }
        }
        rx
    }

    /// Deliver an event. Returns true when a live waiter received it.
    pub fn raise(&self, instance_id: &str, event_name: &str, payload: EventResponse) -> bool {
        let mut inbox = self
            .inboxes
            .entry((instance_id.to_string(), event_name.to_string()))
            .or_default();
        let mut payload = payload;
        while let Some(waiter) = inbox.waiters.pop_front() {
            match waiter.send(payload) {
                Ok(()) => return true,
                Err(returned) => payload = returned,
            }
        }
        inbox.buffered.push_back(payload);
        false
    }

    /// Events delivered to an instance but not consumed yet.
    pub fn buffered(&self, instance_id: &str, event_name: &str) -> usize {
        self.inboxes
            .get(&(instance_id.to_string(), event_name.to_string()))
            .map(|inbox| inbox.buffered.len())
            .unwrap_or(0)
    }

    /// True when no instance has a buffered event or a waiter.
    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// Drop every inbox of an instance.
    pub fn clear_instance(&self, instance_id: &str) {
        self.inboxes.retain(|(id, _), _| id != instance_id);
    }
}
