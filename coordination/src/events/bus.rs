//! Event bus for coordination observers
//!
//! Tokio broadcast pub/sub. Publishing never blocks a coordination run and
//! succeeds whether or not anyone is listening.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::CoordinationEvent;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast event bus
pub struct EventBus {
    sender: broadcast::Sender<CoordinationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a bus with a custom lag buffer
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers; returns the receiver count
    pub fn publish(&self, event: CoordinationEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, receivers = count, "Event published");
                count
            }
            Err(_) => {
                debug!(event_type, "Event published (no receivers)");
                0
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinationEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events matching a filter
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by session ID
    pub session_id: Option<String>,
    /// Filter by participant; events without a participant pass
    pub workload_id: Option<String>,
    /// Filter by event types
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a new empty filter (matches all events)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn workload(mut self, workload_id: &str) -> Self {
        self.workload_id = Some(workload_id.to_string());
        self
    }

    pub fn types(mut self, event_types: Vec<&str>) -> Self {
        self.event_types = Some(event_types.into_iter().map(String::from).collect());
        self
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &CoordinationEvent) -> bool {
        if let Some(ref sid) = self.session_id {
            if event.session_id() != sid {
                return false;
            }
        }

        if let Some(ref wid) = self.workload_id {
            if let Some(event_wid) = event.workload_id() {
                if event_wid != wid {
                    return false;
                }
            }
        }

        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == event.event_type()) {
                return false;
            }
        }

        true
    }
}

/// Filtered event receiver that only yields matching events
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<CoordinationEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<CoordinationEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<CoordinationEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use chrono::Utc;

    fn closed(session_id: &str) -> CoordinationEvent {
        CoordinationEvent::SessionClosed {
            session_id: session_id.to_string(),
            status: SessionStatus::Completed,
            timestamp: Utc::now(),
        }
    }

    fn failed(session_id: &str, workload_id: &str) -> CoordinationEvent {
        CoordinationEvent::ParticipantFailed {
            session_id: session_id.to_string(),
            workload_id: workload_id.to_string(),
            round: 1,
            error: "backend down".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        assert_eq!(bus.publish(closed("s1")), 1);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "session_closed");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(!bus.has_subscribers());
        assert_eq!(bus.publish(closed("s1")), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new().shared();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(failed("s1", "cfo"));

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.event_type(), e2.event_type());
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::new()
            .session("s1")
            .workload("cfo")
            .types(vec!["participant_failed", "session_closed"]);

        assert!(filter.matches(&failed("s1", "cfo")));
        assert!(filter.matches(&closed("s1")));
        assert!(!filter.matches(&failed("s1", "cto")));
        assert!(!filter.matches(&failed("s2", "cfo")));
        assert!(!filter.matches(&CoordinationEvent::RoundCompleted {
            session_id: "s1".to_string(),
            round: 1,
            agreement: 1.0,
            timestamp: Utc::now(),
        }));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let bus = EventBus::new().shared();
        let mut filtered = bus.subscribe_filtered(EventFilter::new().session("target"));

        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish(closed("other"));
            publisher.publish(closed("target"));
        });

        let event = filtered.recv().await.unwrap();
        assert_eq!(event.session_id(), "target");
    }
}
