//! Broadcast fan-out of uploader events to any number of observers.

use pixelframe_core::{EventSink, UploaderEvent};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Event sink publishing to every current subscriber.
///
/// Emission never blocks. A subscriber that falls more than the channel
/// capacity behind loses the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UploaderEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploaderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: UploaderEvent) {
        tracing::trace!(event = event.name(), "Emitting event");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_events() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(UploaderEvent::ProcessStart);

        assert_eq!(a.recv().await.unwrap(), UploaderEvent::ProcessStart);
        assert_eq!(b.recv().await.unwrap(), UploaderEvent::ProcessStart);
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::default().emit(UploaderEvent::ProcessEnd);
    }
}
