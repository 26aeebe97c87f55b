use hearth_shared::HotelEvent;
use tokio::sync::broadcast;

/// Fan-out of domain events to live dashboard subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HotelEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: HotelEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for {}", name);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HotelEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
