//! Provider lifecycle events.

use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lag past this many events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle events emitted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The Kameleoon client is initialized and flags can be evaluated.
    Ready,
    /// Client creation or initialization failed, or the client reported it is not ready.
    Error,
}

/// Broadcasts [`ProviderEvent`]s to every subscriber.
///
/// Cloning yields another handle to the same channel, so an emitter created
/// before the provider can observe construction failures.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<ProviderEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a listener. Only events emitted after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ProviderEvent) {
        tracing::debug!("Emitting provider event {:?}", event);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
