//! Broadcast bus fanning inbound messages out to all observers.
//!
//! Built on `tokio::sync::broadcast`: every envelope the transport delivers
//! reaches every current subscriber (correlation waiters, the trigger
//! dispatcher), in delivery order. Publishing with no subscribers is a
//! no-op; dropping a receiver deregisters the observer.

use semparar_types::message::InboundEnvelope;
use tokio::sync::broadcast;

/// Multi-consumer broadcast stream of inbound bus traffic.
///
/// Cloning the bus clones the sender, allowing multiple producers and
/// consumers over the same channel.
pub struct InboundBus {
    sender: broadcast::Sender<InboundEnvelope>,
}

impl InboundBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new observer that will receive all future envelopes.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEnvelope> {
        self.sender.subscribe()
    }

    /// Fan an envelope out to all current observers.
    ///
    /// Silently dropped when nobody is listening.
    pub fn publish(&self, envelope: InboundEnvelope) {
        let _ = self.sender.send(envelope);
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for InboundBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for InboundBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
