use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 100;

type Erased = Arc<dyn Any + Send + Sync>;

/// A simple in-memory event bus, one broadcast channel per event type.
///
/// The action transport publishes every dispatch instance here when a bus is
/// configured, so subscribing to a handler type observes its dispatches.
#[derive(Clone)]
pub struct EventBus {
    // Map of Event Type -> Broadcast Sender
    channels: Arc<DashMap<TypeId, broadcast::Sender<Erased>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Publish an event. Returns the number of subscribers that received it;
    /// an event nobody subscribed to is dropped.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) -> usize {
        let type_id = TypeId::of::<E>();
        match self.channels.get(&type_id) {
            Some(sender) => sender.send(Arc::new(event)).unwrap_or(0),
            None => 0,
        }
    }

    /// Subscribe to events of type `E`.
    pub fn subscribe<E: Send + Sync + 'static>(&self) -> Subscription<E> {
        let type_id = TypeId::of::<E>();
        let sender = self
            .channels
            .entry(type_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Subscription {
            receiver: sender.subscribe(),
            _event: PhantomData,
        }
    }

    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.channels
            .get(&TypeId::of::<E>())
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Typed receiving end of [`EventBus::subscribe`].
pub struct Subscription<E> {
    receiver: broadcast::Receiver<Erased>,
    _event: PhantomData<fn() -> E>,
}

impl<E: Send + Sync + 'static> Subscription<E> {
    /// Wait for the next event. Returns `None` once the bus is gone.
    ///
    /// A subscriber that falls behind skips the events it missed.
    pub async fn recv(&mut self) -> Option<Arc<E>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Ok(event) = event.downcast::<E>() {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-published event, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<E>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Ok(event) = event.downcast::<E>() {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
