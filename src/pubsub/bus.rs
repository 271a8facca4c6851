//! Broadcast bus shared by the handler and whoever produces reload events.

use tokio::sync::broadcast::{self, error::RecvError};

/// A message published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Topic name, e.g. `page:reload`.
    pub topic: String,
    /// Opaque payload forwarded to subscribers.
    pub payload: String,
}

/// Cloneable handle to the bus.
#[derive(Debug, Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Create a bus that buffers up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, topic: impl Into<String>, payload: impl Into<String>) -> usize {
        let event = Event {
            topic: topic.into(),
            payload: payload.into(),
        };
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(topic = %event.topic, "No subscribers for event");
                0
            }
        }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Receiving end of the bus.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Next event, or `None` once every bus handle is gone.
    ///
    /// Events dropped because this subscriber fell behind are skipped.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Subscriber lagged, skipping events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = Bus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish("page:reload", "/index.html"), 2);

        let expected = Event {
            topic: "page:reload".into(),
            payload: "/index.html".into(),
        };
        assert_eq!(first.next().await, Some(expected.clone()));
        assert_eq!(second.next().await, Some(expected));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = Bus::default();
        assert_eq!(bus.publish("page:reload", ""), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let bus = Bus::new(1);
        let mut sub = bus.subscribe();
        bus.publish("a", "1");
        bus.publish("b", "2");

        assert_eq!(sub.next().await.map(|e| e.topic), Some("b".to_string()));
    }

    #[tokio::test]
    async fn subscription_ends_when_bus_is_dropped() {
        let bus = Bus::new(4);
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.next().await, None);
    }
}
