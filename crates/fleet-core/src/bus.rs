//! In-process event bus.
//!
//! All state and job updates flow through a single broadcast channel.
//! Delivery is best-effort fire-and-forget: no buffering beyond the channel
//! capacity, no replay for late subscribers. Subscribers hold independent
//! receivers, so one slow or failing subscriber never blocks the others.
//!
//! The bus is an explicitly constructed object handed to the components
//! that need it, never a module-level singleton.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::event::{FleetEvent, Topic};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Event bus carrying the `state` and `job` topics.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FleetEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many events are buffered for slow
    /// subscribers before they start observing lag.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Number of current subscribers across both topics.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns `true` if at least one subscriber received the event. With
    /// no subscribers the event is discarded, which is not an error.
    pub fn publish(&self, event: FleetEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Subscribe to every event on both topics.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to a single topic.
    ///
    /// Dropping the returned receiver is the unsubscribe operation.
    pub fn subscribe_topic(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            rx: self.tx.subscribe(),
            topic,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared event bus handle.
pub type SharedEventBus = Arc<EventBus>;

/// Receiver for all events from the event bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<FleetEvent>,
}

impl EventBusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once the bus is closed. A lagged receiver skips the
    /// dropped events and keeps receiving.
    pub async fn recv(&mut self) -> Option<FleetEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<FleetEvent> {
        self.rx.try_recv().ok()
    }

    /// Get the underlying broadcast receiver.
    pub fn into_inner(self) -> broadcast::Receiver<FleetEvent> {
        self.rx
    }
}

/// Receiver for a single topic.
pub struct TopicReceiver {
    rx: broadcast::Receiver<FleetEvent>,
    topic: Topic,
}

impl TopicReceiver {
    /// The topic this receiver is subscribed to.
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Receive the next event on this topic.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<FleetEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.topic() == self.topic => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<FleetEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if event.topic() == self.topic {
                return Some(event);
            }
        }
        None
    }
}
