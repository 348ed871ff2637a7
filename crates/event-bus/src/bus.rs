use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;

use crate::{EventEnvelope, EventBusError, Result};

/// A stream of delivered events.
pub type Subscription = Pin<Box<dyn Stream<Item = EventEnvelope> + Send>>;

/// Core trait for publish/subscribe implementations.
///
/// Delivery is at-least-once: a subscriber may observe the same event
/// (same [`crate::EventId`]) more than once and must tolerate it.
/// Publishing must happen only after the state change the event describes
/// has been committed.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes an event to every subscriber of its topic.
    async fn publish(&self, event: EventEnvelope) -> Result<()>;

    /// Subscribes to one or more topics.
    ///
    /// Only events published after the subscription is created are delivered.
    async fn subscribe(&self, topics: &[&str]) -> Result<Subscription>;
}

/// Extension trait providing convenience methods for event buses.
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Serializes a contract payload and publishes it on `topic`.
    async fn publish_json<T: Serialize + Sync>(
        &self,
        topic: &str,
        key: String,
        payload: &T,
    ) -> Result<()> {
        let event = EventEnvelope::builder()
            .topic(topic)
            .key(key)
            .payload(payload)?
            .try_build()
            .ok_or_else(|| EventBusError::Delivery {
                topic: topic.to_string(),
                reason: "incomplete envelope".to_string(),
            })?;
        self.publish(event).await
    }
}

// Blanket implementation for all EventBus implementations
impl<T: EventBus + ?Sized> EventBusExt for T {}
