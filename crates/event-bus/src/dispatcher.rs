//! Drives event handlers from bus subscriptions.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::{EventBus, EventEnvelope, HandlerError, Result};

/// A consumer of bus events.
///
/// Handlers must be idempotent: the same event may be delivered more than
/// once, and the handler is expected to re-check current state before each
/// transition rather than rely on delivery being unique.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the handler name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns the topics this handler consumes.
    fn topics(&self) -> &'static [&'static str];

    /// Handles a single delivered event.
    async fn handle(&self, event: &EventEnvelope) -> std::result::Result<(), HandlerError>;
}

/// Invokes a handler for one event, logging (never propagating) failures.
///
/// Returns true if the handler succeeded.
pub async fn dispatch(handler: &dyn EventHandler, event: &EventEnvelope) -> bool {
    match handler.handle(event).await {
        Ok(()) => true,
        Err(err) => {
            metrics::counter!("event_handler_failures_total", "handler" => handler.name())
                .increment(1);
            tracing::error!(
                handler = handler.name(),
                topic = %event.topic,
                event_id = %event.event_id,
                error = %err,
                "event handler failed"
            );
            false
        }
    }
}

/// Subscribes `handler` to its topics and processes events on a background
/// task until the subscription ends.
pub async fn spawn_handler<B>(bus: &B, handler: Arc<dyn EventHandler>) -> Result<JoinHandle<()>>
where
    B: EventBus + ?Sized,
{
    let mut subscription = bus.subscribe(handler.topics()).await?;
    tracing::info!(handler = handler.name(), topics = ?handler.topics(), "handler subscribed");

    Ok(tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            dispatch(handler.as_ref(), &event).await;
        }
        tracing::info!(handler = handler.name(), "subscription ended");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventBusExt, InMemoryEventBus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        seen: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn topics(&self) -> &'static [&'static str] {
            &["probe"]
        }

        async fn handle(&self, _event: &EventEnvelope) -> std::result::Result<(), HandlerError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HandlerError::failed("boom"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_reports_failure_without_panicking() {
        let seen = Arc::new(AtomicUsize::new(0));
        let handler = Counting {
            seen: seen.clone(),
            fail: true,
        };
        let event = EventEnvelope::builder()
            .topic("probe")
            .payload_raw(serde_json::json!({}))
            .try_build()
            .unwrap();

        assert!(!dispatch(&handler, &event).await);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawned_handler_keeps_consuming_after_failures() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Counting {
            seen: seen.clone(),
            fail: true,
        });

        let task = spawn_handler(&bus, handler).await.unwrap();
        for _ in 0..3 {
            bus.publish_json("probe", "k".to_string(), &serde_json::json!({}))
                .await
                .unwrap();
        }
        bus.close().await;
        task.await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
