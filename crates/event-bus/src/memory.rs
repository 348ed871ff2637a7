use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{RwLock, mpsc};

use crate::{EventBus, EventBusError, EventEnvelope, EventId, Result, Subscription};

struct Subscriber {
    topics: Vec<String>,
    sender: mpsc::UnboundedSender<EventEnvelope>,
}

#[derive(Default)]
struct BusState {
    subscribers: Vec<Subscriber>,
    history: Option<Vec<EventEnvelope>>,
    closed: bool,
}

/// In-process event bus.
///
/// Every subscriber gets its own unbounded queue, so a slow consumer never
/// blocks publishers. Events are forgotten once fanned out unless the bus
/// was built with [`InMemoryEventBus::with_history`], which keeps them for
/// inspection and for [`InMemoryEventBus::redeliver`].
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<RwLock<BusState>>,
}

impl InMemoryEventBus {
    /// Creates a new bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus that records every published event.
    pub fn with_history() -> Self {
        let state = BusState {
            history: Some(Vec::new()),
            ..BusState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Returns every event published so far, in publication order.
    ///
    /// Always empty for a bus without history.
    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.state.read().await.history.clone().unwrap_or_default()
    }

    /// Returns the events published on a single topic.
    pub async fn published_on(&self, topic: &str) -> Vec<EventEnvelope> {
        self.state
            .read()
            .await
            .history
            .iter()
            .flatten()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Delivers an already-published event to its subscribers again, as a
    /// broker would after a consumer failed to acknowledge it.
    ///
    /// Returns false if no event with this id is in the history.
    pub async fn redeliver(&self, event_id: EventId) -> bool {
        let mut state = self.state.write().await;
        let Some(event) = state
            .history
            .iter()
            .flatten()
            .find(|e| e.event_id == event_id)
            .cloned()
        else {
            return false;
        };
        Self::fan_out(&mut state, &event);
        true
    }

    /// Stops accepting events and ends every subscription stream.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        state.subscribers.clear();
    }

    fn fan_out(state: &mut BusState, event: &EventEnvelope) {
        // Drop subscribers whose receiving side has gone away.
        state.subscribers.retain(|sub| {
            if !sub.topics.iter().any(|t| t == &event.topic) {
                return !sub.sender.is_closed();
            }
            sub.sender.send(event.clone()).is_ok()
        });
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(EventBusError::Closed);
        }

        tracing::debug!(topic = %event.topic, event_id = %event.event_id, "publishing event");
        metrics::counter!("event_bus_published_total", "topic" => event.topic.clone())
            .increment(1);

        Self::fan_out(&mut state, &event);
        if let Some(history) = state.history.as_mut() {
            history.push(event);
        }
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> Result<Subscription> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(EventBusError::Closed);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.subscribers.push(Subscriber {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            sender,
        });

        let stream = stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(Box::pin(stream))
    }
}
