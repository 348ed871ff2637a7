//! Event bus adapter for cross-service domain events.
//!
//! Delivery is at-least-once. Producers publish only after their local
//! transaction commits; consumers guard every transition with a check of
//! current state so that redelivery is harmless.

pub mod bus;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod memory;

pub use bus::{EventBus, EventBusExt, Subscription};
pub use dispatcher::{EventHandler, dispatch, spawn_handler};
pub use envelope::{EventEnvelope, EventEnvelopeBuilder, EventId};
pub use error::{EventBusError, HandlerError, Result};
pub use memory::InMemoryEventBus;
