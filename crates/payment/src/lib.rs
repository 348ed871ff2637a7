//! Payment side of the court booking system.
//!
//! This crate provides:
//! - The payment coordinator and its pricing policy
//! - The checkout gateway capability with in-memory and HTTP adapters
//! - In-memory and PostgreSQL payment stores
//! - The bus handler that opens checkout for new bookings

pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod payment;
pub mod pricing;
pub mod store;

pub use coordinator::{CallbackResult, DEFAULT_GATEWAY_TIMEOUT, PaymentCoordinator};
pub use error::{GatewayError, PaymentError, Result, StoreError, StoreResult};
pub use gateway::{
    CheckoutGateway, CheckoutRequest, GatewayEvent, GatewaySession, HttpCheckoutGateway,
    HttpGatewayConfig, InMemoryCheckoutGateway, decode_webhook, webhook_body,
};
pub use handlers::BookingCreatedHandler;
pub use payment::{CheckoutSession, GatewayOutcome, Payment};
pub use pricing::{Price, PricingPolicy};
pub use store::{InMemoryPaymentStore, InsertOutcome, PaymentStore, PostgresPaymentStore, SettleOutcome};
