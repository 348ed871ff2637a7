//! Persistence for payments.

mod memory;
mod postgres;

pub use memory::InMemoryPaymentStore;
pub use postgres::PostgresPaymentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, PaymentStatus, UserId};

use crate::error::StoreResult;
use crate::payment::Payment;

/// Result of inserting a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A payment for the same booking already exists; nothing was written.
    DuplicateBooking,
}

/// Result of settling a pending payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The payment was PENDING and now carries the new status.
    Settled(Payment),
    /// The payment had already left PENDING; nothing changed.
    AlreadySettled(Payment),
    /// No payment references the session.
    NotFound,
}

/// Core trait for payment persistence backends.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a payment unless one exists for its booking.
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome>;

    /// Loads the payment for a booking.
    async fn find_by_booking(&self, booking_id: BookingId) -> StoreResult<Option<Payment>>;

    /// Loads the payment for a gateway session.
    async fn find_by_session(&self, session_id: &str) -> StoreResult<Option<Payment>>;

    /// Lists a user's payments, newest first.
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>>;

    /// Moves the session's payment from PENDING to `status` in one step.
    async fn settle_pending(
        &self,
        session_id: &str,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<SettleOutcome>;
}
