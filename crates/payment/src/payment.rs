//! Payment model.

use chrono::{DateTime, Utc};
use common::{BookingId, PaymentEventPayload, PaymentId, PaymentStatus, UserId, topics};
use serde::{Deserialize, Serialize};

/// A charge attempt for one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_session_id: String,
    pub checkout_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Builds the payload published on `payment.*` topics.
    pub fn to_event(&self) -> PaymentEventPayload {
        PaymentEventPayload {
            payment_id: self.id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            amount: self.amount,
            currency: self.currency.clone(),
            status: self.status,
        }
    }
}

/// What the gateway reported about a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOutcome {
    Succeeded,
    Failed,
    Expired,
}

impl GatewayOutcome {
    /// Returns the payment status this outcome moves a PENDING payment to.
    pub fn status(&self) -> PaymentStatus {
        match self {
            GatewayOutcome::Succeeded => PaymentStatus::Completed,
            GatewayOutcome::Failed => PaymentStatus::Failed,
            GatewayOutcome::Expired => PaymentStatus::Expired,
        }
    }

    /// Returns the topic announcing the outcome.
    pub fn topic(&self) -> &'static str {
        match self {
            GatewayOutcome::Succeeded => topics::PAYMENT_CONFIRMED,
            GatewayOutcome::Failed => topics::PAYMENT_FAILED,
            GatewayOutcome::Expired => topics::PAYMENT_EXPIRED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayOutcome::Succeeded => "succeeded",
            GatewayOutcome::Failed => "failed",
            GatewayOutcome::Expired => "expired",
        }
    }
}

impl std::fmt::Display for GatewayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The redirect returned to a user starting checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub session_id: String,
    pub checkout_url: String,
    pub amount: i64,
    pub currency: String,
}

impl From<&Payment> for CheckoutSession {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            session_id: payment.external_session_id.clone(),
            checkout_url: payment.checkout_url.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
        }
    }
}
