//! Checkout gateway capability and its adapters.

mod http;
mod memory;

pub use http::{HttpCheckoutGateway, HttpGatewayConfig};
pub use memory::InMemoryCheckoutGateway;

use async_trait::async_trait;
use common::{BookingId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::payment::GatewayOutcome;

/// Webhook type sent when a checkout session is paid.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Webhook type sent when a checkout session times out unpaid.
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";
/// Webhook type sent when a delayed payment method fails.
pub const CHECKOUT_ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";

/// What the coordinator asks the gateway to charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: i64,
    pub currency: String,
}

/// A session opened by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    pub url: String,
}

/// A decoded gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The session reached a terminal outcome.
    Outcome {
        outcome: GatewayOutcome,
        session_id: String,
    },
    /// A callback type this system does not act on.
    Ignored { event_type: String },
}

/// Core trait for payment gateway adapters.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Opens a checkout session and returns its id and redirect URL.
    async fn create_session(&self, request: &CheckoutRequest) -> Result<GatewaySession, GatewayError>;

    /// Decodes a raw callback body.
    fn decode_callback(&self, body: &[u8]) -> Result<GatewayEvent, GatewayError> {
        decode_webhook(body)
    }
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<WebhookData>,
}

#[derive(Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Deserialize)]
struct WebhookObject {
    id: String,
}

/// Decodes a `{"type": …, "data": {"object": {"id": …}}}` webhook body.
pub fn decode_webhook(body: &[u8]) -> Result<GatewayEvent, GatewayError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body)?;

    let outcome = match envelope.event_type.as_str() {
        CHECKOUT_COMPLETED => GatewayOutcome::Succeeded,
        CHECKOUT_EXPIRED => GatewayOutcome::Expired,
        CHECKOUT_ASYNC_PAYMENT_FAILED => GatewayOutcome::Failed,
        _ => {
            return Ok(GatewayEvent::Ignored {
                event_type: envelope.event_type,
            });
        }
    };

    let data = envelope
        .data
        .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("data"))?;

    Ok(GatewayEvent::Outcome {
        outcome,
        session_id: data.object.id,
    })
}

/// Builds a webhook body in the shape [`decode_webhook`] accepts.
pub fn webhook_body(event_type: &str, session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "type": event_type,
        "data": { "object": { "id": session_id } }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: serde_json::Value) -> Result<GatewayEvent, GatewayError> {
        decode_webhook(value.to_string().as_bytes())
    }

    #[test]
    fn decodes_known_types() {
        for (event_type, outcome) in [
            (CHECKOUT_COMPLETED, GatewayOutcome::Succeeded),
            (CHECKOUT_EXPIRED, GatewayOutcome::Expired),
            (CHECKOUT_ASYNC_PAYMENT_FAILED, GatewayOutcome::Failed),
        ] {
            assert_eq!(
                decode(webhook_body(event_type, "cs_42")).unwrap(),
                GatewayEvent::Outcome {
                    outcome,
                    session_id: "cs_42".to_string()
                }
            );
        }
    }

    #[test]
    fn unknown_types_are_ignored() {
        let event = decode(serde_json::json!({"type": "invoice.paid"})).unwrap();
        assert_eq!(
            event,
            GatewayEvent::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }

    #[test]
    fn known_type_without_session_is_malformed() {
        let err = decode(serde_json::json!({"type": CHECKOUT_COMPLETED})).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedCallback(_)));

        let err = decode_webhook(b"not json").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedCallback(_)));
    }
}
