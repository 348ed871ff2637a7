//! HTTP checkout gateway.
//!
//! POSTs checkout requests as JSON to a configured endpoint and reads back
//! the `{id, url}` of the opened session.

use std::time::Duration;

use async_trait::async_trait;
use common::{BookingId, UserId};
use reqwest::Client;
use serde::Serialize;

use super::{CheckoutGateway, CheckoutRequest, GatewaySession};
use crate::error::GatewayError;

/// HTTP gateway configuration.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Endpoint receiving checkout requests.
    pub endpoint: String,

    /// Where the gateway sends the user after paying.
    pub success_url: String,

    /// Where the gateway sends the user after abandoning checkout.
    pub cancel_url: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            success_url: "http://localhost:3000/payment/success".to_string(),
            cancel_url: "http://localhost:3000/payment/cancel".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequestBody<'a> {
    amount: i64,
    currency: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
    metadata: SessionMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetadata {
    booking_id: BookingId,
    user_id: UserId,
}

/// Checkout gateway speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCheckoutGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpCheckoutGateway {
    /// Creates a new HTTP gateway with the given configuration.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        if config.endpoint.is_empty() {
            return Err(GatewayError::NotConfigured(
                "gateway endpoint is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpGatewayConfig {
        &self.config
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    #[tracing::instrument(skip(self, request), fields(booking_id = %request.booking_id))]
    async fn create_session(&self, request: &CheckoutRequest) -> Result<GatewaySession, GatewayError> {
        let body = SessionRequestBody {
            amount: request.amount,
            currency: &request.currency,
            success_url: &self.config.success_url,
            cancel_url: &self.config.cancel_url,
            metadata: SessionMetadata {
                booking_id: request.booking_id,
                user_id: request.user_id,
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::Timeout(self.config.timeout)
                } else {
                    GatewayError::Http(err)
                }
            })?
            .error_for_status()?;

        let session: GatewaySession = response.json().await?;
        tracing::debug!(session_id = %session.id, "gateway session opened");
        Ok(session)
    }
}
