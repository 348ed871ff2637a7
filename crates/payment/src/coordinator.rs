//! Payment coordinator: opens checkout sessions and settles them from
//! gateway callbacks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{BookingId, PaymentId, PaymentStatus, UserId};
use event_bus::{EventBus, EventBusExt};

use crate::error::{GatewayError, PaymentError, Result};
use crate::gateway::{CheckoutGateway, CheckoutRequest, GatewayEvent};
use crate::payment::{CheckoutSession, GatewayOutcome, Payment};
use crate::pricing::PricingPolicy;
use crate::store::{InsertOutcome, PaymentStore, SettleOutcome};

/// Default bound on a single gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// What a gateway callback did to its payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The payment left PENDING and its outcome event was published.
    Settled(Payment),
    /// The payment had already been settled; nothing changed.
    Unchanged(Payment),
    /// The callback type is not one this system acts on.
    Ignored { event_type: String },
}

/// Drives the payment side of the booking saga.
pub struct PaymentCoordinator<S> {
    store: S,
    gateway: Arc<dyn CheckoutGateway>,
    bus: Arc<dyn EventBus>,
    pricing: PricingPolicy,
    gateway_timeout: Duration,
    webhook_secret: Option<String>,
}

impl<S: Clone> Clone for PaymentCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            bus: self.bus.clone(),
            pricing: self.pricing.clone(),
            gateway_timeout: self.gateway_timeout,
            webhook_secret: self.webhook_secret.clone(),
        }
    }
}

impl<S: PaymentStore> PaymentCoordinator<S> {
    /// Creates a new coordinator.
    pub fn new(
        store: S,
        gateway: Arc<dyn CheckoutGateway>,
        bus: Arc<dyn EventBus>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            bus,
            pricing,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            webhook_secret: None,
        }
    }

    /// Sets the bound on each gateway call.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Requires callbacks to present this shared secret.
    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret.filter(|s| !s.is_empty());
        self
    }

    /// Returns the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the pricing policy.
    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Opens a checkout session for a booking and records a PENDING payment.
    ///
    /// Fails with [`PaymentError::AlreadyExists`] if the booking already has a
    /// payment. A gateway failure or timeout writes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_checkout(
        &self,
        booking_id: BookingId,
        user_id: UserId,
    ) -> Result<CheckoutSession> {
        if self.store.find_by_booking(booking_id).await?.is_some() {
            metrics::counter!("payments_checkout_total", "outcome" => "duplicate").increment(1);
            return Err(PaymentError::AlreadyExists(booking_id));
        }

        let price = self.pricing.price_per_slot();
        let request = CheckoutRequest {
            booking_id,
            user_id,
            amount: price.amount,
            currency: price.currency.clone(),
        };

        let session = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_session(&request),
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => {
                metrics::counter!("payments_checkout_total", "outcome" => "gateway_error")
                    .increment(1);
                return Err(err.into());
            }
            Err(_) => {
                metrics::counter!("payments_checkout_total", "outcome" => "gateway_timeout")
                    .increment(1);
                return Err(GatewayError::Timeout(self.gateway_timeout).into());
            }
        };

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(),
            booking_id,
            user_id,
            amount: request.amount,
            currency: request.currency,
            status: PaymentStatus::Pending,
            external_session_id: session.id,
            checkout_url: session.url,
            created_at: now,
            updated_at: now,
        };

        if self.store.insert_payment(&payment).await? == InsertOutcome::DuplicateBooking {
            tracing::warn!(
                session_id = %payment.external_session_id,
                "concurrent checkout won the race, abandoning session"
            );
            metrics::counter!("payments_checkout_total", "outcome" => "duplicate").increment(1);
            return Err(PaymentError::AlreadyExists(booking_id));
        }

        metrics::counter!("payments_checkout_total", "outcome" => "created").increment(1);
        tracing::info!(
            payment_id = %payment.id,
            session_id = %payment.external_session_id,
            "checkout session created"
        );
        Ok(CheckoutSession::from(&payment))
    }

    /// Handles a "session paid" callback.
    pub async fn on_gateway_succeeded(&self, session_id: &str) -> Result<CallbackResult> {
        self.settle(session_id, GatewayOutcome::Succeeded).await
    }

    /// Handles a "payment failed" callback.
    pub async fn on_gateway_failed(&self, session_id: &str) -> Result<CallbackResult> {
        self.settle(session_id, GatewayOutcome::Failed).await
    }

    /// Handles a "session expired" callback.
    pub async fn on_gateway_expired(&self, session_id: &str) -> Result<CallbackResult> {
        self.settle(session_id, GatewayOutcome::Expired).await
    }

    /// Verifies, decodes and applies a raw gateway callback.
    #[tracing::instrument(skip(self, body, provided_secret))]
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        provided_secret: Option<&str>,
    ) -> Result<CallbackResult> {
        if let Some(secret) = &self.webhook_secret
            && !secret_matches(secret, provided_secret)
        {
            tracing::warn!("rejecting webhook with missing or wrong secret");
            return Err(PaymentError::InvalidRequest(
                "webhook secret mismatch".to_string(),
            ));
        }

        let event = self
            .gateway
            .decode_callback(body)
            .map_err(|err| PaymentError::InvalidRequest(err.to_string()))?;

        match event {
            GatewayEvent::Outcome {
                outcome,
                session_id,
            } => self.settle(&session_id, outcome).await,
            GatewayEvent::Ignored { event_type } => {
                tracing::info!(%event_type, "ignoring unhandled webhook type");
                Ok(CallbackResult::Ignored { event_type })
            }
        }
    }

    /// Lists a user's payments, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Payment>> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    /// Loads the payment for a booking.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_booking(&self, booking_id: BookingId) -> Result<Payment> {
        self.store
            .find_by_booking(booking_id)
            .await?
            .ok_or(PaymentError::NotFoundForBooking(booking_id))
    }

    #[tracing::instrument(skip(self))]
    async fn settle(&self, session_id: &str, outcome: GatewayOutcome) -> Result<CallbackResult> {
        match self
            .store
            .settle_pending(session_id, outcome.status(), Utc::now())
            .await?
        {
            SettleOutcome::Settled(payment) => {
                metrics::counter!("payments_callbacks_total", "outcome" => outcome.as_str())
                    .increment(1);
                tracing::info!(
                    payment_id = %payment.id,
                    booking_id = %payment.booking_id,
                    status = %payment.status,
                    "payment settled"
                );
                self.publish(outcome, &payment).await;
                Ok(CallbackResult::Settled(payment))
            }
            SettleOutcome::AlreadySettled(payment) => {
                metrics::counter!("payments_callbacks_total", "outcome" => "duplicate").increment(1);
                tracing::info!(
                    payment_id = %payment.id,
                    status = %payment.status,
                    "payment already settled, ignoring callback"
                );
                Ok(CallbackResult::Unchanged(payment))
            }
            SettleOutcome::NotFound => Err(PaymentError::SessionNotFound(session_id.to_string())),
        }
    }

    async fn publish(&self, outcome: GatewayOutcome, payment: &Payment) {
        let topic = outcome.topic();
        if let Err(err) = self
            .bus
            .publish_json(topic, payment.booking_id.to_string(), &payment.to_event())
            .await
        {
            metrics::counter!("payment_publish_failures_total", "topic" => topic).increment(1);
            tracing::error!(payment_id = %payment.id, topic, error = %err, "failed to publish payment event");
        }
    }
}

fn secret_matches(expected: &str, provided: Option<&str>) -> bool {
    provided.is_some_and(|p| constant_time_eq::constant_time_eq(p.as_bytes(), expected.as_bytes()))
}
