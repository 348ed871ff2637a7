//! Bus consumers driving the payment side of the saga.

use async_trait::async_trait;
use common::{BookingEventPayload, BookingStatus, topics};
use event_bus::{EventEnvelope, EventHandler, HandlerError};

use crate::coordinator::PaymentCoordinator;
use crate::error::PaymentError;
use crate::store::PaymentStore;

/// Opens a checkout session for every new pending booking.
pub struct BookingCreatedHandler<S> {
    coordinator: PaymentCoordinator<S>,
}

impl<S> BookingCreatedHandler<S> {
    pub fn new(coordinator: PaymentCoordinator<S>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl<S: PaymentStore> EventHandler for BookingCreatedHandler<S> {
    fn name(&self) -> &'static str {
        "payment.booking_created"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[topics::BOOKING_CREATED]
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        let booking: BookingEventPayload = event.decode()?;
        if booking.status != BookingStatus::PendingPayment {
            tracing::debug!(
                booking_id = %booking.booking_id,
                status = %booking.status,
                "booking is not pending payment, no checkout needed"
            );
            return Ok(());
        }

        match self
            .coordinator
            .initiate_checkout(booking.booking_id, booking.user_id)
            .await
        {
            Ok(session) => {
                tracing::info!(
                    booking_id = %booking.booking_id,
                    session_id = %session.session_id,
                    "checkout opened for booking"
                );
                Ok(())
            }
            Err(PaymentError::AlreadyExists(booking_id)) => {
                tracing::info!(%booking_id, "duplicate booking.created delivery, payment exists");
                Ok(())
            }
            Err(err) => Err(HandlerError::failed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};
    use common::{BookingId, ResourceId, SlotId, UserId};
    use event_bus::InMemoryEventBus;

    use crate::gateway::InMemoryCheckoutGateway;
    use crate::pricing::PricingPolicy;
    use crate::store::InMemoryPaymentStore;

    fn handler() -> (BookingCreatedHandler<InMemoryPaymentStore>, InMemoryPaymentStore, InMemoryCheckoutGateway) {
        let store = InMemoryPaymentStore::new();
        let gateway = InMemoryCheckoutGateway::new();
        let coordinator = PaymentCoordinator::new(
            store.clone(),
            Arc::new(gateway.clone()),
            Arc::new(InMemoryEventBus::new()),
            PricingPolicy::default(),
        );
        (BookingCreatedHandler::new(coordinator), store, gateway)
    }

    fn created(status: BookingStatus) -> EventEnvelope {
        let payload = BookingEventPayload {
            booking_id: BookingId::new(),
            slot_id: SlotId::new(),
            resource_id: ResourceId::new(),
            user_id: UserId::new(),
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status,
        };
        EventEnvelope::builder()
            .topic(topics::BOOKING_CREATED)
            .key(payload.booking_id.to_string())
            .payload(&payload)
            .unwrap()
            .try_build()
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_delivery_creates_one_payment() {
        let (handler, store, gateway) = handler();
        let event = created(BookingStatus::PendingPayment);

        handler.handle(&event).await.unwrap();
        handler.handle(&event).await.unwrap();

        assert_eq!(store.payment_count().await, 1);
        assert_eq!(gateway.session_count().await, 1);
    }

    #[tokio::test]
    async fn non_pending_booking_is_skipped() {
        let (handler, store, _) = handler();
        handler
            .handle(&created(BookingStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_as_handler_error() {
        let (handler, store, gateway) = handler();
        gateway.set_fail_on_create(true).await;

        let result = handler.handle(&created(BookingStatus::PendingPayment)).await;
        assert!(matches!(result, Err(HandlerError::Failed(_))));
        assert_eq!(store.payment_count().await, 0);
    }
}
