//! Bus consumers driving the reservation side of the saga.

use async_trait::async_trait;
use chrono::{Datelike, Days};
use common::{PaymentEventPayload, ScheduleUpdatedPayload, topics};
use event_bus::{EventEnvelope, EventHandler, HandlerError};

use crate::booking::PaymentOutcome;
use crate::error::BookingError;
use crate::service::ReservationService;
use crate::store::ReservationStore;

/// Applies `payment.*` outcomes to bookings.
pub struct PaymentOutcomeHandler<S> {
    service: ReservationService<S>,
}

impl<S> PaymentOutcomeHandler<S> {
    pub fn new(service: ReservationService<S>) -> Self {
        Self { service }
    }
}

fn outcome_for(topic: &str) -> Option<PaymentOutcome> {
    match topic {
        topics::PAYMENT_CONFIRMED => Some(PaymentOutcome::Confirmed),
        topics::PAYMENT_FAILED => Some(PaymentOutcome::Failed),
        topics::PAYMENT_EXPIRED => Some(PaymentOutcome::Expired),
        _ => None,
    }
}

#[async_trait]
impl<S: ReservationStore> EventHandler for PaymentOutcomeHandler<S> {
    fn name(&self) -> &'static str {
        "booking.payment_outcome"
    }

    fn topics(&self) -> &'static [&'static str] {
        &topics::PAYMENT_OUTCOMES
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        let outcome = outcome_for(&event.topic)
            .ok_or_else(|| HandlerError::failed(format!("unexpected topic {}", event.topic)))?;
        let payload: PaymentEventPayload = event.decode()?;

        match self
            .service
            .apply_payment_outcome(payload.booking_id, outcome)
            .await
        {
            Ok(_) => Ok(()),
            Err(BookingError::BookingNotFound(booking_id)) => {
                tracing::warn!(%booking_id, %outcome, "payment outcome for unknown booking, skipping");
                Ok(())
            }
            Err(err) => Err(HandlerError::failed(err)),
        }
    }
}

/// Slot generation settings applied on `schedule.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub slot_duration_minutes: u32,
    pub days_forward: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 60,
            days_forward: 7,
        }
    }
}

/// Generates slots for upcoming days matching an updated weekly schedule.
pub struct ScheduleHandler<S> {
    service: ReservationService<S>,
    settings: ScheduleSettings,
}

impl<S> ScheduleHandler<S> {
    pub fn new(service: ReservationService<S>, settings: ScheduleSettings) -> Self {
        Self { service, settings }
    }
}

#[async_trait]
impl<S: ReservationStore> EventHandler for ScheduleHandler<S> {
    fn name(&self) -> &'static str {
        "booking.schedule"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[topics::SCHEDULE_UPDATED]
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        let schedule: ScheduleUpdatedPayload = event.decode()?;
        if !(1..=7).contains(&schedule.day_of_week) {
            return Err(HandlerError::failed(format!(
                "day of week {} is outside 1..=7",
                schedule.day_of_week
            )));
        }

        let today = self.service.clock().today();
        let mut generated = 0;

        for offset in 0..self.settings.days_forward {
            let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
                break;
            };
            if date.weekday().number_from_monday() != schedule.day_of_week {
                continue;
            }

            generated += self
                .service
                .ledger()
                .generate(
                    schedule.resource_id,
                    date,
                    schedule.open_time,
                    schedule.close_time,
                    self.settings.slot_duration_minutes,
                )
                .await
                .map_err(HandlerError::failed)?;
        }

        tracing::info!(
            resource_id = %schedule.resource_id,
            day_of_week = schedule.day_of_week,
            generated,
            "slots generated for schedule update"
        );
        Ok(())
    }
}
