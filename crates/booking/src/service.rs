//! Reservation service providing the booking lifecycle API.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use common::{BookingId, BookingStatus, ResourceId, UserId, topics};
use event_bus::{EventBus, EventBusExt};

use crate::booking::{Booking, BookingView, NewBooking, PaymentOutcome, TransitionRule};
use crate::clock::Clock;
use crate::error::{BookingError, Result, StoreError};
use crate::ledger::SlotLedger;
use crate::slot::AvailabilitySlot;
use crate::store::{ReservationStore, TransitionOutcome};

/// What happened when a payment outcome was applied to a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeApplication {
    /// The booking moved out of PENDING_PAYMENT.
    Applied(BookingView),
    /// The booking was no longer pending; nothing changed.
    Skipped { current: BookingStatus },
}

/// Service for managing bookings.
///
/// Every state change is committed by the store before the matching event is
/// published, so a failed operation never emits an event.
pub struct ReservationService<S> {
    ledger: SlotLedger<S>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl<S: Clone> Clone for ReservationService<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            bus: self.bus.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: ReservationStore> ReservationService<S> {
    /// Creates a new reservation service over the given store.
    pub fn new(store: S, bus: Arc<dyn EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: SlotLedger::new(store),
            bus,
            clock,
        }
    }

    /// Returns the slot ledger backing this service.
    pub fn ledger(&self) -> &SlotLedger<S> {
        &self.ledger
    }

    /// Returns the clock used to decide what "today" is.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    /// Books the slot at `(resource_id, date, start_time)` for a user.
    ///
    /// The booking starts in PENDING_PAYMENT and `booking.created` is
    /// published once the claim has committed.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<BookingView> {
        let today = self.clock.today();
        if date < today {
            return Err(BookingError::InvalidRequest(format!(
                "cannot book a slot on {date}, which is before {today}"
            )));
        }

        let new_booking = NewBooking::for_user(user_id, self.clock.now());
        let (slot, booking) = self
            .ledger
            .claim(resource_id, date, start_time, new_booking)
            .await?;

        let view = BookingView::new(&booking, &slot);
        metrics::counter!("bookings_created_total").increment(1);
        tracing::info!(booking_id = %view.id, slot_id = %view.slot_id, "booking created");

        self.publish(topics::BOOKING_CREATED, &view).await;
        Ok(view)
    }

    /// Cancels a pending or confirmed booking and releases its slot.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, booking_id: BookingId) -> Result<BookingView> {
        let rule = TransitionRule::CANCEL;

        match self.store().transition_booking(booking_id, rule).await? {
            TransitionOutcome::Applied { booking, slot } => {
                let view = BookingView::new(&booking, &slot);
                tracing::info!(booking_id = %view.id, "booking cancelled");
                self.publish(topics::BOOKING_CANCELLED, &view).await;
                Ok(view)
            }
            TransitionOutcome::Rejected { booking } if booking.status == BookingStatus::Cancelled => {
                Err(BookingError::AlreadyCancelled(booking_id))
            }
            TransitionOutcome::Rejected { booking } => Err(BookingError::InvalidTransition {
                booking_id,
                current: booking.status,
                action: rule.action,
            }),
            TransitionOutcome::NotFound => Err(BookingError::BookingNotFound(booking_id)),
        }
    }

    /// Applies a payment outcome to a PENDING_PAYMENT booking.
    ///
    /// A booking that has already left PENDING_PAYMENT is left untouched, which
    /// makes redelivered payment events harmless.
    #[tracing::instrument(skip(self))]
    pub async fn apply_payment_outcome(
        &self,
        booking_id: BookingId,
        outcome: PaymentOutcome,
    ) -> Result<OutcomeApplication> {
        let rule = outcome.rule();

        match self.store().transition_booking(booking_id, rule).await? {
            TransitionOutcome::Applied { booking, slot } => {
                let view = BookingView::new(&booking, &slot);
                metrics::counter!("booking_payment_outcomes_total", "outcome" => outcome.as_str())
                    .increment(1);
                tracing::info!(booking_id = %view.id, status = %view.status, "payment outcome applied");

                if rule.releases_slot() {
                    self.publish(topics::BOOKING_CANCELLED, &view).await;
                }
                Ok(OutcomeApplication::Applied(view))
            }
            TransitionOutcome::Rejected { booking } => {
                tracing::warn!(
                    %booking_id,
                    current = %booking.status,
                    %outcome,
                    "booking is not pending payment, ignoring outcome"
                );
                Ok(OutcomeApplication::Skipped {
                    current: booking.status,
                })
            }
            TransitionOutcome::NotFound => Err(BookingError::BookingNotFound(booking_id)),
        }
    }

    /// Lists a resource's available slots for a date.
    #[tracing::instrument(skip(self))]
    pub async fn get_availability(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>> {
        let slots = self.ledger.list_available(resource_id, date).await?;
        Ok(slots.iter().map(AvailabilitySlot::from).collect())
    }

    /// Lists a user's bookings, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<BookingView>> {
        let bookings = self.store().list_bookings_by_user(user_id).await?;
        let mut views = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            views.push(self.view_of(booking).await?);
        }
        Ok(views)
    }

    /// Loads a booking by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, booking_id: BookingId) -> Result<BookingView> {
        let booking = self
            .store()
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        self.view_of(&booking).await
    }

    async fn view_of(&self, booking: &Booking) -> Result<BookingView> {
        let slot = self
            .store()
            .get_slot(booking.slot_id)
            .await?
            .ok_or(StoreError::MissingSlot(booking.slot_id))?;
        Ok(BookingView::new(booking, &slot))
    }

    /// Publishes a booking event. The state change is already committed, so a
    /// publish failure is logged and left for the reconciliation sweep.
    async fn publish(&self, topic: &str, view: &BookingView) {
        let payload = view.to_event();
        if let Err(err) = self
            .bus
            .publish_json(topic, view.id.to_string(), &payload)
            .await
        {
            metrics::counter!("booking_publish_failures_total", "topic" => topic.to_string())
                .increment(1);
            tracing::error!(booking_id = %view.id, topic, error = %err, "failed to publish booking event");
        }
    }
}
