use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId, PaymentStatus, UserId};
use tokio::sync::RwLock;

use super::{InsertOutcome, PaymentStore, SettleOutcome};
use crate::error::StoreResult;
use crate::payment::Payment;

#[derive(Default)]
struct State {
    payments: HashMap<PaymentId, Payment>,
    by_booking: HashMap<BookingId, PaymentId>,
    by_session: HashMap<String, PaymentId>,
}

/// In-memory payment store.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome> {
        let mut state = self.state.write().await;
        if state.by_booking.contains_key(&payment.booking_id) {
            return Ok(InsertOutcome::DuplicateBooking);
        }

        state.by_booking.insert(payment.booking_id, payment.id);
        state
            .by_session
            .insert(payment.external_session_id.clone(), payment.id);
        state.payments.insert(payment.id, payment.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> StoreResult<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .by_booking
            .get(&booking_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> StoreResult<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .by_session
            .get(session_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn settle_pending(
        &self,
        session_id: &str,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<SettleOutcome> {
        let mut state = self.state.write().await;
        let Some(id) = state.by_session.get(session_id).copied() else {
            return Ok(SettleOutcome::NotFound);
        };
        let Some(payment) = state.payments.get_mut(&id) else {
            return Ok(SettleOutcome::NotFound);
        };

        if !payment.status.is_pending() {
            return Ok(SettleOutcome::AlreadySettled(payment.clone()));
        }

        payment.status = status;
        payment.updated_at = at;
        Ok(SettleOutcome::Settled(payment.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(booking_id: BookingId, session: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: PaymentId::new(),
            booking_id,
            user_id: UserId::new(),
            amount: 2000,
            currency: "usd".to_string(),
            status: PaymentStatus::Pending,
            external_session_id: session.to_string(),
            checkout_url: format!("https://pay/{session}"),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn second_payment_for_booking_is_duplicate() {
        let store = InMemoryPaymentStore::new();
        let booking = BookingId::new();

        assert_eq!(
            store.insert_payment(&payment(booking, "cs_1")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_payment(&payment(booking, "cs_2")).await.unwrap(),
            InsertOutcome::DuplicateBooking
        );
        assert_eq!(store.payment_count().await, 1);
        assert!(store.find_by_session("cs_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn settle_only_moves_pending() {
        let store = InMemoryPaymentStore::new();
        let original = payment(BookingId::new(), "cs_1");
        store.insert_payment(&original).await.unwrap();

        let settled = store
            .settle_pending("cs_1", PaymentStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert!(matches!(settled, SettleOutcome::Settled(ref p) if p.status == PaymentStatus::Completed));

        let again = store
            .settle_pending("cs_1", PaymentStatus::Expired, Utc::now())
            .await
            .unwrap();
        assert!(matches!(again, SettleOutcome::AlreadySettled(ref p) if p.status == PaymentStatus::Completed));

        let missing = store
            .settle_pending("cs_404", PaymentStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert_eq!(missing, SettleOutcome::NotFound);
    }

    #[tokio::test]
    async fn lookups_by_booking_and_user() {
        let store = InMemoryPaymentStore::new();
        let p = payment(BookingId::new(), "cs_1");
        store.insert_payment(&p).await.unwrap();

        assert_eq!(store.find_by_booking(p.booking_id).await.unwrap(), Some(p.clone()));
        assert_eq!(store.list_by_user(p.user_id).await.unwrap(), vec![p]);
        assert!(store.list_by_user(UserId::new()).await.unwrap().is_empty());
    }
}
