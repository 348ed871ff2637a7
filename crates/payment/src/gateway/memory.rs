use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CheckoutGateway, CheckoutRequest, GatewaySession};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, CheckoutRequest>,
    next_id: u32,
    fail_on_create: bool,
    delay: Option<Duration>,
}

/// In-memory checkout gateway for development and tests.
///
/// Session ids are sequential (`cs_test_0001`, `cs_test_0002`, …).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckoutGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryCheckoutGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every new session.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Makes every session creation wait before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Returns the number of sessions opened.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Returns the request a session was opened for.
    pub async fn session(&self, session_id: &str) -> Option<CheckoutRequest> {
        self.state.read().await.sessions.get(session_id).cloned()
    }
}

#[async_trait]
impl CheckoutGateway for InMemoryCheckoutGateway {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<GatewaySession, GatewayError> {
        let delay = self.state.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(GatewayError::Declined("card declined".to_string()));
        }

        state.next_id += 1;
        let id = format!("cs_test_{:04}", state.next_id);
        state.sessions.insert(id.clone(), request.clone());

        Ok(GatewaySession {
            url: format!("https://checkout.invalid/pay/{id}"),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BookingId, UserId};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            booking_id: BookingId::new(),
            user_id: UserId::new(),
            amount: 2000,
            currency: "usd".to_string(),
        }
    }

    #[tokio::test]
    async fn sessions_are_sequential() {
        let gateway = InMemoryCheckoutGateway::new();
        let first = gateway.create_session(&request()).await.unwrap();
        let second = gateway.create_session(&request()).await.unwrap();

        assert_eq!(first.id, "cs_test_0001");
        assert_eq!(second.id, "cs_test_0002");
        assert!(first.url.ends_with("cs_test_0001"));
        assert_eq!(gateway.session_count().await, 2);
    }

    #[tokio::test]
    async fn declines_when_configured() {
        let gateway = InMemoryCheckoutGateway::new();
        gateway.set_fail_on_create(true).await;

        let err = gateway.create_session(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Declined(_)));
        assert_eq!(gateway.session_count().await, 0);
    }

    #[tokio::test]
    async fn records_request_per_session() {
        let gateway = InMemoryCheckoutGateway::new();
        let req = request();
        let session = gateway.create_session(&req).await.unwrap();
        assert_eq!(gateway.session(&session.id).await, Some(req));
    }
}
