//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use api::routes::USER_ID_HEADER;
use api::routes::webhook::WEBHOOK_SECRET_HEADER;
use api::{AppState, wiring};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use booking::{Clock, FixedClock, InMemoryReservationStore};
use chrono::{NaiveDate, NaiveTime};
use common::{ResourceId, UserId};
use event_bus::{EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{InMemoryCheckoutGateway, InMemoryPaymentStore, gateway};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

type TestState = AppState<InMemoryReservationStore, InMemoryPaymentStore>;

struct TestApp {
    router: axum::Router,
    state: Arc<TestState>,
    resource: ResourceId,
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()
}

async fn setup_with(config: Config) -> TestApp {
    let bus = InMemoryEventBus::new();
    let shared: Arc<dyn EventBus> = Arc::new(bus.clone());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(today()));

    let state = wiring::build_state(
        &config,
        InMemoryReservationStore::new(),
        InMemoryPaymentStore::new(),
        shared,
        Arc::new(InMemoryCheckoutGateway::new()),
        clock,
    );
    let cache = wiring::build_cache(&config).unwrap();
    wiring::spawn_consumers(&config, &bus, &state, cache).await.unwrap();

    let resource = ResourceId::new();
    let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    state
        .reservations
        .ledger()
        .generate(resource, today(), t(9), t(12), 60)
        .await
        .unwrap();

    let state = Arc::new(state);
    let router = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        router,
        state,
        resource,
    }
}

async fn setup() -> TestApp {
    setup_with(Config::default()).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn get(&self, uri: &str, user: Option<UserId>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn create_booking(&self, user: UserId, date: NaiveDate, start: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("content-type", "application/json")
                .header(USER_ID_HEADER, user.to_string())
                .body(Body::from(
                    json!({
                        "resourceId": self.resource.to_string(),
                        "date": date.to_string(),
                        "startTime": start,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    async fn cancel(&self, booking_id: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/bookings/{booking_id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn webhook(&self, event_type: &str, session_id: &str, secret: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook/gateway")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(WEBHOOK_SECRET_HEADER, secret);
        }
        let body = gateway::webhook_body(event_type, session_id).to_string();
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Polls the payment endpoint until the saga has opened checkout.
    async fn wait_for_payment(&self, booking_id: &str) -> Value {
        for _ in 0..200 {
            let (status, body) = self.get(&format!("/payments/booking/{booking_id}"), None).await;
            if status == StatusCode::OK {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no payment was opened for booking {booking_id}");
    }

    async fn wait_for_booking_status(&self, booking_id: &str, status: &str) -> bool {
        for _ in 0..200 {
            let (_, body) = self.get(&format!("/bookings/{booking_id}"), None).await;
            if body["status"] == status {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;
    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_get_booking() {
    let app = setup().await;
    let user = UserId::new();

    let (status, created) = app.create_booking(user, today(), "09:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING_PAYMENT");
    assert_eq!(created["startTime"], "09:00:00");
    assert_eq!(created["endTime"], "10:00:00");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["userId"], user.to_string());

    let (status, mine) = app.get("/bookings/me", Some(user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booked_slot_leaves_availability() {
    let app = setup().await;
    app.create_booking(UserId::new(), today(), "10:00:00").await;

    let uri = format!(
        "/bookings/availability?resourceId={}&date={}",
        app.resource,
        today()
    );
    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let starts: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["startTime"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["09:00:00", "11:00:00"]);
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let app = setup().await;

    let (first, _) = app.create_booking(UserId::new(), today(), "09:00").await;
    let (second, body) = app.create_booking(UserId::new(), today(), "09:00").await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let app = setup().await;

    let yesterday = today().pred_opt().unwrap();
    let (status, _) = app.create_booking(UserId::new(), yesterday, "09:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.create_booking(UserId::new(), today(), "quarter past").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.create_booking(UserId::new(), today(), "13:00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "resourceId": app.resource.to_string(),
                        "date": today().to_string(),
                        "startTime": "09:00",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing user header");
}

#[tokio::test]
async fn test_cancel_twice() {
    let app = setup().await;
    let (_, created) = app.create_booking(UserId::new(), today(), "11:00").await;
    let id = created["id"].as_str().unwrap();

    let (status, cancelled) = app.cancel(id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (status, _) = app.cancel(id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_malformed_booking_ids() {
    let app = setup().await;

    let (status, _) = app
        .get(&format!("/bookings/{}", common::BookingId::new()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/bookings/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_internal_slots_lists_every_status() {
    let app = setup().await;
    app.create_booking(UserId::new(), today(), "09:00").await;

    let (status, body) = app.get(&format!("/internal/slots?date={}", today()), None).await;
    assert_eq!(status, StatusCode::OK);

    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots.iter().filter(|s| s["status"] == "BOOKED").count(), 1);
}

#[tokio::test]
async fn test_paid_booking_is_confirmed() {
    let app = setup().await;
    let user = UserId::new();
    let (_, created) = app.create_booking(user, today(), "09:00").await;
    let id = created["id"].as_str().unwrap();

    let payment = app.wait_for_payment(id).await;
    assert_eq!(payment["status"], "PENDING");
    let session_id = payment["externalSessionId"].as_str().unwrap();

    let (status, body) = app.webhook(gateway::CHECKOUT_COMPLETED, session_id, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "settled");
    assert!(app.wait_for_booking_status(id, "CONFIRMED").await);

    let (status, body) = app.webhook(gateway::CHECKOUT_COMPLETED, session_id, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unchanged");

    let (_, payments) = app.get("/payments/me", Some(user)).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["status"], "COMPLETED");
}

#[tokio::test]
async fn test_expired_checkout_frees_slot() {
    let app = setup().await;
    let (_, created) = app.create_booking(UserId::new(), today(), "10:00").await;
    let id = created["id"].as_str().unwrap();
    let payment = app.wait_for_payment(id).await;

    app.webhook(
        gateway::CHECKOUT_EXPIRED,
        payment["externalSessionId"].as_str().unwrap(),
        None,
    )
    .await;
    assert!(app.wait_for_booking_status(id, "CANCELLED").await);

    let (status, _) = app.create_booking(UserId::new(), today(), "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_checkout_returns_open_session() {
    let app = setup().await;
    let user = UserId::new();
    let (_, created) = app.create_booking(user, today(), "11:00").await;
    let id = created["id"].as_str().unwrap();
    let payment = app.wait_for_payment(id).await;

    let checkout = |who: UserId| {
        Request::builder()
            .method("POST")
            .uri("/payments/checkout")
            .header("content-type", "application/json")
            .header(USER_ID_HEADER, who.to_string())
            .body(Body::from(json!({ "bookingId": id }).to_string()))
            .unwrap()
    };

    let (status, session) = app.send(checkout(user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["sessionId"], payment["externalSessionId"]);
    assert!(session["checkoutUrl"].as_str().unwrap().starts_with("https://"));

    let (status, _) = app.send(checkout(UserId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "someone else's booking");
}

#[tokio::test]
async fn test_webhook_secret_is_enforced() {
    let app = setup_with(Config {
        webhook_secret: Some("hush".to_string()),
        ..Config::default()
    })
    .await;
    let (_, created) = app.create_booking(UserId::new(), today(), "09:00").await;
    let payment = app.wait_for_payment(created["id"].as_str().unwrap()).await;
    let session_id = payment["externalSessionId"].as_str().unwrap();

    let (status, _) = app.webhook(gateway::CHECKOUT_COMPLETED, session_id, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .webhook(gateway::CHECKOUT_COMPLETED, session_id, Some("wrong"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .webhook(gateway::CHECKOUT_COMPLETED, session_id, Some("hush"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "settled");
    assert_eq!(
        app.state.payments.get_by_booking(created["id"].as_str().unwrap().parse().unwrap())
            .await
            .unwrap()
            .status,
        common::PaymentStatus::Completed
    );
}

#[tokio::test]
async fn test_unknown_webhook_type_is_ignored() {
    let app = setup().await;
    let (status, body) = app.webhook("invoice.created", "cs_nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ignored");
}
