//! End-to-end tests for the payment HTTP surface.
//!
//! The real router runs against the in-memory adapters and mock gateways.
//! Stripe callbacks are signed here exactly as Stripe signs them, so
//! signature verification is exercised on every delivery.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::{Sha256, Sha512};
use tower::ServiceExt;

use course_market::adapters::http::{payment_router, PaymentAppState};
use course_market::adapters::memory::{
    InMemoryCatalog, InMemoryEnrollmentCache, InMemoryPaymentStore, InMemoryRoomMembership,
};
use course_market::adapters::stripe::MockCheckoutGateway;
use course_market::domain::foundation::{CourseId, UserId};
use course_market::ports::{CheckoutGateways, GatewayError, GatewayErrorCode};

const STRIPE_SECRET: &str = "whsec_integration_secret";
const PAYMOB_SECRET: &str = "paymob_integration_hmac";
const BUYER: &str = "buyer-42";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    store: InMemoryPaymentStore,
    rooms: InMemoryRoomMembership,
    stripe: MockCheckoutGateway,
    course_id: CourseId,
}

impl TestApp {
    async fn new() -> Self {
        let store = InMemoryPaymentStore::new();
        let catalog = InMemoryCatalog::new();
        let rooms = InMemoryRoomMembership::new();
        let stripe = MockCheckoutGateway::stripe(STRIPE_SECRET);
        let paymob = MockCheckoutGateway::paymob(PAYMOB_SECRET);

        let course_id = catalog.add_course("Rust for Backend Engineers", Decimal::new(100, 0)).await;
        catalog.add_buyer(UserId::new(BUYER).unwrap(), true).await;
        catalog.add_buyer(UserId::new("unverified").unwrap(), false).await;

        let state = PaymentAppState {
            payments: Arc::new(store.clone()),
            enrollments: Arc::new(store.clone()),
            catalog: Arc::new(catalog),
            ledger: Arc::new(store.clone()),
            rooms: Arc::new(rooms.clone()),
            enrollment_cache: Arc::new(InMemoryEnrollmentCache::new()),
            gateways: CheckoutGateways::new()
                .with(Arc::new(stripe.clone()))
                .with(Arc::new(paymob)),
            gateway_timeout: Duration::from_secs(2),
        };

        Self {
            router: payment_router().with_state(state),
            store,
            rooms,
            stripe,
            course_id,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn initiate(&self, user: &str, method: &str) -> (StatusCode, Value) {
        let body = json!({ "courseId": self.course_id.to_string(), "paymentMethod": method });
        self.send(
            Request::post("/payment/initiate")
                .header("X-User-Id", user)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Initiate as the default buyer and return the new payment id.
    async fn initiate_ok(&self) -> String {
        let (status, body) = self.initiate(BUYER, "stripe").await;
        assert_eq!(status, StatusCode::CREATED, "initiate failed: {}", body);
        body["paymentId"].as_str().unwrap().to_string()
    }

    async fn status_of(&self, payment_id: &str) -> String {
        let (status, body) = self
            .send(
                Request::get(format!("/payment/{}/status", payment_id))
                    .header("X-User-Id", BUYER)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["status"].as_str().unwrap().to_string()
    }

    async fn cancel(&self, user: &str, payment_id: &str) -> (StatusCode, Value) {
        self.send(
            Request::delete(format!("/payment/{}", payment_id))
                .header("X-User-Id", user)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    fn stripe_request(&self, payload: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/webhook").header("Content-Type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    async fn deliver_stripe(&self, payload: &str) -> (StatusCode, Value) {
        self.send(self.stripe_request(payload, Some(stripe_signature(payload))))
            .await
    }
}

fn stripe_signature(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(STRIPE_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn checkout_completed(event_id: &str, payment_id: &str, buyer: &str) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": {
            "id": format!("cs_test_{}", event_id),
            "object": "checkout.session",
            "payment_status": "paid",
            "metadata": { "paymentId": payment_id, "buyerId": buyer }
        }}
    })
    .to_string()
}

fn payment_failed(event_id: &str, payment_id: &str) -> String {
    json!({
        "id": event_id,
        "type": "payment_intent.payment_failed",
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": {
            "id": "pi_test_failed",
            "object": "payment_intent",
            "metadata": { "paymentId": payment_id }
        }}
    })
    .to_string()
}

// =============================================================================
// Purchase and fulfillment
// =============================================================================

#[tokio::test]
async fn purchase_then_success_webhook_enrolls_the_buyer() {
    let app = TestApp::new().await;

    let (status, body) = app.initiate(BUYER, "stripe").await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id = body["paymentId"].as_str().unwrap().to_string();
    assert!(body["paymentUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://checkout.mock/stripe/"));
    assert_eq!(app.stripe.call_count(), 1);
    assert_eq!(app.stripe.calls()[0].amount, Decimal::new(100, 0));
    assert_eq!(app.status_of(&payment_id).await, "pending");

    let (status, _) = app
        .deliver_stripe(&checkout_completed("evt_a", &payment_id, BUYER))
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.status_of(&payment_id).await, "successful");
    assert_eq!(app.store.enrollment_count().await, 1);
    assert!(app
        .rooms
        .participants(&app.course_id)
        .await
        .contains(&UserId::new(BUYER).unwrap()));

    let (status, body) = app
        .send(
            Request::get("/enrollments")
                .header("X-User-Id", BUYER)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let enrollments = body.as_array().unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0]["courseId"], app.course_id.to_string());
    assert_eq!(enrollments[0]["paymentId"], payment_id);
}

#[tokio::test]
async fn redelivered_success_event_is_a_no_op() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    let payload = checkout_completed("evt_dup", &payment_id, BUYER);

    let (first, _) = app.deliver_stripe(&payload).await;
    let (second, _) = app.deliver_stripe(&payload).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(app.store.enrollment_count().await, 1);
    assert_eq!(app.store.processed_count().await, 1);
    assert_eq!(app.status_of(&payment_id).await, "successful");
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_enroll_once() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    let payload = checkout_completed("evt_storm", &payment_id, BUYER);

    let deliveries = (0..12).map(|_| app.deliver_stripe(&payload));
    let results = futures::future::join_all(deliveries).await;

    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));
    assert_eq!(app.store.enrollment_count().await, 1);
    assert_eq!(app.status_of(&payment_id).await, "successful");
}

#[tokio::test]
async fn distinct_success_events_for_one_payment_enroll_once() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;

    app.deliver_stripe(&checkout_completed("evt_1", &payment_id, BUYER))
        .await;
    let (status, _) = app
        .deliver_stripe(&checkout_completed("evt_2", &payment_id, BUYER))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.enrollment_count().await, 1);
}

#[tokio::test]
async fn failure_event_marks_payment_failed_and_allows_retry() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;

    let (status, _) = app.deliver_stripe(&payment_failed("evt_fail", &payment_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.status_of(&payment_id).await, "failed");
    assert_eq!(app.store.enrollment_count().await, 0);

    let (status, _) = app.initiate(BUYER, "stripe").await;
    assert_eq!(status, StatusCode::CREATED);
}

// =============================================================================
// Conflicts and terminal states
// =============================================================================

#[tokio::test]
async fn second_purchase_of_owned_course_is_rejected() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    app.deliver_stripe(&checkout_completed("evt_c", &payment_id, BUYER))
        .await;

    let (status, body) = app.initiate(BUYER, "stripe").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_PURCHASED");
    assert_eq!(app.stripe.call_count(), 1);
}

#[tokio::test]
async fn purchase_while_pending_is_rejected() {
    let app = TestApp::new().await;
    app.initiate_ok().await;

    let (status, body) = app.initiate(BUYER, "paymob").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PAYMENT_PENDING");
}

#[tokio::test]
async fn success_after_cancellation_leaves_payment_cancelled() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;

    let (status, body) = app.cancel(BUYER, &payment_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = app
        .deliver_stripe(&checkout_completed("evt_late", &payment_id, BUYER))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.status_of(&payment_id).await, "cancelled");
    assert_eq!(app.store.enrollment_count().await, 0);
}

#[tokio::test]
async fn failure_after_success_does_not_change_status() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    app.deliver_stripe(&checkout_completed("evt_ok", &payment_id, BUYER))
        .await;

    let (status, _) = app.deliver_stripe(&payment_failed("evt_late_fail", &payment_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.status_of(&payment_id).await, "successful");
}

#[tokio::test]
async fn cancelling_a_settled_payment_is_a_client_error() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    app.deliver_stripe(&checkout_completed("evt_paid", &payment_id, BUYER))
        .await;

    let (status, body) = app.cancel(BUYER, &payment_id).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_NOT_PENDING");
    assert_eq!(app.status_of(&payment_id).await, "successful");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_success_settles_exactly_once() {
    for round in 0..20 {
        let app = TestApp::new().await;
        let payment_id = app.initiate_ok().await;
        let payload = checkout_completed(&format!("evt_race_{}", round), &payment_id, BUYER);

        let ((cancel_status, _), (hook_status, _)) =
            tokio::join!(app.cancel(BUYER, &payment_id), app.deliver_stripe(&payload));

        assert_eq!(hook_status, StatusCode::OK);
        let settled = app.status_of(&payment_id).await;
        let enrolled = app.store.enrollment_count().await;
        match cancel_status {
            StatusCode::OK => {
                assert_eq!(settled, "cancelled", "round {}", round);
                assert_eq!(enrolled, 0, "round {}", round);
            }
            StatusCode::BAD_REQUEST => {
                assert_eq!(settled, "successful", "round {}", round);
                assert_eq!(enrolled, 1, "round {}", round);
            }
            other => panic!("round {}: unexpected cancel status {}", round, other),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initiations_leave_one_pending_payment() {
    let app = TestApp::new().await;

    let attempts = (0..8).map(|_| app.initiate(BUYER, "stripe"));
    let results = futures::future::join_all(attempts).await;

    let created: Vec<_> = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .collect();
    assert_eq!(created.len(), 1, "results: {:?}", results);
    for (status, body) in results.iter().filter(|(s, _)| *s != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "PAYMENT_PENDING");
    }

    let payment_id = created[0].1["paymentId"].as_str().unwrap();
    assert_eq!(app.status_of(payment_id).await, "pending");
}

#[tokio::test]
async fn another_buyer_cannot_see_or_cancel_a_payment() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;

    let (status, _) = app.cancel("intruder", &payment_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Request::get(format!("/payment/{}/status", payment_id))
                .header("X-User-Id", "intruder")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.status_of(&payment_id).await, "pending");
}

// =============================================================================
// Signature gate
// =============================================================================

#[tokio::test]
async fn tampered_signature_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    let signed = checkout_completed("evt_e", &payment_id, BUYER);
    let signature = stripe_signature(&signed);
    let tampered = signed.replace(BUYER, "attacker");

    let (status, body) = app.send(app.stripe_request(&tampered, Some(signature))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");
    assert_eq!(app.status_of(&payment_id).await, "pending");
    assert_eq!(app.store.enrollment_count().await, 0);
    assert_eq!(app.store.processed_count().await, 0);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    let payload = checkout_completed("evt_nosig", &payment_id, BUYER);

    let (status, body) = app.send(app.stripe_request(&payload, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_SIGNATURE");
    assert_eq!(app.status_of(&payment_id).await, "pending");
}

#[tokio::test]
async fn stale_signature_is_rejected() {
    let app = TestApp::new().await;
    let payment_id = app.initiate_ok().await;
    let payload = checkout_completed("evt_old", &payment_id, BUYER);
    let timestamp = chrono::Utc::now().timestamp() - 3600;
    let mut mac = Hmac::<Sha256>::new_from_slice(STRIPE_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    let signature = format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()));

    let (status, _) = app.send(app.stripe_request(&payload, Some(signature))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.enrollment_count().await, 0);
}

#[tokio::test]
async fn webhook_for_unknown_payment_is_acknowledged() {
    let app = TestApp::new().await;
    let unknown = course_market::domain::foundation::PaymentId::new().to_string();

    let (status, _) = app
        .deliver_stripe(&checkout_completed("evt_ghost", &unknown, BUYER))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.enrollment_count().await, 0);
}

#[tokio::test]
async fn unhandled_event_type_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({
        "id": "evt_customer",
        "type": "customer.created",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();

    let (status, body) = app.deliver_stripe(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn event_without_payment_metadata_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({
        "id": "evt_foreign",
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": { "id": "cs_other", "payment_status": "paid", "metadata": {} } }
    })
    .to_string();

    let (status, _) = app.deliver_stripe(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.processed_count().await, 0);
}

// =============================================================================
// Paymob
// =============================================================================

/// Concatenates the signed transaction fields in Paymob's order.
fn paymob_hmac(transaction: &Value) -> String {
    const FIELDS: [&str; 20] = [
        "amount_cents",
        "created_at",
        "currency",
        "error_occured",
        "has_parent_transaction",
        "id",
        "integration_id",
        "is_3d_secure",
        "is_auth",
        "is_capture",
        "is_refunded",
        "is_standalone_payment",
        "is_voided",
        "order.id",
        "owner",
        "pending",
        "source_data.pan",
        "source_data.sub_type",
        "source_data.type",
        "success",
    ];
    let message: String = FIELDS
        .iter()
        .map(|path| {
            match path.split('.').try_fold(transaction, |node, key| node.get(key)) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .collect();
    let mut mac = Hmac::<Sha512>::new_from_slice(PAYMOB_SECRET.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn paymob_callback(payment_id: &str, success: bool) -> Value {
    json!({
        "type": "TRANSACTION",
        "obj": {
            "id": 918273645,
            "pending": false,
            "amount_cents": 10000,
            "success": success,
            "is_auth": false,
            "is_capture": false,
            "is_standalone_payment": true,
            "is_voided": false,
            "is_refunded": false,
            "is_3d_secure": true,
            "integration_id": 4512,
            "has_parent_transaction": false,
            "order": { "id": 5551234, "merchant_order_id": payment_id },
            "created_at": "2024-06-13T11:32:09.628623",
            "currency": "EGP",
            "source_data": { "pan": "2346", "type": "card", "sub_type": "MasterCard" },
            "error_occured": false,
            "owner": 302852,
            "payment_key_claims": { "extra": { "payment_id": payment_id, "buyer_id": BUYER } }
        }
    })
}

#[tokio::test]
async fn paymob_purchase_is_fulfilled_by_signed_callback() {
    let app = TestApp::new().await;
    let (status, body) = app.initiate(BUYER, "paymob").await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id = body["paymentId"].as_str().unwrap().to_string();

    let callback = paymob_callback(&payment_id, true);
    let hmac = paymob_hmac(&callback["obj"]);
    let request = |hmac: &str| {
        Request::post(format!("/webhook/paymob?hmac={}", hmac))
            .header("Content-Type", "application/json")
            .body(Body::from(callback.to_string()))
            .unwrap()
    };

    let (status, _) = app.send(request("00ff")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.status_of(&payment_id).await, "pending");

    let (status, _) = app.send(request(&hmac)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.status_of(&payment_id).await, "successful");

    let (status, _) = app.send(request(&hmac)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.enrollment_count().await, 1);
}

// =============================================================================
// Initiation validation
// =============================================================================

#[tokio::test]
async fn unsupported_method_is_rejected_before_any_row_exists() {
    let app = TestApp::new().await;

    let (status, body) = app.initiate(BUYER, "paypal").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYMENT_METHOD");
    assert!(!app.stripe.was_called());
    assert_eq!(list_own_payments(&app).await.len(), 0);
}

#[tokio::test]
async fn gateway_outage_is_retryable_and_leaves_no_payment() {
    let app = TestApp::new().await;
    app.stripe
        .set_error(GatewayError::new(GatewayErrorCode::NetworkError, "connection reset"));

    let (status, body) = app.initiate(BUYER, "stripe").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "GATEWAY_UNAVAILABLE");
    assert_eq!(list_own_payments(&app).await.len(), 0);

    app.stripe.clear_error();
    let (status, _) = app.initiate(BUYER, "stripe").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn unverified_buyer_is_forbidden() {
    let app = TestApp::new().await;

    let (status, body) = app.initiate("unverified", "stripe").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_NOT_VERIFIED");
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let app = TestApp::new().await;
    let body = json!({ "courseId": CourseId::new().to_string(), "paymentMethod": "stripe" });

    let (status, body) = app
        .send(
            Request::post("/payment/initiate")
                .header("X-User-Id", BUYER)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "COURSE_NOT_FOUND");
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Request::get("/enrollments").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

// =============================================================================
// Listings and health
// =============================================================================

async fn list_own_payments(app: &TestApp) -> Vec<Value> {
    let (status, body) = app
        .send(
            Request::get(format!("/payment/user/{}", BUYER))
                .header("X-User-Id", BUYER)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn payment_history_lists_every_attempt() {
    let app = TestApp::new().await;
    let first = app.initiate_ok().await;
    app.cancel(BUYER, &first).await;
    let second = app.initiate_ok().await;

    let payments = list_own_payments(&app).await;

    assert_eq!(payments.len(), 2);
    let ids: Vec<&str> = payments.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
    assert!(payments.iter().all(|p| p["paymentMethod"] == "stripe"));
}

#[tokio::test]
async fn payment_history_of_someone_else_is_not_found() {
    let app = TestApp::new().await;
    app.initiate_ok().await;

    let (status, _) = app
        .send(
            Request::get(format!("/payment/user/{}", BUYER))
                .header("X-User-Id", "intruder")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
