//! End-to-end API tests against the assembled router
//!
//! Each test builds its own state with fake upstream collaborators and
//! drives the router through `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

use waypoint_server::audit::TracingAuditSink;
use waypoint_server::auth::JwtConfig;
use waypoint_server::db::repository::{
    DeliveryRepository, DriverRepository, MenuItemRepository, NotificationRepository,
    UserRepository,
};
use waypoint_server::db::{
    BatchOp, DocumentStore, Filter, MemoryStore, StoreHandle, StoreResult,
};
use waypoint_server::payments::{
    CheckoutSession, CheckoutSessionRequest, PaymentGateway, sign_payload,
};
use waypoint_server::pricing::{GeoPoint, ProviderError, Route, RouteProvider};
use waypoint_server::{AppError, Config, ServerState, routes};

use chrono::Utc;
use shared::models::{Driver, MenuItem, status::FulfillmentStatus};
use shared::{Address, PriorityTier};

const WEBHOOK_SECRET: &str = "whsec_integration_test";
const SESSION_ID: &str = "cs_test_1";

/// Deterministic two-mile route provider
struct StubRouteProvider;

#[async_trait]
impl RouteProvider for StubRouteProvider {
    async fn geocode(&self, _address: &Address) -> Result<GeoPoint, ProviderError> {
        Ok(GeoPoint { lat: 39.78, lng: -89.65 })
    }

    async fn route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<Route, ProviderError> {
        Ok(Route {
            distance_meters: 3219,
            duration_seconds: 600,
            polyline: "stub".to_string(),
        })
    }
}

/// Gateway fake handing out one fixed session
struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(
        &self,
        _request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AppError> {
        Ok(CheckoutSession {
            id: SESSION_ID.to_string(),
            url: "https://pay.example.com/cs_test_1".to_string(),
        })
    }
}

/// Store wrapper counting batch commits
struct CountingStore {
    inner: MemoryStore,
    commits: AtomicUsize,
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, c: &str, id: &str) -> StoreResult<Option<Value>> {
        self.inner.get(c, id).await
    }
    async fn put(&self, c: &str, id: &str, doc: Value) -> StoreResult<()> {
        self.inner.put(c, id, doc).await
    }
    async fn merge(&self, c: &str, id: &str, patch: Value) -> StoreResult<()> {
        self.inner.merge(c, id, patch).await
    }
    async fn delete(&self, c: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(c, id).await
    }
    async fn find(&self, c: &str, f: &Filter, l: Option<usize>) -> StoreResult<Vec<Value>> {
        self.inner.find(c, f, l).await
    }
    async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit_batch(ops).await
    }
}

fn test_config(upload_dir: &str) -> Config {
    Config {
        http_port: 0,
        environment: "test".to_string(),
        jwt: JwtConfig {
            secret: "test-secret-test-secret-test-secret!".to_string(),
            expiration_minutes: 5,
        },
        webhook_secret: WEBHOOK_SECRET.to_string(),
        route_provider_url: "http://unused".to_string(),
        payment_gateway_url: None,
        payment_gateway_api_key: None,
        request_timeout_ms: 1_000,
        upload_dir: upload_dir.to_string(),
        rate_limit_sweep_ms: 60_000,
    }
}

struct TestApp {
    app: Router,
    state: ServerState,
}

fn build_app(store: StoreHandle, upload_dir: &str) -> TestApp {
    let state = ServerState::new(
        test_config(upload_dir),
        store,
        Arc::new(StubRouteProvider),
        Some(Arc::new(StubGateway)),
        Arc::new(TracingAuditSink),
    );
    TestApp {
        app: routes::build_router(state.clone()),
        state,
    }
}

fn token(state: &ServerState, id: &str, role: &str) -> String {
    state.jwt_service.issue_token(id, id, role).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn address(street: &str) -> Value {
    json!({
        "street": street,
        "city": "Springfield",
        "state": "IL",
        "zip": "62701",
    })
}

async fn seed_driver(store: &StoreHandle, id: &str) {
    DriverRepository::new(store.clone())
        .save(&Driver {
            id: id.to_string(),
            name: "Driver".to_string(),
            phone: "555-0199".to_string(),
            available: true,
            active: true,
            current_delivery_id: None,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
}

// ========== Delivery flow ==========

#[tokio::test]
async fn delivery_paid_webhook_flows_to_notification() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store.clone(), "unused");
    seed_driver(&store, "drv_1").await;
    let customer = token(&t.state, "cust_1", "customer");

    // Create the delivery: standard tier over a two-mile stub route
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/deliveries",
            Some(&customer),
            json!({
                "pickup": address("100 Main St"),
                "dropoff": address("5 Oak Ave"),
                "items": ["envelope"],
                "priority": "standard",
                "contactPhone": "555-0100",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    let delivery = &body["data"]["delivery"];
    let delivery_id = delivery["id"].as_str().unwrap().to_string();
    assert_eq!(delivery["status"], "pending_payment");
    assert_eq!(delivery["estimate"]["fee"], json!(8.0)); // 5.00 + 2mi * 1.50
    assert_eq!(body["data"]["checkoutUrl"], "https://pay.example.com/cs_test_1");

    // Gateway reports the session completed
    let event = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": SESSION_ID,
            "metadata": { "kind": "delivery", "delivery_id": delivery_id },
        }}
    })
    .to_string();
    let signature = sign_payload(WEBHOOK_SECRET, event.as_bytes());
    let (status, body) = send(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/payment")
            .header("signature", signature)
            .body(Body::from(event))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["received"], json!(true));

    let paid = DeliveryRepository::new(store.clone())
        .find_by_id(&delivery_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.status, FulfillmentStatus::Paid);

    let notifications = NotificationRepository::new(store.clone())
        .find_by_driver("drv_1")
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].payload["delivery_id"], json!(paid.id));
}

#[tokio::test]
async fn late_webhook_after_cancellation_still_gets_200() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store.clone(), "unused");
    let customer = token(&t.state, "cust_1", "customer");

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/deliveries",
            Some(&customer),
            json!({
                "pickup": address("100 Main St"),
                "dropoff": address("5 Oak Ave"),
                "items": ["envelope"],
                "priority": "standard",
                "contactPhone": "555-0100",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    let delivery_id = body["data"]["delivery"]["id"].as_str().unwrap().to_string();

    let webhook = |event: String| {
        let signature = sign_payload(WEBHOOK_SECRET, event.as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/payment")
            .header("signature", signature)
            .body(Body::from(event))
            .unwrap()
    };

    // Failure lands first and cancels the delivery
    let failure = json!({
        "id": "evt_1",
        "type": "payment_intent.payment_failed",
        "data": { "object": {
            "id": "pi_1",
            "metadata": { "delivery_id": delivery_id },
        }}
    });
    let (status, _) = send(&t.app, webhook(failure.to_string())).await;
    assert_eq!(status, StatusCode::OK);

    // The completion was already in flight; the gateway must still get
    // its 200 or it retries this event forever
    let completion = json!({
        "id": "evt_2",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": SESSION_ID,
            "metadata": { "kind": "delivery", "delivery_id": delivery_id },
        }}
    });
    let (status, body) = send(&t.app, webhook(completion.to_string())).await;
    assert_eq!(status, StatusCode::OK, "late event bounced: {body}");
    assert_eq!(body["data"]["received"], json!(true));

    let delivery = DeliveryRepository::new(store.clone())
        .find_by_id(&delivery_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery.status, FulfillmentStatus::Cancelled);
}

#[tokio::test]
async fn webhook_rejects_bad_signature() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, "unused");

    let (status, body) = send(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/payment")
            .header("signature", "deadbeef")
            .body(Body::from(r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{"id":"x"}}}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");
}

#[tokio::test]
async fn order_checkout_webhook_grants_one_spin() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store.clone(), "unused");
    MenuItemRepository::new(store.clone())
        .save(&MenuItem {
            id: "m1".to_string(),
            name: "Burger".to_string(),
            price: Decimal::new(999, 2),
            category: None,
            available: true,
        })
        .await
        .unwrap();
    let customer = token(&t.state, "cust_9", "customer");

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/checkout",
            Some(&customer),
            json!({ "cartItems": [{ "id": "m1", "quantity": 2 }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();

    let event = json!({
        "id": "evt_2",
        "type": "checkout.session.completed",
        "data": { "object": { "id": SESSION_ID, "metadata": { "user_id": "cust_9" } } }
    })
    .to_string();
    let signature = sign_payload(WEBHOOK_SECRET, event.as_bytes());
    let webhook = || {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/payment")
            .header("signature", &signature)
            .body(Body::from(event.clone()))
            .unwrap()
    };

    let (status, _) = send(&t.app, webhook()).await;
    assert_eq!(status, StatusCode::OK);
    // Redelivery of the same event
    let (status, _) = send(&t.app, webhook()).await;
    assert_eq!(status, StatusCode::OK);

    let order = waypoint_server::db::repository::OrderRepository::new(store.clone())
        .find_by_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, FulfillmentStatus::Paid);
    assert_eq!(
        UserRepository::new(store.clone()).get_spins("cust_9").await.unwrap(),
        1,
        "redelivered event must not double-increment"
    );
}

// ========== Screenshot order flow ==========

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(boundary: &str, image: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    let text_fields = [
        ("customerName", "Pat"),
        ("customerPhone", "555-0101"),
        ("customerEmail", "pat@example.com"),
        ("restaurantName", "Thai Palace"),
        ("pickupLocation", "12 Elm St"),
        ("estimatedTotal", "42.50"),
    ];
    for (name, value) in text_fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"screenshot\"; filename=\"order.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn screenshot_order_confirmation_sets_flag_only() {
    let dir = tempfile::tempdir().unwrap();
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, dir.path().to_str().unwrap());

    let boundary = "XTESTBOUNDARY";
    let (status, body) = send(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/api/orders/screenshot")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart_body(boundary, &png_bytes())))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();
    assert!(body["data"]["orderCode"].as_str().unwrap().starts_with("SO-"));

    let operator = token(&t.state, "op_1", "operator");
    let (status, body) = send(
        &t.app,
        json_request(
            "PUT",
            "/api/orders/screenshot",
            Some(&operator),
            json!({ "orderId": order_id, "status": "confirmed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "transition failed: {body}");
    let workflow = &body["data"]["workflow"];
    assert_eq!(workflow["confirmation_called"], json!(true));
    assert_eq!(workflow["review_required"], json!(true)); // prior flag unchanged
    assert_eq!(workflow["order_placed"], json!(false));

    // Unknown status strings are rejected up front
    let (status, _) = send(
        &t.app,
        json_request(
            "PUT",
            "/api/orders/screenshot",
            Some(&operator),
            json!({ "orderId": body["data"]["id"], "status": "teleported" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn screenshot_submit_rejects_non_image() {
    let dir = tempfile::tempdir().unwrap();
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, dir.path().to_str().unwrap());

    let boundary = "XTESTBOUNDARY";
    let (status, _) = send(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/api/orders/screenshot")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart_body(boundary, b"definitely not a png")))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ========== Bulk mutations ==========

#[tokio::test]
async fn bulk_delete_of_600_items_commits_two_chunks() {
    let store = Arc::new(CountingStore {
        inner: MemoryStore::new(),
        commits: AtomicUsize::new(0),
    });
    let handle: StoreHandle = store.clone();
    let menu = MenuItemRepository::new(handle.clone());
    for i in 0..600 {
        menu.save(&MenuItem {
            id: format!("m{i}"),
            name: format!("Item {i}"),
            price: Decimal::new(999, 2),
            category: None,
            available: true,
        })
        .await
        .unwrap();
    }
    let t = build_app(handle, "unused");
    let admin = token(&t.state, "admin_1", "admin");

    let items: Vec<Value> = (0..600).map(|i| json!({ "id": format!("m{i}") })).collect();
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/admin/menu/bulk",
            Some(&admin),
            json!({ "operation": "delete", "items": items }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "bulk failed: {body}");
    assert_eq!(store.commits.load(Ordering::SeqCst), 2);

    let success = body["data"]["success"].as_array().unwrap();
    let failed = body["data"]["failed"].as_array().unwrap();
    assert_eq!(success.len(), 600);
    assert!(failed.is_empty());

    let mut ids: Vec<&str> = success.iter().map(|s| s["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 600, "every id exactly once");
}

#[tokio::test]
async fn bulk_requires_admin_role() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, "unused");
    let operator = token(&t.state, "op_1", "operator");

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/admin/menu/bulk",
            Some(&operator),
            json!({ "operation": "delete", "items": [{ "id": "m1" }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "E2001");
}

// ========== Rate limiting ==========

#[tokio::test]
async fn rate_limit_headers_and_denial() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, "unused");

    let request = || {
        Request::builder()
            .method("GET")
            .uri("/api/health")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    };

    let response = t.app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-ratelimit-limit").unwrap(),
        "100"
    );
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "99"
    );
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    // Exhaust the window
    for _ in 0..99 {
        let response = t.app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = t.app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );

    // Another client is unaffected
    let other = Request::builder()
        .method("GET")
        .uri("/api/health")
        .header("x-forwarded-for", "198.51.100.1")
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(other).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Auth ==========

#[tokio::test]
async fn protected_routes_require_token() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let t = build_app(store, "unused");

    let (status, body) = send(
        &t.app,
        json_request("POST", "/api/checkout", None, json!({ "cartItems": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3001");
}

#[tokio::test]
async fn checkout_without_gateway_is_503() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let state = ServerState::new(
        test_config("unused"),
        store,
        Arc::new(StubRouteProvider),
        None, // gateway unconfigured
        Arc::new(TracingAuditSink),
    );
    let app = routes::build_router(state.clone());
    let customer = token(&state, "cust_1", "customer");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/checkout",
            Some(&customer),
            json!({ "cartItems": [{ "id": "m1", "quantity": 1 }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "E9004");
}
