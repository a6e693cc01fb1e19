//! Integration tests for the API server, driven end-to-end over the
//! in-memory backends.

use std::sync::Arc;
use std::sync::OnceLock;

use activity::InMemoryActivityLog;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
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

fn setup() -> Router {
    setup_with_state().0
}

fn setup_with_state() -> (
    Router,
    Arc<api::AppState<InMemoryStore, InMemoryActivityLog>>,
) {
    let state = api::create_state(InMemoryStore::new(), InMemoryActivityLog::new());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_user(app: &Router, username: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/users",
        Some(json!({ "username": username, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn create_product(app: &Router, name: &str, sku: &str, price_cents: i64, stock: i32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/products",
        Some(json!({
            "name": name,
            "sku": sku,
            "price_cents": price_cents,
            "stock": stock
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_crud() {
    let app = setup();

    let id = create_user(&app, "alice", "alice@example.com").await;

    let (status, user) = send(&app, "GET", &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/users/{id}"),
        Some(json!({ "email": "alice@corp.example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["email"], "alice@corp.example.com");
    assert_eq!(updated["username"], "alice");

    let (status, deleted) = send(&app, "DELETE", &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "User deleted");

    let (status, _) = send(&app, "GET", &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let app = setup();

    create_user(&app, "alice", "alice@example.com").await;
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({ "username": "alice", "email": "other@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_json_body_is_a_bad_request() {
    let app = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_get_nonexistent_user() {
    let app = setup();
    let fake_id = uuid::Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/users/{fake_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_user_list_pagination() {
    let app = setup();

    for i in 0..5 {
        create_user(&app, &format!("user{i}"), &format!("user{i}@example.com")).await;
    }

    let (status, page) = send(&app, "GET", "/users?page=1&per_page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["users"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 5);
    assert_eq!(page["pages"], 3);
    assert_eq!(page["current_page"], 1);

    let (_, last) = send(&app, "GET", "/users?page=3&per_page=2", None).await;
    assert_eq!(last["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_crud_with_stock() {
    let app = setup();

    let id = create_product(&app, "Widget", "SKU-001", 1999, 10).await;

    let (status, product) = send(&app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["name"], "Widget");
    assert_eq!(product["price_cents"], 1999);
    assert_eq!(product["stock"], 10);

    // Administrative stock adjustment via product update
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/products/{id}"),
        Some(json!({ "stock": 25, "price_cents": 2099 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"], 25);
    assert_eq!(updated["price_cents"], 2099);

    let (status, deleted) = send(&app, "DELETE", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Product deleted");

    let (status, _) = send(&app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let app = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Bad", "sku": "SKU-BAD", "price_cents": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn test_duplicate_sku_is_rejected() {
    let app = setup();

    create_product(&app, "Widget", "SKU-001", 1000, 1).await;
    let (status, _) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Other", "sku": "SKU-001", "price_cents": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_place_order_decrements_stock() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;

    let (status, order) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 3 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "Completed");
    assert_eq!(order["total_amount_cents"], 3000);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["price_cents"], 1000);

    let (_, product) = send(&app, "GET", &format!("/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 2);
}

#[tokio::test]
async fn test_insufficient_stock_rejects_order() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 2).await;

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 3 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("insufficient"));

    // Stock untouched
    let (_, product) = send(&app, "GET", &format!("/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 2);
}

#[tokio::test]
async fn test_order_for_unknown_product_is_rejected() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let fake_product = uuid::Uuid::new_v4();

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": fake_product, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_for_unknown_user_is_rejected() {
    let app = setup();

    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    let fake_user = uuid::Uuid::new_v4();

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": fake_user,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_without_user_id_is_rejected() {
    let app = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing user_id");
}

#[tokio::test]
async fn test_empty_order_is_rejected() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({ "user_id": user_id, "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_status_update() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}"),
        Some(json!({ "status": "Cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Cancelled");

    // Cancelling does not restore stock
    let (_, product) = send(&app, "GET", &format!("/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 4);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}"),
        Some(json!({ "status": "Shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid status"));
}

#[tokio::test]
async fn test_delete_order_keeps_stock() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 2 }]
        })),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, deleted) = send(&app, "DELETE", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Order deleted");

    let (status, _) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, product) = send(&app, "GET", &format!("/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 3);
}

#[tokio::test]
async fn test_user_with_orders_cannot_be_deleted() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "DELETE", &format!("/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logs_capture_activity() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;

    let (status, logs) = send(&app, "GET", "/logs", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = logs.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    // Newest first
    assert_eq!(entries[0]["action"], "CREATE_ORDER");
    assert_eq!(entries[0]["actor"], user_id);
    assert_eq!(entries[1]["action"], "CREATE_PRODUCT");
    assert_eq!(entries[1]["actor"], "ADMIN");
    assert_eq!(entries[2]["action"], "CREATE_USER");

    let (_, limited) = send(&app, "GET", "/logs?limit=1", None).await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unavailable_activity_sink_does_not_block_requests() {
    let (app, state) = setup_with_state();
    state.activity.set_unavailable(true);

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, logs) = send(&app, "GET", "/logs", None).await;
    assert_eq!(logs.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_stats_counts_entities() {
    let app = setup();

    let user_id = create_user(&app, "alice", "alice@example.com").await;
    create_user(&app, "bob", "bob@example.com").await;
    let product_id = create_product(&app, "Widget", "SKU-001", 1000, 5).await;
    send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;

    let (status, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["users"], 2);
    assert_eq!(stats["products"], 1);
    assert_eq!(stats["orders"], 1);
    assert_eq!(stats["logs"], 4);
}
