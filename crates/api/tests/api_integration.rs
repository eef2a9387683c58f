//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
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

fn setup() -> axum::Router {
    let state = api::create_default_state(InMemoryStore::new());
    api::create_app(state, get_metrics_handle())
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
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

async fn create_product(app: &axum::Router, name: &str, current: i64, min: i64) -> Value {
    let (status, product) = send(
        app,
        "POST",
        "/api/inventory/product",
        Some(json!({ "name": name, "current_quantity": current, "min_quantity": min })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create {name}: {product}");
    product
}

fn line_for<'a>(order: &'a Value, product: &Value) -> Option<&'a Value> {
    order["purchase_products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|line| line["product_id"] == product["id"])
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
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_no_open_order_is_404() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/api/inventory/order/open", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_short_product_lands_on_open_order() {
    let app = setup();
    let well_stocked = create_product(&app, "h2oh", 200, 50).await;
    let short = create_product(&app, "kuat", 10, 50).await;

    let (status, order) = send(&app, "GET", "/api/inventory/order/open", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["approved"], false);
    assert_eq!(order["canceled"], false);
    assert!(line_for(&order, &well_stocked).is_none());
    assert_eq!(line_for(&order, &short).unwrap()["quantity"], 40);
}

#[tokio::test]
async fn test_update_product_reevaluates_stock() {
    let app = setup();
    let product = create_product(&app, "pepsi", 100, 10).await;
    let id = product["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/inventory/product/{id}"),
        Some(json!({ "name": "pepsi", "current_quantity": 100, "min_quantity": 130 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["min_quantity"], 130);

    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    assert_eq!(line_for(&order, &product).unwrap()["quantity"], 30);
}

#[tokio::test]
async fn test_consume_records_withdrawal_and_replenishes() {
    let app = setup();
    let product = create_product(&app, "guarana", 100, 10).await;
    let id = product["id"].as_i64().unwrap();

    let (status, withdrawal) = send(
        &app,
        "POST",
        &format!("/api/inventory/product/{id}/consume/95"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(withdrawal["product_id"], id);
    assert_eq!(withdrawal["quantity"], 95);

    let (_, stored) = send(&app, "GET", &format!("/api/inventory/product/{id}"), None).await;
    assert_eq!(stored["current_quantity"], 5);

    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    assert_eq!(line_for(&order, &product).unwrap()["quantity"], 5);

    let (status, withdrawals) = send(
        &app,
        "GET",
        &format!("/api/inventory/withdrawal?eq=product_id%7C{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(withdrawals.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_consume_non_positive_quantity_is_400() {
    let app = setup();
    let product = create_product(&app, "h2oh", 100, 10).await;
    let id = product["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/inventory/product/{id}/consume/0"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_product_is_404() {
    let app = setup();

    let (get_status, _) = send(&app, "GET", "/api/inventory/product/999", None).await;
    let (delete_status, _) = send(&app, "DELETE", "/api/inventory/product/999", None).await;
    let (consume_status, _) =
        send(&app, "POST", "/api/inventory/product/999/consume/1", None).await;

    assert_eq!(get_status, StatusCode::NOT_FOUND);
    assert_eq!(delete_status, StatusCode::NOT_FOUND);
    assert_eq!(consume_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_product_is_204_and_drops_line() {
    let app = setup();
    let keep = create_product(&app, "pepsi", 0, 10).await;
    let gone = create_product(&app, "kuat", 0, 10).await;
    let gone_id = gone["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/inventory/product/{gone_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    assert!(line_for(&order, &keep).is_some());
    assert!(line_for(&order, &gone).is_none());
}

#[tokio::test]
async fn test_purchase_lifecycle() {
    let app = setup();
    let product = create_product(&app, "pepsi", 10, 50).await;
    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    let order_id = order["id"].as_i64().unwrap();
    let line_id = line_for(&order, &product).unwrap()["id"].as_i64().unwrap();

    let (status, line) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchaseProduct/{line_id}/updateValue/25.50"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["value"], 25.5);

    let (status, purchase) = send(
        &app,
        "PUT",
        &format!("/api/inventory/order/{order_id}/approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purchase["state"], "open");
    assert_eq!(purchase["order_id"], order_id);
    assert_eq!(purchase["total_value"], 25.5);
    let purchase_id = purchase["id"].as_i64().unwrap();

    // Approving twice fails: the order is closed.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/order/{order_id}/approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchase/{purchase_id}/conclude"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, confirmed) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchase/{purchase_id}/confirm"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["state"], "confirmed");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchaseProduct/{line_id}/updateQuantity/99"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, concluded) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchase/{purchase_id}/conclude"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(concluded["state"], "concluded");

    let (status, views) = send(&app, "GET", "/api/inventory/purchase/query/concluded", None).await;
    assert_eq!(status, StatusCode::OK);
    let views = views.as_array().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["order"]["id"], order_id);

    let (status, by_order) = send(
        &app,
        "GET",
        &format!("/api/inventory/purchase/order/{order_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_order["id"], purchase_id);
}

#[tokio::test]
async fn test_cancel_order_is_204() {
    let app = setup();
    create_product(&app, "h2oh", 0, 5).await;
    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/order/{order_id}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/inventory/order/open", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, canceled) = send(&app, "GET", &format!("/api/inventory/order/{order_id}"), None).await;
    assert_eq!(canceled["canceled"], true);
}

#[tokio::test]
async fn test_invalid_line_value_is_400() {
    let app = setup();
    let product = create_product(&app, "kuat", 0, 5).await;
    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    let line_id = line_for(&order, &product).unwrap()["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchaseProduct/{line_id}/updateValue/-3"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_filters() {
    let app = setup();
    create_product(&app, "pepsi", 300, 10).await;
    create_product(&app, "kuat", 150, 10).await;
    create_product(&app, "h2oh", 250, 10).await;

    let (status, by_name) = send(&app, "GET", "/api/inventory/product?eq=name%7Ckuat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_name.as_array().unwrap().len(), 1);
    assert_eq!(by_name[0]["name"], "kuat");

    let (_, at_least) = send(
        &app,
        "GET",
        "/api/inventory/product?gte=current_quantity%7C200",
        None,
    )
    .await;
    assert_eq!(at_least.as_array().unwrap().len(), 2);

    let (_, everything) = send(&app, "GET", "/api/inventory/product", None).await;
    assert_eq!(everything.as_array().unwrap().len(), 3);

    let (status, _) = send(&app, "GET", "/api/inventory/product?eq=color%7Cred", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_purchase_query_is_404() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/api/inventory/purchase?eq=state%7Copen", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_answer_json_errors() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/api/inventory/product/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());

    let (status, json) = send(
        &app,
        "PUT",
        "/api/inventory/purchaseProduct/1/updateQuantity/lots",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());

    let (status, json) = send(
        &app,
        "POST",
        "/api/inventory/product",
        Some(json!({ "name": "kuat" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_oversized_line_value_is_400() {
    let app = setup();
    let product = create_product(&app, "pepsi", 0, 5).await;
    let (_, order) = send(&app, "GET", "/api/inventory/order/open", None).await;
    let line_id = line_for(&order, &product).unwrap()["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/inventory/purchaseProduct/{line_id}/updateValue/90000000000000000"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid line value"));
}
