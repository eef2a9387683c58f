//! HTTP API server for the inventory engine.
//!
//! Exposes the product, order, purchase, line and withdrawal resources under
//! `/api/inventory`, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::InventoryService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/inventory", inventory_routes::<S>())
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

fn inventory_routes<S: Store + 'static>() -> Router<Arc<AppState<S>>> {
    use routes::{lines, orders, products, purchases, withdrawals};

    Router::new()
        .route(
            "/product",
            post(products::create::<S>).get(products::list::<S>),
        )
        .route(
            "/product/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/product/{id}/consume/{quantity}",
            get(products::consume::<S>).post(products::consume::<S>),
        )
        .route("/order/open", get(orders::open::<S>))
        .route("/order/{id}", get(orders::get::<S>))
        .route("/order/{id}/approve", put(orders::approve::<S>))
        .route("/order/{id}/cancel", put(orders::cancel::<S>))
        .route("/purchase", get(purchases::query::<S>))
        .route("/purchase/{id}", get(purchases::get::<S>))
        .route("/purchase/order/{order_id}", get(purchases::by_order::<S>))
        .route("/purchase/query/open", get(purchases::open::<S>))
        .route("/purchase/query/confirmed", get(purchases::confirmed::<S>))
        .route("/purchase/query/concluded", get(purchases::concluded::<S>))
        .route("/purchase/{id}/confirm", put(purchases::confirm::<S>))
        .route("/purchase/{id}/conclude", put(purchases::conclude::<S>))
        .route("/purchaseProduct", get(lines::list::<S>))
        .route(
            "/purchaseProduct/{id}/updateQuantity/{quantity}",
            put(lines::update_quantity::<S>),
        )
        .route(
            "/purchaseProduct/{id}/updateValue/{value}",
            put(lines::update_value::<S>),
        )
        .route("/withdrawal", get(withdrawals::list::<S>))
}

/// Creates the application state over the given store.
pub fn create_default_state<S: Store + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        inventory: InventoryService::new(store),
    })
}

/// Registers descriptions for the counters the inventory engine emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "inventory_withdrawals_total",
        "Stock withdrawals recorded by the ledger"
    );
    metrics::describe_counter!(
        "inventory_orders_opened_total",
        "Replenishment orders opened"
    );
    metrics::describe_counter!(
        "inventory_open_order_races_total",
        "Open-order insert races retried by the aggregator"
    );
    metrics::describe_counter!(
        "inventory_orders_approved_total",
        "Orders approved into purchases"
    );
    metrics::describe_counter!(
        "inventory_purchases_confirmed_total",
        "Purchases confirmed"
    );
    metrics::describe_counter!(
        "inventory_purchases_concluded_total",
        "Purchases concluded"
    );
}
