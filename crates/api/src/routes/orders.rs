//! Order endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::OrderId;
use domain::{OrderWithLines, Purchase};
use store::Store;

use super::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};

/// GET /api/inventory/order/open: the single open order with its lines.
#[tracing::instrument(skip(state))]
pub async fn open<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderWithLines>, ApiError> {
    let order = state.inventory.get_open_order().await?;
    Ok(Json(order))
}

/// GET /api/inventory/order/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithLines>, ApiError> {
    let order = state.inventory.get_order(id).await?;
    Ok(Json(order))
}

/// PUT /api/inventory/order/{id}/approve: closes the order and opens its purchase.
#[tracing::instrument(skip(state))]
pub async fn approve<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Purchase>, ApiError> {
    let purchase = state.inventory.approve_order(id).await?;
    Ok(Json(purchase))
}

/// PUT /api/inventory/order/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    state.inventory.cancel_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
