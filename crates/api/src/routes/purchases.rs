//! Purchase endpoints and lifecycle transitions.

use std::sync::Arc;

use axum::extract::State;
use common::{OrderId, PurchaseId};
use domain::{Purchase, PurchaseView};
use store::Store;

use super::{AppState, FilterQuery, filter_map};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

/// GET /api/inventory/purchase: purchases matching the filter, each with its order.
#[tracing::instrument(skip(state))]
pub async fn query<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(pairs): Query<FilterQuery>,
) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    let purchases = state.inventory.query_purchases(&filter_map(pairs)).await?;
    Ok(Json(purchases))
}

/// GET /api/inventory/purchase/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PurchaseId>,
) -> Result<Json<PurchaseView>, ApiError> {
    let purchase = state.inventory.get_purchase(id).await?;
    Ok(Json(purchase))
}

/// GET /api/inventory/purchase/order/{order_id}
#[tracing::instrument(skip(state))]
pub async fn by_order<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<PurchaseView>, ApiError> {
    let purchase = state.inventory.get_purchase_by_order(order_id).await?;
    Ok(Json(purchase))
}

/// GET /api/inventory/purchase/query/open
#[tracing::instrument(skip(state))]
pub async fn open<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    Ok(Json(state.inventory.list_open_purchases().await?))
}

/// GET /api/inventory/purchase/query/confirmed
#[tracing::instrument(skip(state))]
pub async fn confirmed<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    Ok(Json(state.inventory.list_confirmed_purchases().await?))
}

/// GET /api/inventory/purchase/query/concluded
#[tracing::instrument(skip(state))]
pub async fn concluded<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    Ok(Json(state.inventory.list_concluded_purchases().await?))
}

/// PUT /api/inventory/purchase/{id}/confirm: freezes the purchase's lines.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PurchaseId>,
) -> Result<Json<Purchase>, ApiError> {
    let purchase = state.inventory.confirm_purchase(id).await?;
    Ok(Json(purchase))
}

/// PUT /api/inventory/purchase/{id}/conclude
#[tracing::instrument(skip(state))]
pub async fn conclude<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PurchaseId>,
) -> Result<Json<Purchase>, ApiError> {
    let purchase = state.inventory.conclude_purchase(id).await?;
    Ok(Json(purchase))
}
