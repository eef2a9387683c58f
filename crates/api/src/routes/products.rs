//! Product endpoints: catalog CRUD and stock withdrawals.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::ProductId;
use domain::{Product, Withdrawal};
use store::Store;

use super::{AppState, FilterQuery, filter_map};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

/// POST /api/inventory/product: creates a product and tops up the open order if it runs short.
#[tracing::instrument(skip(state, product))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(product): Json<Product>,
) -> Result<Json<Product>, ApiError> {
    let created = state.inventory.create_product(product).await?;
    Ok(Json(created))
}

/// GET /api/inventory/product: lists products, optionally filtered.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(pairs): Query<FilterQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.inventory.list_products(&filter_map(pairs)).await?;
    Ok(Json(products))
}

/// GET /api/inventory/product/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    let product = state.inventory.get_product(id).await?;
    Ok(Json(product))
}

/// PUT /api/inventory/product/{id}
#[tracing::instrument(skip(state, product))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(product): Json<Product>,
) -> Result<Json<Product>, ApiError> {
    let updated = state.inventory.update_product(id, product).await?;
    Ok(Json(updated))
}

/// DELETE /api/inventory/product/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.inventory.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET|POST /api/inventory/product/{id}/consume/{quantity}: records a withdrawal.
#[tracing::instrument(skip(state))]
pub async fn consume<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, quantity)): Path<(ProductId, i64)>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state.inventory.consume_product(id, quantity).await?;
    Ok(Json(withdrawal))
}
