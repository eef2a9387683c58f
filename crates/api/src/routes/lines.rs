//! Order line endpoints.

use std::sync::Arc;

use axum::extract::State;
use common::{LineId, Money};
use domain::OrderLine;
use store::Store;

use super::{AppState, FilterQuery, filter_map};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

/// GET /api/inventory/purchaseProduct
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(pairs): Query<FilterQuery>,
) -> Result<Json<Vec<OrderLine>>, ApiError> {
    let lines = state.inventory.list_lines(&filter_map(pairs)).await?;
    Ok(Json(lines))
}

/// PUT /api/inventory/purchaseProduct/{id}/updateQuantity/{quantity}
#[tracing::instrument(skip(state))]
pub async fn update_quantity<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, quantity)): Path<(LineId, i64)>,
) -> Result<Json<OrderLine>, ApiError> {
    let line = state.inventory.update_line_quantity(id, quantity).await?;
    Ok(Json(line))
}

/// PUT /api/inventory/purchaseProduct/{id}/updateValue/{value}
///
/// `value` is a decimal amount such as `25.50`.
#[tracing::instrument(skip(state))]
pub async fn update_value<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, value)): Path<(LineId, f64)>,
) -> Result<Json<OrderLine>, ApiError> {
    let value = Money::from_decimal(value)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid line value: {value}")))?;
    let line = state.inventory.update_line_value(id, value).await?;
    Ok(Json(line))
}
