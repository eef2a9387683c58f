//! Withdrawal history endpoint.

use std::sync::Arc;

use axum::extract::State;
use domain::Withdrawal;
use store::Store;

use super::{AppState, FilterQuery, filter_map};
use crate::error::ApiError;
use crate::extract::{Json, Query};

/// GET /api/inventory/withdrawal: e.g. `?eq=product_id|45&gte=approved_at|1700000000`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(pairs): Query<FilterQuery>,
) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    let withdrawals = state.inventory.list_withdrawals(&filter_map(pairs)).await?;
    Ok(Json(withdrawals))
}
