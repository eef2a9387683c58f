//! HTTP handlers grouped by resource.

pub mod health;
pub mod lines;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod purchases;
pub mod withdrawals;

use domain::{FilterMap, InventoryService};

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub inventory: InventoryService<S>,
}

/// Query-string pairs such as `?eq=product_id|45&gte=quantity|200`.
pub type FilterQuery = Vec<(String, String)>;

pub(crate) fn filter_map(pairs: FilterQuery) -> FilterMap {
    FilterMap::from_pairs(pairs)
}
