//! Inventory lifecycle engine.
//!
//! This crate provides:
//! - The stock ledger, which records withdrawals and triggers replenishment
//! - The order aggregator, which keeps a single open order with one line per product
//! - The purchase lifecycle (`open → confirmed → concluded`)
//! - Filter maps, the declarative filters accepted by read paths

pub mod error;
pub mod ledger;
pub mod model;
pub mod orders;
pub mod purchases;
pub mod query;
pub mod service;

pub use error::{InventoryError, Result};
pub use ledger::StockLedger;
pub use model::{
    Order, OrderLine, OrderWithLines, Product, Purchase, PurchaseState, PurchaseView, Withdrawal,
};
pub use orders::{LineDraft, OrderAggregator};
pub use purchases::PurchaseLifecycle;
pub use query::{Condition, FilterMap, FilterOp};
pub use service::InventoryService;
