//! Records persisted by the inventory engine.

mod order;
mod product;
mod purchase;
mod withdrawal;

pub use order::{ONE_LINE_PER_PRODUCT, Order, OrderLine, OrderWithLines, SINGLE_OPEN_ORDER};
pub use product::Product;
pub use purchase::{ONE_PURCHASE_PER_ORDER, Purchase, PurchaseState, PurchaseView};
pub use withdrawal::Withdrawal;
