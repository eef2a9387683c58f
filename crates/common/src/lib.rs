//! Shared value types used across the inventory crates.

mod money;
mod time;
mod types;

pub use money::Money;
pub use time::{Timestamp, zero_as_none};
pub use types::{LineId, OrderId, ProductId, PurchaseId, WithdrawalId};
