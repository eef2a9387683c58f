use common::{ProductId, Timestamp, WithdrawalId};
use serde::{Deserialize, Serialize};
use store::Record;

/// Append-only record of stock consumed from a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(default)]
    pub id: WithdrawalId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub approved_at: Timestamp,
}

impl Withdrawal {
    pub fn new(product_id: ProductId, quantity: i64, approved_at: Timestamp) -> Self {
        Self {
            id: WithdrawalId::default(),
            product_id,
            quantity,
            approved_at,
        }
    }
}

impl Record for Withdrawal {
    const TABLE: &'static str = "withdrawals";
    const COLUMNS: &'static [&'static str] = &["id", "product_id", "quantity", "approved_at"];

    fn id(&self) -> i64 {
        self.id.get()
    }
}
