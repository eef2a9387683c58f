use common::ProductId;
use serde::{Deserialize, Serialize};
use store::Record;

/// A product carried by the warehouse.
///
/// `current_quantity` may go negative when more stock is consumed than is on
/// hand; the difference is treated as a backorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Category code.
    #[serde(default)]
    pub category: i64,
    pub current_quantity: i64,
    pub min_quantity: i64,
}

impl Product {
    pub fn new(name: impl Into<String>, current_quantity: i64, min_quantity: i64) -> Self {
        Self {
            id: ProductId::default(),
            name: name.into(),
            description: String::new(),
            category: 0,
            current_quantity,
            min_quantity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true while stock sits below the configured minimum.
    pub fn needs_replenishment(&self) -> bool {
        self.current_quantity < self.min_quantity
    }

    /// Units missing to reach the minimum (0 when stocked).
    pub fn deficit(&self) -> i64 {
        self.min_quantity.saturating_sub(self.current_quantity).max(0)
    }
}

impl Record for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "category",
        "current_quantity",
        "min_quantity",
    ];

    fn id(&self) -> i64 {
        self.id.get()
    }
}
