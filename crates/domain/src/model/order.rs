use common::{LineId, Money, OrderId, ProductId, Timestamp};
use serde::{Deserialize, Serialize};
use store::{Record, UniqueKey};

/// Unique index allowing a single unapproved, uncanceled order.
pub const SINGLE_OPEN_ORDER: &str = "orders_single_open";

/// Unique constraint allowing one line per product per order.
pub const ONE_LINE_PER_PRODUCT: &str = "order_lines_order_product_key";

/// A replenishment order.
///
/// An order is open while it is neither approved nor canceled. It is closed
/// exactly once and never reopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: OrderId,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub canceled: bool,
    pub created_at: Timestamp,
    #[serde(default, with = "common::zero_as_none")]
    pub closed_at: Option<Timestamp>,
}

impl Order {
    /// A new open order stamped at `created_at`.
    pub fn open(created_at: Timestamp) -> Self {
        Self {
            id: OrderId::default(),
            approved: false,
            canceled: false,
            created_at,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.approved && !self.canceled
    }
}

impl Record for Order {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [&'static str] =
        &["id", "approved", "canceled", "created_at", "closed_at"];

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        if self.is_open() {
            vec![UniqueKey::new(SINGLE_OPEN_ORDER, "open")]
        } else {
            Vec::new()
        }
    }
}

/// One product's requested quantity and value within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub id: LineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub value: Money,
}

impl OrderLine {
    pub fn new(order_id: OrderId, product_id: ProductId, quantity: i64, value: Money) -> Self {
        Self {
            id: LineId::default(),
            order_id,
            product_id,
            quantity,
            value,
        }
    }
}

impl Record for OrderLine {
    const TABLE: &'static str = "order_lines";
    const COLUMNS: &'static [&'static str] = &["id", "order_id", "product_id", "quantity", "value"];

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            ONE_LINE_PER_PRODUCT,
            format!("{}:{}", self.order_id, self.product_id),
        )]
    }
}

/// An order together with its lines, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub purchase_products: Vec<OrderLine>,
}

impl OrderWithLines {
    pub fn id(&self) -> OrderId {
        self.order.id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.purchase_products
    }

    pub fn line_for(&self, product_id: ProductId) -> Option<&OrderLine> {
        self.purchase_products
            .iter()
            .find(|line| line.product_id == product_id)
    }

    /// Sum of the line values, or `None` past [`Money::MAX`].
    pub fn total_value(&self) -> Option<Money> {
        self.purchase_products
            .iter()
            .try_fold(Money::zero(), |total, line| total.checked_add(line.value))
    }
}
