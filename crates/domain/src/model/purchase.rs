use common::{Money, OrderId, PurchaseId, Timestamp};
use serde::{Deserialize, Serialize};
use store::{Record, Scalar, UniqueKey};

use super::OrderWithLines;

/// Unique constraint allowing one purchase per order.
pub const ONE_PURCHASE_PER_ORDER: &str = "purchases_order_id_key";

/// The state of a purchase in its lifecycle.
///
/// ```text
/// Open ──► Confirmed ──► Concluded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseState {
    /// Created at approval; lines may still change.
    #[default]
    Open,

    /// Economics are frozen.
    Confirmed,

    /// Goods received (terminal state).
    Concluded,
}

impl PurchaseState {
    pub fn can_confirm(&self) -> bool {
        matches!(self, PurchaseState::Open)
    }

    pub fn can_conclude(&self) -> bool {
        matches!(self, PurchaseState::Confirmed)
    }

    /// Returns true once the purchase's lines may no longer change.
    pub fn is_frozen(&self) -> bool {
        !matches!(self, PurchaseState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseState::Open => "open",
            PurchaseState::Confirmed => "confirmed",
            PurchaseState::Concluded => "concluded",
        }
    }
}

impl std::fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PurchaseState> for Scalar {
    fn from(state: PurchaseState) -> Self {
        Scalar::Text(state.as_str().to_string())
    }
}

/// Snapshot of an approved order progressing towards conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    #[serde(default)]
    pub id: PurchaseId,
    #[serde(default)]
    pub state: PurchaseState,
    pub created_at: Timestamp,
    #[serde(default, with = "common::zero_as_none")]
    pub confirmed_at: Option<Timestamp>,
    #[serde(default, with = "common::zero_as_none")]
    pub concluded_at: Option<Timestamp>,
    pub total_value: Money,
    pub order_id: OrderId,
}

impl Purchase {
    /// Derives a purchase from an order and its lines.
    ///
    /// Returns `None` when the line values do not sum to a storable amount.
    pub fn from_order(order: &OrderWithLines, created_at: Timestamp) -> Option<Self> {
        Some(Self {
            id: PurchaseId::default(),
            state: PurchaseState::Open,
            created_at,
            confirmed_at: None,
            concluded_at: None,
            total_value: order.total_value()?,
            order_id: order.id(),
        })
    }
}

impl Record for Purchase {
    const TABLE: &'static str = "purchases";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "state",
        "created_at",
        "confirmed_at",
        "concluded_at",
        "total_value",
        "order_id",
    ];

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            ONE_PURCHASE_PER_ORDER,
            self.order_id.to_string(),
        )]
    }
}

/// A purchase with the order it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub order: OrderWithLines,
}
