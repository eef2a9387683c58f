//! Inventory service providing one method per inventory action.

use std::sync::Arc;

use common::{LineId, Money, OrderId, ProductId, PurchaseId};
use store::Store;

use crate::error::Result;
use crate::ledger::StockLedger;
use crate::model::{
    OrderLine, OrderWithLines, Product, Purchase, PurchaseState, PurchaseView, Withdrawal,
};
use crate::orders::OrderAggregator;
use crate::purchases::PurchaseLifecycle;
use crate::query::FilterMap;

/// Service for managing warehouse inventory.
///
/// Wires the stock ledger, order aggregator and purchase lifecycle over one
/// shared store. Clones share the store and the in-process gates.
pub struct InventoryService<S> {
    ledger: StockLedger<S>,
    orders: OrderAggregator<S>,
    purchases: PurchaseLifecycle<S>,
}

impl<S> Clone for InventoryService<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            orders: self.orders.clone(),
            purchases: self.purchases.clone(),
        }
    }
}

impl<S: Store> InventoryService<S> {
    /// Creates a new inventory service over the given store.
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        let orders = OrderAggregator::new(Arc::clone(&store));
        Self {
            ledger: StockLedger::new(Arc::clone(&store), orders.clone()),
            purchases: PurchaseLifecycle::new(store),
            orders,
        }
    }

    pub fn orders(&self) -> &OrderAggregator<S> {
        &self.orders
    }

    // Products

    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, product: Product) -> Result<Product> {
        self.ledger.create(product).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_product(&self, id: ProductId, product: Product) -> Result<Product> {
        self.ledger.update(id, product).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.ledger.delete(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.ledger.get(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, filter: &FilterMap) -> Result<Vec<Product>> {
        self.ledger.list(filter).await
    }

    /// Consumes stock, records the withdrawal and re-evaluates replenishment.
    #[tracing::instrument(skip(self))]
    pub async fn consume_product(&self, id: ProductId, quantity: i64) -> Result<Withdrawal> {
        self.ledger.consume(id, quantity).await
    }

    // Orders

    #[tracing::instrument(skip(self))]
    pub async fn get_open_order(&self) -> Result<OrderWithLines> {
        self.orders.open_order().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderWithLines> {
        self.orders.order(id).await
    }

    /// Approves an order and returns the purchase derived from it.
    #[tracing::instrument(skip(self))]
    pub async fn approve_order(&self, id: OrderId) -> Result<Purchase> {
        self.orders.approve(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<()> {
        self.orders.cancel(id).await
    }

    // Purchases

    #[tracing::instrument(skip(self))]
    pub async fn query_purchases(&self, filter: &FilterMap) -> Result<Vec<PurchaseView>> {
        self.purchases.query(filter).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_purchase(&self, id: PurchaseId) -> Result<PurchaseView> {
        self.purchases.get(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_purchase_by_order(&self, order_id: OrderId) -> Result<PurchaseView> {
        self.purchases.get_by_order(order_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_open_purchases(&self) -> Result<Vec<PurchaseView>> {
        self.purchases.in_state(PurchaseState::Open).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_confirmed_purchases(&self) -> Result<Vec<PurchaseView>> {
        self.purchases.in_state(PurchaseState::Confirmed).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_concluded_purchases(&self) -> Result<Vec<PurchaseView>> {
        self.purchases.in_state(PurchaseState::Concluded).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_purchase(&self, id: PurchaseId) -> Result<Purchase> {
        self.purchases.confirm(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn conclude_purchase(&self, id: PurchaseId) -> Result<Purchase> {
        self.purchases.conclude(id).await
    }

    // Lines

    #[tracing::instrument(skip(self))]
    pub async fn update_line_quantity(&self, id: LineId, quantity: i64) -> Result<OrderLine> {
        self.purchases.update_line_quantity(id, quantity).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_line_value(&self, id: LineId, value: Money) -> Result<OrderLine> {
        self.purchases.update_line_value(id, value).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_lines(&self, filter: &FilterMap) -> Result<Vec<OrderLine>> {
        self.orders.lines(filter).await
    }

    // Withdrawals

    #[tracing::instrument(skip(self))]
    pub async fn list_withdrawals(&self, filter: &FilterMap) -> Result<Vec<Withdrawal>> {
        self.ledger.withdrawals(filter).await
    }
}
