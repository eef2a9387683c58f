//! Replenishment order aggregation.
//!
//! At most one order is open at any time. Lines are attached to it through a
//! single merge rule, so each product appears at most once per order. The
//! read-decide-write sequences run under an in-process gate; across
//! processes the storage unique constraints reject the loser of a race, which
//! is then retried as a merge into the winner's order.

use std::sync::Arc;

use common::{Money, OrderId, ProductId, Timestamp};
use store::{Filter, Patch, Store, StoreExt};
use tokio::sync::Mutex;

use crate::error::{InventoryError, Result};
use crate::model::{
    ONE_LINE_PER_PRODUCT, Order, OrderLine, OrderWithLines, Purchase, SINGLE_OPEN_ORDER,
};
use crate::query::FilterMap;

/// Attempts before a lost creation race is reported as a conflict.
const MAX_ATTEMPTS: usize = 3;

/// The requested state of a product's line on the open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDraft {
    pub quantity: i64,
    /// New value for the line; `None` keeps the current value (zero for a
    /// new line).
    pub value: Option<Money>,
}

impl LineDraft {
    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity,
            value: None,
        }
    }

    pub fn with_value(mut self, value: Money) -> Self {
        self.value = Some(value);
        self
    }
}

/// Owns the open order and its lines.
pub struct OrderAggregator<S> {
    store: Arc<S>,
    gate: Arc<Mutex<()>>,
}

impl<S> Clone for OrderAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gate: Arc::clone(&self.gate),
        }
    }
}

fn open_orders() -> Filter {
    Filter::new().eq("approved", false).eq("canceled", false)
}

impl<S: Store> OrderAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the open order, if any.
    ///
    /// More than one match means the single-open-order invariant is broken.
    async fn find_open(&self) -> Result<Option<Order>> {
        let mut open = self.store.find::<Order>(&open_orders()).await?;
        match open.len() {
            0 | 1 => Ok(open.pop()),
            count => {
                tracing::error!(count, "found more than one open order");
                Err(InventoryError::Consistency(format!(
                    "{count} open orders exist"
                )))
            }
        }
    }

    async fn with_lines(&self, order: Order) -> Result<OrderWithLines> {
        let purchase_products = self
            .store
            .related::<Order, OrderLine>(&order, "order_id")
            .await?;
        Ok(OrderWithLines {
            order,
            purchase_products,
        })
    }

    /// Returns the open order with its lines.
    pub async fn open_order(&self) -> Result<OrderWithLines> {
        match self.find_open().await? {
            Some(order) => self.with_lines(order).await,
            None => Err(InventoryError::not_found("order", "open")),
        }
    }

    /// Returns any order with its lines.
    pub async fn order(&self, id: OrderId) -> Result<OrderWithLines> {
        let order = self
            .store
            .find_by_id::<Order>(id.get())
            .await?
            .ok_or_else(|| InventoryError::not_found("order", id))?;
        self.with_lines(order).await
    }

    /// Lists lines across all orders.
    pub async fn lines(&self, filter: &FilterMap) -> Result<Vec<OrderLine>> {
        Ok(self.store.find::<OrderLine>(&filter.to_filter()).await?)
    }

    /// Ensures the open order carries a line for `product_id` matching
    /// `draft`, opening an order first if none is open.
    ///
    /// An existing line is overwritten, never duplicated.
    pub async fn add_or_create_line(
        &self,
        product_id: ProductId,
        draft: LineDraft,
    ) -> Result<OrderLine> {
        let _gate = self.gate.lock().await;

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(line) = self.try_attach(product_id, draft).await? {
                return Ok(line);
            }
            tracing::warn!(%product_id, attempt, "lost race on open order, retrying");
            metrics::counter!("inventory_open_order_races_total").increment(1);
        }

        Err(InventoryError::Conflict(format!(
            "could not attach product {product_id} to the open order after {MAX_ATTEMPTS} attempts"
        )))
    }

    /// One attempt of [`add_or_create_line`](Self::add_or_create_line).
    /// Returns `None` when a concurrent writer got there first or closed the
    /// order mid-write; nothing is left attached to a closed order.
    async fn try_attach(&self, product_id: ProductId, draft: LineDraft) -> Result<Option<OrderLine>> {
        let order = match self.find_open().await? {
            Some(order) => order,
            None => match self.store.create(Order::open(Timestamp::now())).await {
                Ok(order) => {
                    tracing::info!(order_id = %order.id, "opened replenishment order");
                    metrics::counter!("inventory_orders_opened_total").increment(1);
                    order
                }
                Err(e) if e.violates(SINGLE_OPEN_ORDER) => return Ok(None),
                Err(e) => return Err(e.into()),
            },
        };

        let mut existing = self
            .store
            .find::<OrderLine>(
                &Filter::new()
                    .eq("order_id", order.id)
                    .eq("product_id", product_id),
            )
            .await?;

        match (existing.pop(), existing.len()) {
            (None, _) => {
                let value = draft.value.unwrap_or_default();
                let line = OrderLine::new(order.id, product_id, draft.quantity, value);
                let line = match self.store.create(line).await {
                    Ok(line) => line,
                    Err(e) if e.violates(ONE_LINE_PER_PRODUCT) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                if !self.still_open(order.id).await? {
                    self.store
                        .delete::<OrderLine>(&Filter::by_id(line.id))
                        .await?;
                    tracing::warn!(order_id = %order.id, %product_id, "order closed while adding line");
                    return Ok(None);
                }
                tracing::debug!(order_id = %order.id, %product_id, "added order line");
                Ok(Some(line))
            }
            (Some(current), 0) => {
                let mut line = current.clone();
                let mut patch = Patch::new().set("quantity", draft.quantity);
                line.quantity = draft.quantity;
                if let Some(value) = draft.value {
                    patch = patch.set("value", value);
                    line.value = value;
                }
                // zero rows: the line was removed under us
                if self.store.update_by_id::<OrderLine>(line.id.get(), &patch).await? == 0 {
                    return Ok(None);
                }
                if !self.still_open(order.id).await? {
                    // put the closed order's line back the way it was approved
                    let restore = Patch::new()
                        .set("quantity", current.quantity)
                        .set("value", current.value);
                    self.store
                        .update_by_id::<OrderLine>(line.id.get(), &restore)
                        .await?;
                    tracing::warn!(order_id = %order.id, %product_id, "order closed while merging line");
                    return Ok(None);
                }
                tracing::debug!(order_id = %order.id, %product_id, "merged order line");
                Ok(Some(line))
            }
            (Some(_), others) => {
                let count = others + 1;
                tracing::error!(order_id = %order.id, %product_id, count, "duplicate order lines");
                Err(InventoryError::Consistency(format!(
                    "order {} has {count} lines for product {product_id}",
                    order.id
                )))
            }
        }
    }

    /// Whether order `id` is still open. Checked after each line write, since
    /// another process may close the order between the read and the write.
    async fn still_open(&self, id: OrderId) -> Result<bool> {
        let open = self
            .store
            .find::<Order>(&Filter::by_id(id).and(open_orders()))
            .await?;
        Ok(!open.is_empty())
    }

    /// Removes the open order's line for `product_id`. Returns the number of
    /// lines removed; no open order or no line is a no-op.
    pub async fn remove_line(&self, product_id: ProductId) -> Result<u64> {
        let _gate = self.gate.lock().await;

        let Some(order) = self.find_open().await? else {
            return Ok(0);
        };
        let removed = self
            .store
            .delete::<OrderLine>(
                &Filter::new()
                    .eq("order_id", order.id)
                    .eq("product_id", product_id),
            )
            .await?;
        if removed > 0 {
            tracing::debug!(order_id = %order.id, %product_id, "removed order line");
        }
        Ok(removed)
    }

    /// Closes an open order with the given flag column set.
    ///
    /// Returns `InvalidArgument` when the order is already closed.
    async fn close(&self, id: OrderId, flag: &'static str, now: Timestamp) -> Result<()> {
        let patch = Patch::new().set(flag, true).set("closed_at", now);
        let closed = self
            .store
            .update_columns::<Order>(&Filter::by_id(id).and(open_orders()), &patch)
            .await?;
        if closed == 1 {
            return Ok(());
        }

        match self.store.find_by_id::<Order>(id.get()).await? {
            None => Err(InventoryError::not_found("order", id)),
            Some(_) => Err(InventoryError::InvalidArgument(format!(
                "order {id} is already closed"
            ))),
        }
    }

    /// Approves an order and derives its purchase.
    ///
    /// The purchase total is the sum of the order's line values. The purchase
    /// is stored before the order is closed and discarded if closing fails, so
    /// an approved order never lacks its purchase.
    pub async fn approve(&self, id: OrderId) -> Result<Purchase> {
        let _gate = self.gate.lock().await;
        let now = Timestamp::now();

        let order = self.order(id).await?;
        if !order.order.is_open() {
            return Err(InventoryError::InvalidArgument(format!(
                "order {id} is already closed"
            )));
        }
        let draft = Purchase::from_order(&order, now).ok_or_else(|| {
            InventoryError::InvalidArgument(format!(
                "line values of order {id} add up to more than {}",
                Money::MAX
            ))
        })?;
        let purchase = self.store.create(draft).await?;

        if let Err(err) = self.close(id, "approved", now).await {
            self.discard(&purchase).await;
            return Err(err);
        }

        let reloaded = self.store.find::<Order>(&Filter::by_id(id)).await?;
        if reloaded.len() != 1 {
            let count = reloaded.len();
            tracing::error!(order_id = %id, count, "reload after approval failed");
            return Err(InventoryError::Consistency(format!(
                "approved order {id} reloaded as {count} rows"
            )));
        }

        tracing::info!(
            order_id = %id,
            purchase_id = %purchase.id,
            lines = order.lines().len(),
            total = %purchase.total_value,
            "approved order"
        );
        metrics::counter!("inventory_orders_approved_total").increment(1);
        Ok(purchase)
    }

    async fn discard(&self, purchase: &Purchase) {
        if let Err(err) = self
            .store
            .delete::<Purchase>(&Filter::by_id(purchase.id))
            .await
        {
            tracing::error!(
                purchase_id = %purchase.id,
                order_id = %purchase.order_id,
                error = %err,
                "failed to discard purchase of unapproved order"
            );
        }
    }

    /// Cancels an order. No purchase is derived.
    pub async fn cancel(&self, id: OrderId) -> Result<()> {
        let _gate = self.gate.lock().await;

        self.close(id, "canceled", Timestamp::now()).await?;
        tracing::info!(order_id = %id, "canceled order");
        Ok(())
    }
}
