//! Purchase lifecycle.
//!
//! Purchases move `open → confirmed → concluded`. Each transition is an update
//! conditioned on the current state, so a purchase is stamped at most once
//! per step. Once confirmed, the lines of the originating order are frozen.

use std::sync::Arc;

use common::{LineId, Money, OrderId, PurchaseId, Timestamp};
use store::{Filter, Patch, Store, StoreExt};
use tokio::sync::Mutex;

use crate::error::{InventoryError, Result};
use crate::model::{Order, OrderLine, OrderWithLines, Purchase, PurchaseState, PurchaseView};
use crate::query::FilterMap;

pub struct PurchaseLifecycle<S> {
    store: Arc<S>,
    // held by confirm and line updates so a line cannot change mid-confirmation
    freeze: Arc<Mutex<()>>,
}

fn must_confirm_first(id: PurchaseId) -> InventoryError {
    InventoryError::InvalidState(format!(
        "purchase {id} must be confirmed before it is concluded"
    ))
}

impl<S> Clone for PurchaseLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            freeze: Arc::clone(&self.freeze),
        }
    }
}

impl<S: Store> PurchaseLifecycle<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            freeze: Arc::new(Mutex::new(())),
        }
    }

    async fn record(&self, id: PurchaseId) -> Result<Purchase> {
        self.store
            .find_by_id::<Purchase>(id.get())
            .await?
            .ok_or_else(|| InventoryError::not_found("purchase", id))
    }

    async fn view(&self, purchase: Purchase) -> Result<PurchaseView> {
        let Some(order) = self
            .store
            .find_by_id::<Order>(purchase.order_id.get())
            .await?
        else {
            tracing::error!(purchase_id = %purchase.id, order_id = %purchase.order_id, "purchase without order");
            return Err(InventoryError::Consistency(format!(
                "purchase {} references missing order {}",
                purchase.id, purchase.order_id
            )));
        };
        let purchase_products = self
            .store
            .related::<Order, OrderLine>(&order, "order_id")
            .await?;

        Ok(PurchaseView {
            purchase,
            order: OrderWithLines {
                order,
                purchase_products,
            },
        })
    }

    async fn views(&self, purchases: Vec<Purchase>) -> Result<Vec<PurchaseView>> {
        let mut views = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            views.push(self.view(purchase).await?);
        }
        Ok(views)
    }

    /// Purchases matching the filter. Nothing matching is `NotFound`.
    pub async fn query(&self, filter: &FilterMap) -> Result<Vec<PurchaseView>> {
        let purchases = self.store.find::<Purchase>(&filter.to_filter()).await?;
        if purchases.is_empty() {
            return Err(InventoryError::not_found("purchase", filter));
        }
        self.views(purchases).await
    }

    async fn single(&self, filter: Filter, describe: impl std::fmt::Display) -> Result<PurchaseView> {
        let mut purchases = self.store.find::<Purchase>(&filter).await?;
        match (purchases.pop(), purchases.len()) {
            (Some(purchase), 0) => self.view(purchase).await,
            _ => Err(InventoryError::not_found("purchase", describe)),
        }
    }

    pub async fn get(&self, id: PurchaseId) -> Result<PurchaseView> {
        self.single(Filter::by_id(id), id).await
    }

    pub async fn get_by_order(&self, order_id: OrderId) -> Result<PurchaseView> {
        self.single(
            Filter::new().eq("order_id", order_id),
            format!("order {order_id}"),
        )
        .await
    }

    /// All purchases currently in `state`.
    pub async fn in_state(&self, state: PurchaseState) -> Result<Vec<PurchaseView>> {
        let purchases = self
            .store
            .find::<Purchase>(&Filter::new().eq("state", state))
            .await?;
        self.views(purchases).await
    }

    /// Confirms an open purchase. Confirming again is a no-op that keeps the
    /// original confirmation time.
    pub async fn confirm(&self, id: PurchaseId) -> Result<Purchase> {
        let _freeze = self.freeze.lock().await;

        let purchase = self.record(id).await?;
        if !purchase.state.can_confirm() {
            tracing::debug!(purchase_id = %id, state = %purchase.state, "purchase already confirmed");
            return Ok(purchase);
        }

        let now = Timestamp::now();
        let confirmed = self
            .store
            .update_columns::<Purchase>(
                &Filter::by_id(id).eq("state", PurchaseState::Open),
                &Patch::new()
                    .set("state", PurchaseState::Confirmed)
                    .set("confirmed_at", now),
            )
            .await?;
        if confirmed == 0 {
            // confirmed by someone else in between
            return self.record(id).await;
        }

        tracing::info!(purchase_id = %id, "confirmed purchase");
        metrics::counter!("inventory_purchases_confirmed_total").increment(1);
        Ok(Purchase {
            state: PurchaseState::Confirmed,
            confirmed_at: Some(now),
            ..purchase
        })
    }

    /// Concludes a confirmed purchase.
    ///
    /// Concluding an open purchase is `InvalidState`; concluding again is a
    /// no-op.
    pub async fn conclude(&self, id: PurchaseId) -> Result<Purchase> {
        let purchase = self.record(id).await?;
        if purchase.state == PurchaseState::Concluded {
            return Ok(purchase);
        }
        if !purchase.state.can_conclude() {
            return Err(must_confirm_first(id));
        }

        let now = Timestamp::now();
        let concluded = self
            .store
            .update_columns::<Purchase>(
                &Filter::by_id(id).eq("state", PurchaseState::Confirmed),
                &Patch::new()
                    .set("state", PurchaseState::Concluded)
                    .set("concluded_at", now),
            )
            .await?;
        if concluded == 0 {
            let current = self.record(id).await?;
            if current.state == PurchaseState::Concluded {
                return Ok(current);
            }
            return Err(must_confirm_first(id));
        }

        tracing::info!(purchase_id = %id, "concluded purchase");
        metrics::counter!("inventory_purchases_concluded_total").increment(1);
        Ok(Purchase {
            state: PurchaseState::Concluded,
            concluded_at: Some(now),
            ..purchase
        })
    }

    /// Loads a line and rejects it when a purchase of its order is frozen.
    async fn mutable_line(&self, id: LineId) -> Result<OrderLine> {
        let line = self
            .store
            .find_by_id::<OrderLine>(id.get())
            .await?
            .ok_or_else(|| InventoryError::not_found("order line", id))?;

        let purchases = self
            .store
            .find::<Purchase>(&Filter::new().eq("order_id", line.order_id))
            .await?;
        if let Some(purchase) = purchases.iter().find(|p| p.state.is_frozen()) {
            return Err(InventoryError::InvalidState(format!(
                "purchase {} is {}; its lines can no longer change",
                purchase.id, purchase.state
            )));
        }
        Ok(line)
    }

    pub async fn update_line_quantity(&self, id: LineId, quantity: i64) -> Result<OrderLine> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidArgument(format!(
                "line quantity must be positive, got {quantity}"
            )));
        }
        let _freeze = self.freeze.lock().await;

        let line = self.mutable_line(id).await?;
        self.store
            .update_by_id::<OrderLine>(id.get(), &Patch::new().set("quantity", quantity))
            .await?;
        tracing::debug!(line_id = %id, quantity, "updated line quantity");
        Ok(OrderLine { quantity, ..line })
    }

    pub async fn update_line_value(&self, id: LineId, value: Money) -> Result<OrderLine> {
        if value.is_negative() {
            return Err(InventoryError::InvalidArgument(format!(
                "line value must not be negative, got {value}"
            )));
        }
        let _freeze = self.freeze.lock().await;

        let line = self.mutable_line(id).await?;
        self.store
            .update_by_id::<OrderLine>(id.get(), &Patch::new().set("value", value))
            .await?;
        tracing::debug!(line_id = %id, %value, "updated line value");
        Ok(OrderLine { value, ..line })
    }
}
