//! Product stock ledger.
//!
//! Owns product quantities and decides after every change whether the product
//! needs a line on the open order.

use std::sync::Arc;

use common::{ProductId, Timestamp};
use store::{Filter, Patch, Store, StoreExt};

use crate::error::{InventoryError, Result};
use crate::model::{Product, Withdrawal};
use crate::orders::{LineDraft, OrderAggregator};
use crate::query::FilterMap;

/// Attempts at the compare-and-swap decrement before giving up.
const CONSUME_ATTEMPTS: usize = 5;

pub struct StockLedger<S> {
    store: Arc<S>,
    orders: OrderAggregator<S>,
}

impl<S> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            orders: self.orders.clone(),
        }
    }
}

fn validate(product: &Product) -> Result<()> {
    if product.name.trim().is_empty() {
        return Err(InventoryError::InvalidArgument(
            "product name must not be empty".to_string(),
        ));
    }
    if product.min_quantity < 0 {
        return Err(InventoryError::InvalidArgument(format!(
            "minimum quantity must not be negative, got {}",
            product.min_quantity
        )));
    }
    Ok(())
}

impl<S: Store> StockLedger<S> {
    pub fn new(store: Arc<S>, orders: OrderAggregator<S>) -> Self {
        Self { store, orders }
    }

    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.store
            .find_by_id::<Product>(id.get())
            .await?
            .ok_or_else(|| InventoryError::not_found("product", id))
    }

    pub async fn list(&self, filter: &FilterMap) -> Result<Vec<Product>> {
        Ok(self.store.find::<Product>(&filter.to_filter()).await?)
    }

    pub async fn withdrawals(&self, filter: &FilterMap) -> Result<Vec<Withdrawal>> {
        Ok(self.store.find::<Withdrawal>(&filter.to_filter()).await?)
    }

    /// Adds a product. A product created below its minimum is put on the open
    /// order straight away.
    pub async fn create(&self, product: Product) -> Result<Product> {
        validate(&product)?;

        let created = self.store.create(product).await?;
        tracing::info!(product_id = %created.id, name = %created.name, "created product");

        self.reevaluate(&created).await?;
        Ok(created)
    }

    /// Replaces a product's fields, re-evaluating replenishment when its
    /// quantities changed.
    pub async fn update(&self, id: ProductId, product: Product) -> Result<Product> {
        validate(&product)?;
        let previous = self.get(id).await?;

        let patch = Patch::new()
            .set("name", product.name.as_str())
            .set("description", product.description.as_str())
            .set("category", product.category)
            .set("current_quantity", product.current_quantity)
            .set("min_quantity", product.min_quantity);
        if self.store.update_by_id::<Product>(id.get(), &patch).await? == 0 {
            return Err(InventoryError::not_found("product", id));
        }

        let updated = Product { id, ..product };
        if updated.current_quantity != previous.current_quantity
            || updated.min_quantity != previous.min_quantity
        {
            self.reevaluate(&updated).await?;
        }
        Ok(updated)
    }

    /// Removes a product and its line from the open order.
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        let removed = self.store.delete::<Product>(&Filter::by_id(id)).await?;
        if removed == 0 {
            return Err(InventoryError::not_found("product", id));
        }
        self.orders.remove_line(id).await?;
        tracing::info!(product_id = %id, "deleted product");
        Ok(())
    }

    /// Takes `quantity` units out of stock and records the withdrawal.
    ///
    /// Stock is not clamped at zero. The decrement is a compare-and-swap on
    /// the quantity read, so concurrent consumers never lose an update. If the
    /// withdrawal cannot be recorded the units are put back.
    pub async fn consume(&self, id: ProductId, quantity: i64) -> Result<Withdrawal> {
        let mut product = self.get(id).await?;
        if quantity <= 0 {
            return Err(InventoryError::InvalidArgument(format!(
                "consumed quantity must be positive, got {quantity}"
            )));
        }

        let mut attempt = 1;
        loop {
            let remaining = product.current_quantity.checked_sub(quantity).ok_or_else(|| {
                InventoryError::InvalidArgument(format!("consuming {quantity} overflows stock"))
            })?;

            if self
                .swap_quantity(id, product.current_quantity, remaining)
                .await?
            {
                product.current_quantity = remaining;
                break;
            }

            if attempt == CONSUME_ATTEMPTS {
                return Err(InventoryError::Conflict(format!(
                    "stock of product {id} kept changing while consuming"
                )));
            }
            tracing::debug!(product_id = %id, attempt, "stock changed concurrently, retrying");
            attempt += 1;
            product = self.get(id).await?;
        }

        if product.current_quantity < 0 {
            tracing::warn!(
                product_id = %id,
                quantity = product.current_quantity,
                "stock is negative"
            );
        }

        let withdrawal = match self
            .store
            .create(Withdrawal::new(id, quantity, Timestamp::now()))
            .await
        {
            Ok(withdrawal) => withdrawal,
            Err(err) => {
                if let Err(undo) = self.restock(id, quantity).await {
                    tracing::error!(
                        product_id = %id,
                        quantity,
                        error = %undo,
                        "failed to return stock of an unrecorded withdrawal"
                    );
                }
                return Err(err.into());
            }
        };
        metrics::counter!("inventory_withdrawals_total").increment(1);
        tracing::info!(
            product_id = %id,
            quantity,
            remaining = product.current_quantity,
            "recorded withdrawal"
        );

        self.reevaluate(&product).await?;
        Ok(withdrawal)
    }

    /// Sets the stock to `new` if it still reads `expected`.
    async fn swap_quantity(&self, id: ProductId, expected: i64, new: i64) -> Result<bool> {
        let swapped = self
            .store
            .update_columns::<Product>(
                &Filter::by_id(id).eq("current_quantity", expected),
                &Patch::new().set("current_quantity", new),
            )
            .await?;
        Ok(swapped == 1)
    }

    /// Puts back `quantity` units taken by a withdrawal that was never recorded.
    async fn restock(&self, id: ProductId, quantity: i64) -> Result<()> {
        for _ in 0..CONSUME_ATTEMPTS {
            let current = self.get(id).await?.current_quantity;
            if self
                .swap_quantity(id, current, current.saturating_add(quantity))
                .await?
            {
                tracing::warn!(product_id = %id, quantity, "returned stock of an unrecorded withdrawal");
                return Ok(());
            }
        }
        Err(InventoryError::Conflict(format!(
            "stock of product {id} kept changing while restocking"
        )))
    }

    /// Adds, updates or removes the product's line on the open order based on
    /// its current quantity. Repeating it with the same quantities changes
    /// nothing.
    pub async fn reevaluate(&self, product: &Product) -> Result<()> {
        if product.needs_replenishment() {
            self.orders
                .add_or_create_line(product.id, LineDraft::quantity(product.deficit()))
                .await?;
        } else {
            self.orders.remove_line(product.id).await?;
        }
        Ok(())
    }
}
