use async_trait::async_trait;

use crate::{Filter, Patch, Record, Result, StoreError};

/// Core trait for record storage.
///
/// Implementations persist any [`Record`] type in its table and must be
/// thread-safe. Uniqueness keys declared by records are enforced on every
/// write and reported as [`StoreError::UniqueViolation`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns all rows matching the filter, ordered by id.
    async fn find<R: Record>(&self, filter: &Filter) -> Result<Vec<R>>;

    /// Inserts a record and returns it with its assigned id.
    ///
    /// The id carried by `record` is ignored.
    async fn create<R: Record>(&self, record: R) -> Result<R>;

    /// Applies the patch to every matching row and returns how many rows changed.
    ///
    /// The rows are updated atomically: either every matching row is written
    /// or, on a uniqueness violation, none is.
    async fn update_columns<R: Record>(&self, filter: &Filter, patch: &Patch) -> Result<u64>;

    /// Deletes every matching row and returns how many were removed.
    async fn delete<R: Record>(&self, filter: &Filter) -> Result<u64>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Returns the single matching row, if any.
    ///
    /// Fails with [`StoreError::AmbiguousMatch`] when more than one row matches.
    async fn find_one<R: Record>(&self, filter: &Filter) -> Result<Option<R>> {
        let mut rows = self.find::<R>(filter).await?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            count => Err(StoreError::AmbiguousMatch {
                table: R::TABLE,
                count,
            }),
        }
    }

    /// Loads a record by id.
    async fn find_by_id<R: Record>(&self, id: i64) -> Result<Option<R>> {
        self.find_one(&Filter::by_id(id)).await
    }

    /// Updates a single record by id, returning the rows affected (0 or 1).
    async fn update_by_id<R: Record>(&self, id: i64, patch: &Patch) -> Result<u64> {
        self.update_columns::<R>(&Filter::by_id(id), patch).await
    }

    /// Follows a foreign key from `parent` to the child rows pointing at it.
    async fn related<P: Record, C: Record>(&self, parent: &P, foreign_key: &str) -> Result<Vec<C>> {
        self.find::<C>(&Filter::new().eq(foreign_key, parent.id())).await
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
