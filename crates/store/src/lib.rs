//! Persistence port for the inventory system.
//!
//! Records are plain serde types that describe their table through the
//! [`Record`] trait. A [`Store`] offers filtered find, create, column updates
//! and delete over any record type; [`StoreExt`] layers identity lookups and
//! foreign-key traversal on top.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{Clause, Filter, Op, Patch, Scalar};
pub use record::{Record, UniqueKey};
pub use store::{Store, StoreExt};
