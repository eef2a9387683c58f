use serde::Serialize;
use serde::de::DeserializeOwned;

/// A named uniqueness key a row participates in.
///
/// Two rows of the same table may not share a `(constraint, key)` pair. The
/// constraint name matches the index or constraint that enforces it in SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub constraint: &'static str,
    pub key: String,
}

impl UniqueKey {
    pub fn new(constraint: &'static str, key: impl Into<String>) -> Self {
        Self {
            constraint,
            key: key.into(),
        }
    }
}

/// A type persisted as one row of a table.
///
/// The serde representation of a record is its stored form: every field
/// serializes under its column name. The `id` column is assigned by the store
/// on create.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the record lives in.
    const TABLE: &'static str;

    /// All columns of the table, `id` included.
    const COLUMNS: &'static [&'static str];

    /// The storage-assigned identifier (0 before creation).
    fn id(&self) -> i64;

    /// Uniqueness keys this row holds in its current state.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Returns true if `column` belongs to this table.
    fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }
}
