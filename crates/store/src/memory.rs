use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{Filter, Patch, Record, Result, Store, StoreError};

type Row = Map<String, Value>;

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

/// In-memory store implementation for testing and single-process use.
///
/// Rows are kept in their serialized form, one table per record type, and
/// uniqueness keys are checked on every write the same way the PostgreSQL
/// constraints would reject them.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows stored for a record type.
    pub async fn count<R: Record>(&self) -> usize {
        self.tables
            .read()
            .await
            .get(R::TABLE)
            .map_or(0, |t| t.rows.len())
    }
}

fn encode<R: Record>(record: &R) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Serialization(serde::de::Error::custom(format!(
            "{} record must serialize to an object, got {other}",
            R::TABLE
        )))),
    }
}

fn decode<R: Record>(row: &Row) -> Result<R> {
    Ok(serde_json::from_value(Value::Object(row.clone()))?)
}

/// Fails if `candidate` holds a unique key already held by a row outside `skip`.
fn check_unique<R: Record>(table: &Table, candidate: &R, skip: &[i64]) -> Result<()> {
    let keys = candidate.unique_keys();
    if keys.is_empty() {
        return Ok(());
    }

    for (id, row) in &table.rows {
        if skip.contains(id) {
            continue;
        }
        let existing: R = decode(row)?;
        if let Some(clash) = existing.unique_keys().into_iter().find(|k| keys.contains(k)) {
            return Err(StoreError::UniqueViolation {
                constraint: clash.constraint.to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find<R: Record>(&self, filter: &Filter) -> Result<Vec<R>> {
        filter.check_columns::<R>()?;

        let tables = self.tables.read().await;
        let Some(table) = tables.get(R::TABLE) else {
            return Ok(Vec::new());
        };

        table
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .map(decode)
            .collect()
    }

    async fn create<R: Record>(&self, record: R) -> Result<R> {
        let mut row = encode(&record)?;

        let mut tables = self.tables.write().await;
        let table = tables.entry(R::TABLE).or_default();

        let id = table.last_id + 1;
        row.insert("id".to_string(), Value::from(id));
        let created: R = decode(&row)?;

        check_unique(table, &created, &[])?;

        table.last_id = id;
        table.rows.insert(id, row);
        Ok(created)
    }

    async fn update_columns<R: Record>(&self, filter: &Filter, patch: &Patch) -> Result<u64> {
        filter.check_columns::<R>()?;
        patch.check_columns::<R>()?;

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(R::TABLE) else {
            return Ok(0);
        };

        let targets: Vec<i64> = table
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, _)| *id)
            .collect();

        // Stage every write first so a uniqueness failure leaves the table untouched.
        let mut staged = Vec::with_capacity(targets.len());
        for id in &targets {
            let mut row = table.rows[id].clone();
            patch.apply(&mut row);
            let updated: R = decode(&row)?;
            check_unique(table, &updated, &targets)?;
            staged.push((*id, row, updated));
        }

        for (i, (_, _, updated)) in staged.iter().enumerate() {
            let keys = updated.unique_keys();
            let clash = staged[i + 1..]
                .iter()
                .flat_map(|(_, _, other)| other.unique_keys())
                .find(|k| keys.contains(k));
            if let Some(clash) = clash {
                return Err(StoreError::UniqueViolation {
                    constraint: clash.constraint.to_string(),
                });
            }
        }

        let affected = staged.len() as u64;
        for (id, row, _) in staged {
            table.rows.insert(id, row);
        }
        Ok(affected)
    }

    async fn delete<R: Record>(&self, filter: &Filter) -> Result<u64> {
        filter.check_columns::<R>()?;

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(R::TABLE) else {
            return Ok(0);
        };

        let before = table.rows.len();
        table.rows.retain(|_, row| !filter.matches(row));
        Ok((before - table.rows.len()) as u64)
    }
}
