use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::{Filter, Patch, Record, Result, Scalar, Store};

/// PostgreSQL-backed store implementation.
///
/// Rows are read with `to_jsonb` and written with `jsonb_populate_record`, so
/// the serde form of a record is the single mapping between Rust and SQL.
/// Column names are checked against [`Record::COLUMNS`] before they reach SQL
/// text; literals are always bound as parameters.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Appends ` WHERE ...` for the filter, numbering placeholders after `offset`.
fn push_where(sql: &mut String, filter: &Filter, offset: usize) {
    for (i, clause) in filter.clauses().iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!(
            "{} {} ${}",
            clause.column,
            clause.op.as_sql(),
            offset + i + 1
        ));
    }
}

/// SQLSTATE 42883: the database has no operator for the column and literal
/// types, e.g. a TEXT column compared with a number.
fn is_operand_mismatch(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("42883"))
}

fn bind_scalar<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Scalar,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Scalar::Int(i) => query.bind(*i),
        Scalar::Float(f) => query.bind(*f),
        Scalar::Text(s) => query.bind(s.clone()),
        Scalar::Bool(b) => query.bind(*b),
    }
}

fn bind_filter<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    filter: &Filter,
) -> Query<'q, Postgres, PgArguments> {
    for clause in filter.clauses() {
        query = bind_scalar(query, &clause.value);
    }
    query
}

fn insert_columns<R: Record>() -> String {
    R::COLUMNS
        .iter()
        .filter(|c| **c != "id")
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Store for PostgresStore {
    async fn find<R: Record>(&self, filter: &Filter) -> Result<Vec<R>> {
        filter.check_columns::<R>()?;

        let mut sql = format!("SELECT to_jsonb(t) AS record FROM {} t", R::TABLE);
        push_where(&mut sql, filter, 0);
        sql.push_str(" ORDER BY id ASC");

        // a literal of the wrong kind matches nothing, as in the in-memory store
        let rows = match bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) if is_operand_mismatch(&e) => {
                tracing::debug!(table = R::TABLE, %filter, "filter literal does not fit its column");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        rows.into_iter()
            .map(|row| -> Result<R> {
                let record: serde_json::Value = row.try_get("record")?;
                Ok(serde_json::from_value(record)?)
            })
            .collect()
    }

    async fn create<R: Record>(&self, record: R) -> Result<R> {
        let payload = serde_json::to_value(&record)?;
        let columns = insert_columns::<R>();
        let sql = format!(
            "INSERT INTO {table} AS t ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
             RETURNING to_jsonb(t) AS record",
            table = R::TABLE,
        );

        let row = sqlx::query(&sql)
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;

        let created: serde_json::Value = row.try_get("record")?;
        Ok(serde_json::from_value(created)?)
    }

    async fn update_columns<R: Record>(&self, filter: &Filter, patch: &Patch) -> Result<u64> {
        filter.check_columns::<R>()?;
        patch.check_columns::<R>()?;
        if patch.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = patch
            .assignments()
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ${}", i + 1))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", R::TABLE, assignments.join(", "));
        push_where(&mut sql, filter, assignments.len());

        let mut query = sqlx::query(&sql);
        for (_, value) in patch.assignments() {
            query = bind_scalar(query, value);
        }
        let result = bind_filter(query, filter).execute(&self.pool).await?;

        tracing::debug!(
            table = R::TABLE,
            rows = result.rows_affected(),
            "updated columns"
        );
        Ok(result.rows_affected())
    }

    async fn delete<R: Record>(&self, filter: &Filter) -> Result<u64> {
        filter.check_columns::<R>()?;

        let mut sql = format!("DELETE FROM {}", R::TABLE);
        push_where(&mut sql, filter, 0);

        let result = bind_filter(sqlx::query(&sql), filter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
