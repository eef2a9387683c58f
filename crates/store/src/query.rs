use std::cmp::Ordering;

use common::{LineId, Money, OrderId, ProductId, PurchaseId, Timestamp, WithdrawalId};

use crate::{Record, Result, StoreError};

/// A literal compared against, or written into, a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Interprets a raw literal: integers and decimals become numbers, anything
    /// else is text.
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Scalar::Int(i);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Scalar::Float(f),
            _ => Scalar::Text(raw.to_string()),
        }
    }

    /// The JSON form of this literal, as it appears in a serialized record.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Int(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Value::from(*f),
            Scalar::Text(s) => serde_json::Value::from(s.as_str()),
            Scalar::Bool(b) => serde_json::Value::from(*b),
        }
    }

    /// Orders a serialized field against this literal.
    ///
    /// Returns `None` when the two are not comparable (different kinds, or a
    /// null field), which no operator treats as a match.
    pub fn compare_json(&self, field: &serde_json::Value) -> Option<Ordering> {
        use serde_json::Value;

        match (field, self) {
            (Value::Number(n), Scalar::Int(i)) => match n.as_i64() {
                Some(v) => Some(v.cmp(i)),
                None => n.as_f64()?.partial_cmp(&(*i as f64)),
            },
            (Value::Number(n), Scalar::Float(f)) => n.as_f64()?.partial_cmp(f),
            (Value::String(s), Scalar::Text(t)) => Some(s.as_str().cmp(t.as_str())),
            (Value::Bool(b), Scalar::Bool(c)) => Some(b.cmp(c)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => |$v:ident| $conv:expr),* $(,)?) => {
        $(impl From<$ty> for Scalar {
            fn from($v: $ty) -> Self {
                $conv
            }
        })*
    };
}

scalar_from! {
    i64 => |v| Scalar::Int(v),
    i32 => |v| Scalar::Int(i64::from(v)),
    f64 => |v| Scalar::Float(v),
    bool => |v| Scalar::Bool(v),
    String => |v| Scalar::Text(v),
    &str => |v| Scalar::Text(v.to_string()),
    ProductId => |v| Scalar::Int(v.get()),
    OrderId => |v| Scalar::Int(v.get()),
    LineId => |v| Scalar::Int(v.get()),
    PurchaseId => |v| Scalar::Int(v.get()),
    WithdrawalId => |v| Scalar::Int(v.get()),
    Timestamp => |v| Scalar::Int(v.as_secs()),
    Money => |v| Scalar::Float(v.as_decimal()),
}

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gte,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gte => ">=",
        }
    }

    /// Whether a field ordered `ordering` against the literal satisfies the operator.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gte => ordering != Ordering::Less,
        }
    }
}

/// One `column op literal` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: String,
    pub op: Op,
    pub value: Scalar,
}

impl Clause {
    pub fn new(column: impl Into<String>, op: Op, value: impl Into<Scalar>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluates the clause against a serialized row.
    pub fn matches(&self, row: &serde_json::Map<String, serde_json::Value>) -> bool {
        row.get(&self.column)
            .and_then(|field| self.value.compare_json(field))
            .is_some_and(|ordering| self.op.holds(ordering))
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.column, self.op.as_sql(), self.value)
    }
}

/// Conjunction of clauses selecting rows of one table.
///
/// An empty filter selects every row. The `Display` form is the predicate
/// text, e.g. `quantity>=200 AND name='h2oh'`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the row with the given identifier.
    pub fn by_id(id: impl Into<Scalar>) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.clause(Clause::new(column, Op::Eq, value))
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.clause(Clause::new(column, Op::Ne, value))
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.clause(Clause::new(column, Op::Gte, value))
    }

    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Adds every clause of `other` to this filter.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the filter against a serialized row.
    pub fn matches(&self, row: &serde_json::Map<String, serde_json::Value>) -> bool {
        self.clauses.iter().all(|c| c.matches(row))
    }

    /// Rejects clauses naming columns `R` does not have.
    pub fn check_columns<R: Record>(&self) -> Result<()> {
        check_columns::<R>(self.clauses.iter().map(|c| c.column.as_str()))
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

/// Column assignments applied by an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    assignments: Vec<(String, Scalar)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    pub fn assignments(&self) -> &[(String, Scalar)] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Writes the assignments into a serialized row.
    pub fn apply(&self, row: &mut serde_json::Map<String, serde_json::Value>) {
        for (column, value) in &self.assignments {
            row.insert(column.clone(), value.to_json());
        }
    }

    /// Rejects unknown columns and assignments to `id`.
    pub fn check_columns<R: Record>(&self) -> Result<()> {
        if let Some((column, _)) = self.assignments.iter().find(|(c, _)| c == "id") {
            return Err(StoreError::UnknownColumn {
                table: R::TABLE,
                column: column.clone(),
            });
        }
        check_columns::<R>(self.assignments.iter().map(|(c, _)| c.as_str()))
    }
}

fn check_columns<'a, R: Record>(mut columns: impl Iterator<Item = &'a str>) -> Result<()> {
    match columns.find(|c| !R::has_column(c)) {
        Some(column) => Err(StoreError::UnknownColumn {
            table: R::TABLE,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}
