//! Declarative filter maps.
//!
//! Read paths accept filters as operator names mapped to `"field|value"`
//! strings, e.g. `{gte: ["quantity|200"], eq: ["name|h2oh"]}`. A
//! [`FilterMap`] holds the recognized entries as typed conditions and lowers
//! them to a store [`Filter`].
//!
//! The builder is permissive: entries with an unknown operator or without the
//! `|` separator are skipped rather than failing the whole query. Column names
//! are only checked when the filter reaches the store.

use store::{Clause, Filter, Op, Scalar};

/// Operators accepted in a filter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Gte,
}

impl FilterOp {
    /// Looks up an operator by its filter-map name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(FilterOp::Eq),
            "gte" => Some(FilterOp::Gte),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
        }
    }

    fn as_op(self) -> Op {
        match self {
            FilterOp::Eq => Op::Eq,
            FilterOp::Gte => Op::Gte,
        }
    }
}

/// One `(operator, field, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub op: FilterOp,
    pub field: String,
    pub value: Scalar,
}

impl Condition {
    /// Parses a `"field|value"` pair. Values that parse as numbers stay
    /// numeric; anything else is text.
    pub fn parse(op: FilterOp, pair: &str) -> Option<Self> {
        let (field, value) = pair.split_once('|')?;
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self {
            op,
            field: field.to_string(),
            value: Scalar::parse_literal(value),
        })
    }
}

/// A conjunction of filter-map conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMap {
    conditions: Vec<Condition>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter map from `(operator, "field|value")` pairs, such as
    /// the repeated keys of a query string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (op, pair) in pairs {
            map.push_raw(op.as_ref(), pair.as_ref());
        }
        map
    }

    /// Builds a filter map from operator names each mapped to a list of
    /// `"field|value"` strings.
    pub fn from_groups<I, K, L, V>(groups: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (op, pairs) in groups {
            for pair in pairs {
                map.push_raw(op.as_ref(), pair.as_ref());
            }
        }
        map
    }

    fn push_raw(&mut self, op: &str, pair: &str) {
        let Some(op) = FilterOp::parse(op) else {
            tracing::debug!(op, pair, "skipping filter entry with unknown operator");
            return;
        };
        match Condition::parse(op, pair) {
            Some(condition) => self.conditions.push(condition),
            None => tracing::debug!(op = op.as_str(), pair, "skipping malformed filter entry"),
        }
    }

    /// Adds a typed condition.
    pub fn with(mut self, op: FilterOp, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.conditions.push(Condition {
            op,
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Lowers the conditions to a store filter.
    pub fn to_filter(&self) -> Filter {
        self.conditions.iter().fold(Filter::new(), |filter, c| {
            filter.clause(Clause::new(c.field.clone(), c.op.as_op(), c.value.clone()))
        })
    }
}

impl std::fmt::Display for FilterMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_filter())
    }
}
