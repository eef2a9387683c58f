use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A point in time as whole seconds since the unix epoch.
///
/// Records carry timestamps in this encoding on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serde adapter for `Option<Timestamp>` fields encoded as `0` when the
/// moment has not been reached yet.
///
/// ```ignore
/// #[serde(with = "common::zero_as_none")]
/// confirmed_at: Option<Timestamp>,
/// ```
pub mod zero_as_none {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        value.map_or(0, |t| t.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let secs = Option::<i64>::deserialize(d)?.unwrap_or(0);
        Ok((secs != 0).then_some(Timestamp(secs)))
    }
}
