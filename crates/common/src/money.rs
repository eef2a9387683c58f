use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Monetary amount held as integer cents.
///
/// Serialized as a decimal number of currency units (`127.27`), which is how
/// line values and purchase totals travel on the wire and sit in storage.
///
/// Amounts are bounded by [`Money::MAX`], the largest value a `NUMERIC(14, 2)`
/// column holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: i64,
}

const MAX_CENTS: i64 = 99_999_999_999_999;

impl Money {
    /// 999999999999.99
    pub const MAX: Money = Money { cents: MAX_CENTS };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount, rounding to the nearest cent.
    ///
    /// Returns `None` for values that are not finite or exceed [`Money::MAX`]
    /// in magnitude.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        (cents.is_finite() && cents.abs() <= MAX_CENTS as f64).then(|| Self {
            cents: cents as i64,
        })
    }

    /// Adds two amounts, or `None` when the sum leaves the storable range.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.cents
            .checked_add(rhs.cents)
            .filter(|cents| cents.abs() <= MAX_CENTS)
            .map(Money::from_cents)
    }

    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// The amount in currency units.
    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    pub const fn is_negative(&self) -> bool {
        self.cents < 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(d)?;
        Money::from_decimal(amount)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid monetary amount: {amount}")))
    }
}
