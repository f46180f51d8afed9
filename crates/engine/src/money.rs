use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub},
};

use serde::{Deserialize, Serialize};

/// Signed ledger amount represented as **integer milliunits**
/// (1/1000 of the currency unit).
///
/// The value is signed:
/// - positive = inflow
/// - negative = outflow
///
/// # Examples
///
/// ```rust
/// use engine::Milliunits;
///
/// let amount = Milliunits::new(-12_340);
/// assert_eq!(amount.value(), -12340);
/// assert_eq!(amount.to_string(), "-12.340");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Milliunits(i64);

impl Milliunits {
    pub const ZERO: Milliunits = Milliunits(0);

    /// Creates a new amount from integer milliunits.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value in milliunits.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Milliunits) -> Option<Milliunits> {
        self.0.checked_sub(rhs.0).map(Milliunits)
    }

    /// Checked negation (returns `None` for `i64::MIN`).
    #[must_use]
    pub fn checked_neg(self) -> Option<Milliunits> {
        self.0.checked_neg().map(Milliunits)
    }
}

impl fmt::Display for Milliunits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl From<i64> for Milliunits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Milliunits> for i64 {
    fn from(value: Milliunits) -> Self {
        value.0
    }
}

impl Add for Milliunits {
    type Output = Milliunits;

    fn add(self, rhs: Milliunits) -> Self::Output {
        Milliunits(self.0 + rhs.0)
    }
}

impl AddAssign for Milliunits {
    fn add_assign(&mut self, rhs: Milliunits) {
        self.0 += rhs.0;
    }
}

impl Sub for Milliunits {
    type Output = Milliunits;

    fn sub(self, rhs: Milliunits) -> Self::Output {
        Milliunits(self.0 - rhs.0)
    }
}

impl Neg for Milliunits {
    type Output = Milliunits;

    fn neg(self) -> Self::Output {
        Milliunits(-self.0)
    }
}

impl Sum for Milliunits {
    fn sum<I: Iterator<Item = Milliunits>>(iter: I) -> Self {
        iter.fold(Milliunits::ZERO, Add::add)
    }
}
