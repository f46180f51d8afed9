use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::{EngineError, Milliunits};

/// Portion of a shared transaction borne by one user, strictly between 0 and 1.
///
/// Stored as an exact decimal so splitting never goes through binary floating
/// point.
///
/// # Examples
///
/// Parsing accepts fractions, percentages and bare percentage numbers:
///
/// ```rust
/// use engine::ShareFraction;
///
/// let half: ShareFraction = "0.5".parse().unwrap();
/// assert_eq!("50%".parse::<ShareFraction>().unwrap(), half);
/// assert_eq!("50".parse::<ShareFraction>().unwrap(), half);
/// assert!("0".parse::<ShareFraction>().is_err());
/// assert!("1".parse::<ShareFraction>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShareFraction(Decimal);

impl ShareFraction {
    /// Validates and wraps a fraction.
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value <= Decimal::ZERO || value >= Decimal::ONE {
            return Err(EngineError::InvalidShare(format!(
                "share {value} must be between 0 and 1 (exclusive)"
            )));
        }
        Ok(Self(value.normalize()))
    }

    #[must_use]
    pub fn value(self) -> Decimal {
        self.0
    }

    /// This share of `amount`, rounded half away from zero.
    ///
    /// ```rust
    /// use engine::{Milliunits, ShareFraction};
    ///
    /// let half: ShareFraction = "0.5".parse().unwrap();
    /// assert_eq!(half.portion(Milliunits::new(101)), Some(Milliunits::new(51)));
    /// assert_eq!(half.portion(Milliunits::new(-101)), Some(Milliunits::new(-51)));
    /// ```
    #[must_use]
    pub fn portion(self, amount: Milliunits) -> Option<Milliunits> {
        let exact = Decimal::from(amount.value()).checked_mul(self.0)?;
        exact
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Milliunits::new)
    }
}

impl fmt::Display for ShareFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

impl FromStr for ShareFraction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (number, percent) = match raw.strip_suffix('%') {
            Some(number) => (number.trim(), true),
            None => (raw, false),
        };
        let number = number.replace(',', ".");
        let value = Decimal::from_str(&number)
            .map_err(|_| EngineError::InvalidShare(format!("cannot parse share \"{raw}\"")))?;
        let value = if percent || value > Decimal::ONE {
            value / Decimal::ONE_HUNDRED
        } else {
            value
        };
        Self::new(value)
    }
}
