//! Monetary amounts in minor currency units.
//!
//! The storefront trades in a single currency (Indian rupees), so an amount
//! is just a non-negative count of paise. Arithmetic saturates rather than
//! wrapping: a cart total can never silently overflow into a small number.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative amount of money in minor units (paise).
///
/// ## Examples
///
/// ```
/// use forkful_core::Money;
///
/// let pizza = Money::from_minor(29_900);
/// assert_eq!(pizza.times(2), Money::from_minor(59_800));
/// assert_eq!(pizza.to_string(), "₹299.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero paise.
    pub const ZERO: Self = Self(0);

    /// Currency symbol used for display.
    pub const SYMBOL: &'static str = "₹";

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Get the amount in minor units.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Multiply by a line quantity, saturating at `u64::MAX`.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }

    /// The amount in major units as a decimal (e.g., 299.00 for 29900 paise).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0) / Decimal::ONE_HUNDRED
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<u64> for Money {
    fn from(minor: u64) -> Self {
        Self(minor)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", Self::SYMBOL, self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_minor(36_400).to_string(), "₹364.00");
        assert_eq!(Money::from_minor(5).to_string(), "₹0.05");
        assert_eq!(Money::ZERO.to_string(), "₹0.00");
    }

    #[test]
    fn test_times_saturates() {
        let huge = Money::from_minor(u64::MAX / 2);
        assert_eq!(huge.times(3), Money::from_minor(u64::MAX));
    }

    #[test]
    fn test_sum() {
        let total: Money = [299, 349, 40].into_iter().map(Money::from_minor).sum();
        assert_eq!(total, Money::from_minor(688));
    }

    #[test]
    fn test_add_saturates() {
        assert_eq!(
            Money::from_minor(u64::MAX) + Money::from_minor(1),
            Money::from_minor(u64::MAX)
        );
    }
}
