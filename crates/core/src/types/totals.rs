//! Checkout surcharges and derived order totals.

use serde::{Deserialize, Serialize};

use super::cart::Cart;
use super::money::Money;

/// Fixed amounts added to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Surcharges {
    /// Flat delivery fee.
    pub delivery_fee: Money,
    /// Flat taxes and charges.
    pub taxes: Money,
}

impl Surcharges {
    /// Create a surcharge schedule.
    #[must_use]
    pub const fn new(delivery_fee: Money, taxes: Money) -> Self {
        Self {
            delivery_fee,
            taxes,
        }
    }
}

/// Monetary breakdown of an order.
///
/// Always derived from a cart on demand and never stored, so it cannot drift
/// from the cart's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of every line total.
    pub subtotal: Money,
    /// Delivery fee.
    pub delivery_fee: Money,
    /// Taxes and charges.
    pub taxes: Money,
    /// `subtotal + delivery_fee + taxes`.
    pub grand_total: Money,
}

impl OrderTotals {
    /// Compute totals for a cart under the given surcharges.
    ///
    /// ```
    /// use forkful_core::{Cart, Money, OrderTotals, Surcharges};
    ///
    /// let totals = OrderTotals::compute(
    ///     &Cart::new(),
    ///     &Surcharges::new(Money::from_minor(40), Money::from_minor(25)),
    /// );
    /// assert_eq!(totals.subtotal, Money::ZERO);
    /// assert_eq!(totals.grand_total, Money::from_minor(65));
    /// ```
    #[must_use]
    pub fn compute(cart: &Cart, surcharges: &Surcharges) -> Self {
        let subtotal = cart.subtotal();
        Self {
            subtotal,
            delivery_fee: surcharges.delivery_fee,
            taxes: surcharges.taxes,
            grand_total: subtotal + surcharges.delivery_fee + surcharges.taxes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{CatalogItem, ItemId};

    #[test]
    fn test_grand_total() {
        let mut cart = Cart::new();
        cart.add_item(
            &CatalogItem {
                id: ItemId::new(1),
                name: "Margherita Pizza".to_string(),
                price: Money::from_minor(299),
                description: None,
                tags: Vec::new(),
                image: None,
            },
            1,
        )
        .unwrap();

        let totals = OrderTotals::compute(
            &cart,
            &Surcharges::new(Money::from_minor(40), Money::from_minor(25)),
        );
        assert_eq!(totals.subtotal, Money::from_minor(299));
        assert_eq!(totals.grand_total, Money::from_minor(364));
    }

    #[test]
    fn test_zero_surcharges() {
        let totals = OrderTotals::compute(&Cart::new(), &Surcharges::default());
        assert_eq!(totals.grand_total, Money::ZERO);
    }
}
