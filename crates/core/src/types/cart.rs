//! Cart lines and the cart itself.
//!
//! A [`Cart`] keeps one line per item, in the order items were first added.
//! Every line has a quantity of at least one: operations that would bring a
//! quantity to zero or below remove the line instead.

use serde::{Deserialize, Serialize};

use super::catalog::CatalogItem;
use super::id::ItemId;
use super::money::Money;

/// Errors returned by cart mutations.
///
/// These are caller contract violations; the cart is left untouched when one
/// is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside the accepted range for the operation.
    #[error("invalid quantity {quantity}")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: i64,
    },
    /// Quantity change requested for an item that is not in the cart.
    #[error("item {0} is not in the cart")]
    UnknownItem(ItemId),
    /// Two lines reference the same item.
    #[error("item {0} appears on more than one line")]
    DuplicateLine(ItemId),
    /// The cart is frozen while an order for it is being placed.
    #[error("the cart cannot change while an order is being placed")]
    Locked,
}

/// One item in the cart.
///
/// Field names on the wire match the storage layout written by earlier
/// versions of the storefront (`id`, `price`, `qty`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog item this line refers to.
    #[serde(rename = "id")]
    pub item_id: ItemId,
    /// Item name, captured when the item was added.
    pub name: String,
    /// Unit price, captured when the item was added.
    #[serde(rename = "price")]
    pub unit_price: Money,
    /// Number of units, always at least one.
    #[serde(rename = "qty")]
    pub quantity: u32,
    /// Image URL, if the catalog had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    /// Price of this line (`unit_price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// What a quantity update did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The line now has the requested quantity.
    Updated,
    /// The requested quantity was zero or less and the line was removed.
    Removed,
    /// The requested quantity was zero or less and the item was not in the cart.
    Unchanged,
}

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a cart from previously stored lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if a line has a zero quantity and
    /// `CartError::DuplicateLine` if an item appears twice.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, CartError> {
        for (index, line) in lines.iter().enumerate() {
            if line.quantity == 0 {
                return Err(CartError::InvalidQuantity { quantity: 0 });
            }
            if lines
                .iter()
                .skip(index + 1)
                .any(|other| other.item_id == line.item_id)
            {
                return Err(CartError::DuplicateLine(line.item_id));
            }
        }
        Ok(Self { lines })
    }

    /// Add `quantity` units of a catalog item.
    ///
    /// Increments the existing line if the item is already in the cart,
    /// otherwise appends a new line with the item's current name and price.
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is zero or the
    /// resulting quantity would not fit in a `u32`.
    pub fn add_item(&mut self, item: &CatalogItem, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity: 0 });
        }

        if let Some(line) = self.line_mut(item.id) {
            let next = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::InvalidQuantity {
                    quantity: i64::from(line.quantity) + i64::from(quantity),
                })?;
            line.quantity = next;
            return Ok(next);
        }

        self.lines.push(CartLine {
            item_id: item.id,
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
            image: item.image.clone(),
        });
        Ok(quantity)
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line (or does nothing if the
    /// item is absent).
    ///
    /// # Errors
    ///
    /// Returns `CartError::UnknownItem` if `quantity` is positive and the item
    /// is not in the cart, and `CartError::InvalidQuantity` if `quantity`
    /// does not fit in a `u32`.
    pub fn set_quantity(&mut self, id: ItemId, quantity: i64) -> Result<QuantityUpdate, CartError> {
        if quantity <= 0 {
            return Ok(if self.remove_item(id).is_some() {
                QuantityUpdate::Removed
            } else {
                QuantityUpdate::Unchanged
            });
        }

        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })?;
        let line = self.line_mut(id).ok_or(CartError::UnknownItem(id))?;
        line.quantity = quantity;
        Ok(QuantityUpdate::Updated)
    }

    /// Remove the line for an item, returning it if it was present.
    pub fn remove_item(&mut self, id: ItemId) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| line.item_id == id)?;
        Some(self.lines.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Get the line for an item.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item_id == id)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of `unit_price × quantity` over every line, computed fresh.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, id: ItemId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.item_id == id)
    }
}
