//! Read-only menu of purchasable items.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::id::ItemId;
use super::money::Money;

/// Errors that can occur when building a [`Catalog`].
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The YAML document could not be parsed.
    #[error("invalid catalog document: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Two entries share the same ID.
    #[error("duplicate catalog item id {0}")]
    DuplicateItem(ItemId),
    /// An entry has a blank name.
    #[error("catalog item {0} has an empty name")]
    EmptyName(ItemId),
}

/// A single purchasable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable, unique identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Current price in minor units.
    pub price: Money,
    /// Short blurb shown under the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form labels such as "Veg" or "Spicy".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The menu, in display order.
///
/// The cart engine only ever reads from a catalog; prices are copied into a
/// cart line when the item is added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog from a list of items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateItem` if two items share an ID and
    /// `CatalogError::EmptyName` if an item has a blank name.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(item.id));
            }
            if !seen.insert(item.id) {
                return Err(CatalogError::DuplicateItem(item.id));
            }
        }
        Ok(Self { items })
    }

    /// Parse a catalog from a YAML sequence of items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed YAML, or any error from
    /// [`Catalog::new`].
    pub fn from_yaml(document: &str) -> Result<Self, CatalogError> {
        let items: Vec<CatalogItem> = serde_yaml::from_str(document)?;
        Self::new(items)
    }

    /// Look up an item by ID.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Iterate over items in display order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    /// Number of items on the menu.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the menu is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
