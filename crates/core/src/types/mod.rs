//! Core types for Forkful.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod money;
pub mod totals;

pub use cart::{Cart, CartError, CartLine, QuantityUpdate};
pub use catalog::{Catalog, CatalogError, CatalogItem};
pub use id::*;
pub use money::Money;
pub use totals::{OrderTotals, Surcharges};
