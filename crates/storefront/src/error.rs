//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for everything the storefront surfaces
//! to a shopper-facing caller. Environmental failures are captured to Sentry
//! before being turned into a generic message; contract violations and
//! checkout refusals are shown to the shopper as-is.

use forkful_core::{CartError, CatalogError, ItemId};
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::identity::IdentityScope;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart mutation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout refused or failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Menu could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Item requested that is not on the menu.
    #[error("Not on the menu: item {0}")]
    NotOnMenu(ItemId),
}

impl AppError {
    /// Whether the shopper caused (and can act on) this error.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::Cart(_) | Self::Checkout(_) | Self::NotOnMenu(_))
    }

    /// Message safe to show to the shopper.
    ///
    /// Payment collaborator messages pass through verbatim; environmental
    /// failures never expose internal details.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Checkout(err) => err.to_string(),
            Self::Cart(CartError::InvalidQuantity { quantity }) => {
                format!("Quantity {quantity} is not allowed")
            }
            Self::Cart(CartError::UnknownItem(id)) => {
                format!("Item {id} is not in your cart")
            }
            Self::Cart(CartError::Locked) => {
                "Your order is being placed; the cart can change once it completes".to_string()
            }
            Self::Cart(err) => err.to_string(),
            Self::NotOnMenu(id) => format!("Item {id} is not on the menu"),
            Self::Catalog(_) | Self::Config(_) => "The storefront is misconfigured".to_string(),
        }
    }

    /// Log the error, capturing environmental failures to Sentry.
    pub fn report(&self) {
        if self.is_user_facing() {
            tracing::info!(error = %self, "Request refused");
        } else {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate Sentry events with the active identity.
///
/// Uses the scope's storage key, never the raw token. Guests clear the user.
pub fn set_sentry_scope(scope: &IdentityScope) {
    match scope {
        IdentityScope::Guest => clear_sentry_user(),
        IdentityScope::Authenticated(_) => {
            let key = scope.storage_key();
            sentry::configure_scope(|sentry_scope| {
                sentry_scope.set_user(Some(sentry::User {
                    id: Some(key),
                    ..Default::default()
                }));
            });
        }
    }
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item to cart", Some(&[("item_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
