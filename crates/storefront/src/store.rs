//! The live cart for the active identity.
//!
//! [`CartStore`] owns the in-memory cart, writes a snapshot after every
//! mutation, swaps carts wholesale when the identity changes, and announces
//! every change on a broadcast channel for UI consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use forkful_core::{
    Cart, CartError, CartLine, CatalogItem, ItemId, OrderTotals, QuantityUpdate, Surcharges,
};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use crate::error::{add_breadcrumb, set_sentry_scope};
use crate::identity::{IdentityProvider, IdentityScope};
use crate::persistence::SnapshotWriter;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Where the active cart is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    /// No lines.
    Empty,
    /// At least one line.
    Populated,
    /// An order confirmation is awaiting the payment collaborator.
    CheckingOut,
}

/// What changed in a [`CartEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEventKind {
    /// Units of an item were added.
    ItemAdded(ItemId),
    /// A line's quantity was overwritten.
    QuantityChanged(ItemId),
    /// A line was removed.
    ItemRemoved(ItemId),
    /// The cart was emptied.
    Cleared,
    /// The active identity changed and a different cart was loaded.
    ScopeSwitched,
    /// An order was confirmed and the cart emptied.
    OrderPlaced,
}

/// Change notification sent to subscribers after every effective mutation.
#[derive(Debug, Clone)]
pub struct CartEvent {
    /// What happened.
    pub kind: CartEventKind,
    /// Storage key of the active scope.
    pub scope_key: String,
    /// Units in the cart after the change.
    pub item_count: u64,
    /// Totals after the change.
    pub totals: OrderTotals,
}

/// The in-memory cart for the active identity.
pub struct CartStore {
    scope: IdentityScope,
    cart: Cart,
    surcharges: Surcharges,
    writer: SnapshotWriter,
    identity: watch::Receiver<IdentityScope>,
    events: broadcast::Sender<CartEvent>,
    checking_out: Arc<AtomicBool>,
}

impl CartStore {
    /// Open the store for the identity currently published by `identity`.
    pub async fn open(
        identity: &IdentityProvider,
        writer: SnapshotWriter,
        surcharges: Surcharges,
    ) -> Self {
        let mut rx = identity.subscribe();
        let scope = rx.borrow_and_update().clone();
        let cart = writer.load(&scope).await;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        set_sentry_scope(&scope);
        info!(scope = %scope.storage_key(), lines = cart.len(), "Cart store opened");

        Self {
            scope,
            cart,
            surcharges,
            writer,
            identity: rx,
            events,
            checking_out: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add `quantity` units of a menu item.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is zero and
    /// `CartError::Locked` while an order is being placed; the cart is
    /// unchanged.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub fn add_item(&mut self, item: &CatalogItem, quantity: u32) -> Result<u32, CartError> {
        self.ensure_unlocked()?;
        let quantity = self
            .cart
            .add_item(item, quantity)
            .inspect_err(|e| warn!(error = %e, "Rejected add to cart"))?;

        self.persist();
        let id = item.id.to_string();
        add_breadcrumb("cart", "Added item to cart", Some(&[("item_id", id.as_str())]));
        self.publish(CartEventKind::ItemAdded(item.id));
        Ok(quantity)
    }

    /// Overwrite an item's quantity; zero or less removes the line.
    ///
    /// The snapshot is rewritten even when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UnknownItem` if `quantity` is positive and the item
    /// is not in the cart, and `CartError::Locked` while an order is being
    /// placed; the cart is unchanged.
    #[instrument(skip(self), fields(item_id = %id))]
    pub fn set_quantity(&mut self, id: ItemId, quantity: i64) -> Result<QuantityUpdate, CartError> {
        self.ensure_unlocked()?;
        let update = self
            .cart
            .set_quantity(id, quantity)
            .inspect_err(|e| warn!(error = %e, "Rejected quantity change"))?;

        self.persist();
        match update {
            QuantityUpdate::Updated => self.publish(CartEventKind::QuantityChanged(id)),
            QuantityUpdate::Removed => self.publish(CartEventKind::ItemRemoved(id)),
            QuantityUpdate::Unchanged => {}
        }
        Ok(update)
    }

    /// Remove an item's line. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Locked` while an order is being placed.
    #[instrument(skip(self), fields(item_id = %id))]
    pub fn remove_item(&mut self, id: ItemId) -> Result<bool, CartError> {
        self.ensure_unlocked()?;
        let removed = self.cart.remove_item(id).is_some();
        self.persist();
        if removed {
            let id_str = id.to_string();
            add_breadcrumb("cart", "Removed item from cart", Some(&[("item_id", id_str.as_str())]));
            self.publish(CartEventKind::ItemRemoved(id));
        }
        Ok(removed)
    }

    /// Empty the cart and clear its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Locked` while an order is being placed.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_unlocked()?;
        self.empty(CartEventKind::Cleared);
        Ok(())
    }

    /// Totals for the current lines.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::compute(&self.cart, &self.surcharges)
    }

    /// Read-only copy of the current lines.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[CartLine]> {
        Arc::from(self.cart.lines())
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The active identity scope.
    #[must_use]
    pub const fn scope(&self) -> &IdentityScope {
        &self.scope
    }

    /// Surcharges applied to totals.
    #[must_use]
    pub const fn surcharges(&self) -> &Surcharges {
        &self.surcharges
    }

    /// Lifecycle state of the active cart.
    #[must_use]
    pub fn state(&self) -> CartState {
        if self.checking_out.load(Ordering::SeqCst) {
            CartState::CheckingOut
        } else if self.cart.is_empty() {
            CartState::Empty
        } else {
            CartState::Populated
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Make `scope` the active identity, loading its cart.
    ///
    /// The previous cart is not merged into the new one; it stays in
    /// storage under its own key. Returns `false` if `scope` was already
    /// active.
    pub async fn switch_scope(&mut self, scope: IdentityScope) -> bool {
        if scope == self.scope {
            return false;
        }

        let cart = self.writer.load(&scope).await;
        info!(
            from = %self.scope.storage_key(),
            to = %scope.storage_key(),
            lines = cart.len(),
            "Switched cart scope"
        );

        self.scope = scope;
        self.cart = cart;
        set_sentry_scope(&self.scope);
        self.publish(CartEventKind::ScopeSwitched);
        true
    }

    /// Apply the latest identity published since the last call.
    ///
    /// Returns whether the active scope changed.
    pub async fn sync_identity(&mut self) -> bool {
        if !self.identity.has_changed().unwrap_or(false) {
            return false;
        }
        let scope = self.identity.borrow_and_update().clone();
        self.switch_scope(scope).await
    }

    /// Wait until every snapshot write so far has been applied.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    pub(crate) const fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    pub(crate) fn checkout_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.checking_out)
    }

    /// Empty the cart after a confirmed order.
    pub(crate) fn complete_order(&mut self) {
        self.empty(CartEventKind::OrderPlaced);
    }

    fn empty(&mut self, kind: CartEventKind) {
        self.cart.clear();
        self.writer.clear(&self.scope);
        add_breadcrumb("cart", "Cleared cart", None);
        self.publish(kind);
    }

    /// Lines are frozen from checkout start until the payment resolves.
    fn ensure_unlocked(&self) -> Result<(), CartError> {
        if self.checking_out.load(Ordering::SeqCst) {
            warn!(scope = %self.scope.storage_key(), "Rejected cart change during checkout");
            return Err(CartError::Locked);
        }
        Ok(())
    }

    fn persist(&self) {
        self.writer.save(&self.scope, &self.cart);
    }

    fn publish(&self, kind: CartEventKind) {
        // No subscribers is fine.
        let _ = self.events.send(CartEvent {
            kind,
            scope_key: self.scope.storage_key(),
            item_count: self.cart.item_count(),
            totals: self.totals(),
        });
    }
}
