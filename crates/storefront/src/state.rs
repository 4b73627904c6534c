//! Application state: the composition root of the cart engine.

use std::sync::Arc;

use forkful_core::{Catalog, CartLine, ItemId, OrderTotals, QuantityUpdate};
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{info, warn};

use crate::checkout::{CheckoutAggregator, OrderReceipt, PaymentGateway};
use crate::config::{ConfigError, PersistenceMode, StorefrontConfig};
use crate::error::{AppError, Result};
use crate::identity::{IdentityProvider, IdentityScope};
use crate::persistence::{PersistenceAdapter, SnapshotWriter};
use crate::storage::{FileStorage, MemoryStorage, SnapshotStorage};
use crate::store::{CartEvent, CartStore};

/// Menu used when no catalog file is configured.
pub const BUNDLED_MENU: &str = include_str!("../menu.yaml");

/// Storage key holding the logged-in shopper's token between runs.
pub const TOKEN_KEY: &str = "token";

/// Application state shared across every surface of the storefront.
///
/// This struct is cheaply cloneable via `Arc`. It owns the single active
/// cart store; every cart operation goes through it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Catalog,
    storage: Arc<dyn SnapshotStorage>,
    identity: IdentityProvider,
    store: Mutex<CartStore>,
    checkout: CheckoutAggregator,
}

impl AppState {
    /// Build the state described by `config`.
    ///
    /// Restores the previous session's identity from storage, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub async fn open(config: &StorefrontConfig) -> Result<Self> {
        let catalog = load_catalog(config)?;
        let storage: Arc<dyn SnapshotStorage> = match config.persistence {
            PersistenceMode::Enabled => Arc::new(FileStorage::new(&config.data_dir)),
            PersistenceMode::Disabled => Arc::new(MemoryStorage::unavailable()),
        };
        Ok(Self::with_storage(config, catalog, storage).await)
    }

    /// Build the state over an explicit storage backend.
    pub async fn with_storage(
        config: &StorefrontConfig,
        catalog: Catalog,
        storage: Arc<dyn SnapshotStorage>,
    ) -> Self {
        let token = read_token(Arc::clone(&storage)).await;
        let identity = IdentityProvider::new(IdentityScope::from_token(token.as_deref()));

        let adapter = Arc::new(PersistenceAdapter::new(Arc::clone(&storage)));
        let writer = SnapshotWriter::spawn(adapter);
        let store = CartStore::open(&identity, writer, config.surcharges).await;
        let checkout = CheckoutAggregator::new(config.surcharges);

        info!(items = catalog.len(), "Storefront ready");

        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                storage,
                identity,
                store: Mutex::new(store),
                checkout,
            }),
        }
    }

    /// Get a reference to the menu.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn identity(&self) -> &IdentityProvider {
        &self.inner.identity
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn store(&self) -> &Mutex<CartStore> {
        &self.inner.store
    }

    /// Lock the cart store, first applying any identity change published
    /// since the last call.
    ///
    /// Every cart operation goes through here, so a login or logout seen by
    /// the provider is in effect before the next read or mutation.
    pub async fn active_store(&self) -> MutexGuard<'_, CartStore> {
        let mut store = self.store().lock().await;
        store.sync_identity().await;
        store
    }

    /// Add a menu item to the cart. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotOnMenu` for unknown items and `AppError::Cart`
    /// for a zero quantity or while an order is being placed.
    pub async fn add_to_cart(&self, id: ItemId, quantity: u32) -> Result<u32> {
        let item = self.inner.catalog.get(id).ok_or(AppError::NotOnMenu(id))?;
        Ok(self.active_store().await.add_item(item, quantity)?)
    }

    /// Overwrite an item's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` if the item is not in the cart or an order is
    /// being placed.
    pub async fn set_quantity(&self, id: ItemId, quantity: i64) -> Result<QuantityUpdate> {
        Ok(self.active_store().await.set_quantity(id, quantity)?)
    }

    /// Remove an item from the cart. Returns whether it was there.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` while an order is being placed.
    pub async fn remove_from_cart(&self, id: ItemId) -> Result<bool> {
        Ok(self.active_store().await.remove_item(id)?)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` while an order is being placed.
    pub async fn clear_cart(&self) -> Result<()> {
        Ok(self.active_store().await.clear()?)
    }

    /// Current cart lines.
    pub async fn cart_lines(&self) -> Arc<[CartLine]> {
        self.active_store().await.snapshot()
    }

    /// Current totals.
    pub async fn totals(&self) -> OrderTotals {
        self.active_store().await.totals()
    }

    /// Subscribe to cart change events.
    pub async fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.store().lock().await.subscribe()
    }

    /// Log in with a token issued by the login service.
    ///
    /// The token is remembered for the next session. The guest cart stays in
    /// storage under its own key; it is not merged into the shopper's cart.
    pub async fn login(&self, token: &str) -> IdentityScope {
        let scope = self.inner.identity.login(token);
        match &scope {
            IdentityScope::Authenticated(auth) => {
                self.write_token(Some(auth.expose().to_owned())).await;
            }
            IdentityScope::Guest => self.write_token(None).await,
        }
        self.active_store().await;
        scope
    }

    /// Log out. The shopper's cart stays in storage for their next login.
    pub async fn logout(&self) {
        self.inner.identity.logout();
        self.write_token(None).await;
        self.active_store().await;
    }

    /// Place an order for the current cart through `gateway`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` if the cart is empty, another order is
    /// pending, or the gateway refused.
    pub async fn place_order<G: PaymentGateway>(&self, gateway: &G) -> Result<OrderReceipt> {
        Ok(self
            .inner
            .checkout
            .confirm_order(self.store(), gateway)
            .await?)
    }

    /// Wait for every pending snapshot write.
    pub async fn shutdown(&self) {
        self.store().lock().await.flush().await;
    }

    async fn write_token(&self, token: Option<String>) {
        let storage = Arc::clone(&self.inner.storage);
        let result = tokio::task::spawn_blocking(move || match token {
            Some(token) => storage.set(TOKEN_KEY, &token),
            None => storage.remove(TOKEN_KEY),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist session token"),
            Err(e) => warn!(error = %e, "Session token task failed"),
        }
    }
}

/// Load the configured menu, or the bundled one.
///
/// # Errors
///
/// Returns `AppError::Config` if the menu file cannot be read and
/// `AppError::Catalog` if it is not a valid menu.
pub fn load_catalog(config: &StorefrontConfig) -> Result<Catalog> {
    let catalog = match &config.catalog_path {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Unreadable(path.clone(), e))?;
            Catalog::from_yaml(&document)?
        }
        None => Catalog::from_yaml(BUNDLED_MENU)?,
    };
    Ok(catalog)
}

async fn read_token(storage: Arc<dyn SnapshotStorage>) -> Option<String> {
    let result = tokio::task::spawn_blocking(move || storage.get(TOKEN_KEY)).await;
    match result {
        Ok(Ok(token)) => token,
        Ok(Err(e)) => {
            warn!(error = %e, "Session token unavailable; starting as guest");
            None
        }
        Err(e) => {
            warn!(error = %e, "Session token task failed; starting as guest");
            None
        }
    }
}
