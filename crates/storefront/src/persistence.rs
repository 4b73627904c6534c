//! Cart snapshot persistence.
//!
//! [`PersistenceAdapter`] maps an [`IdentityScope`] to a storage key and
//! reads/writes the cart snapshot under it. [`SnapshotWriter`] wraps the
//! adapter in a background writer so that cart mutations never wait on
//! storage I/O.
//!
//! # Storage layout
//!
//! One JSON array of cart lines per key:
//!
//! - `cart_guest` - the guest cart
//! - `cart_<token prefix>` - the cart of a logged-in shopper, keyed by the
//!   first [`TOKEN_PREFIX_LEN`] characters of their token
//!
//! Two tokens sharing a prefix share a key. Keys stay short at the cost of
//! that collision risk. A logged-in shopper never shares the guest key: a
//! prefix reading `guest`, or one that already starts with `~`, is written
//! with one extra leading `~` (`cart_~guest`, `cart_~~x`).

use std::sync::Arc;

use forkful_core::{Cart, CartLine};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::identity::IdentityScope;
use crate::storage::{SnapshotStorage, StorageError};

/// Storage key of the guest cart.
pub const GUEST_KEY: &str = "cart_guest";

/// Number of token characters used in an authenticated cart key.
pub const TOKEN_PREFIX_LEN: usize = 16;

/// Prefix shared by all cart keys.
const KEY_PREFIX: &str = "cart_";

/// Token prefix that would spell [`GUEST_KEY`].
const GUEST_NAME: &str = "guest";

/// Marks an authenticated key that would otherwise read as a reserved one.
const ESCAPE: char = '~';

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The storage backend could not be reached.
    #[error("snapshot storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// A stored snapshot could not be decoded into a valid cart.
    #[error("corrupt cart snapshot under {key}: {reason}")]
    CorruptSnapshot {
        /// Storage key of the snapshot.
        key: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The cart could not be encoded.
    #[error("failed to encode cart snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage key for a scope.
#[must_use]
pub fn key_for(scope: &IdentityScope) -> String {
    match scope {
        IdentityScope::Guest => GUEST_KEY.to_owned(),
        IdentityScope::Authenticated(token) => {
            let prefix: String = token.expose().chars().take(TOKEN_PREFIX_LEN).collect();
            if prefix == GUEST_NAME || prefix.starts_with(ESCAPE) {
                format!("{KEY_PREFIX}{ESCAPE}{prefix}")
            } else {
                format!("{KEY_PREFIX}{prefix}")
            }
        }
    }
}

/// Loads, saves and deletes cart snapshots.
pub struct PersistenceAdapter {
    storage: Arc<dyn SnapshotStorage>,
}

impl PersistenceAdapter {
    /// Create an adapter over a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn SnapshotStorage>) -> Self {
        Self { storage }
    }

    /// Load the cart for `scope`.
    ///
    /// Never fails: a missing snapshot yields an empty cart, and an
    /// unreadable or corrupt one is logged and treated as missing.
    #[must_use]
    pub fn load(&self, scope: &IdentityScope) -> Cart {
        match self.try_load(scope) {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(key = %key_for(scope), error = %e, "Discarding unusable cart snapshot");
                Cart::new()
            }
        }
    }

    /// Load the cart for `scope`, reporting why a snapshot was unusable.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::StorageUnavailable` if the backend cannot be
    /// read and `PersistenceError::CorruptSnapshot` if the stored value is not
    /// a valid cart.
    pub fn try_load(&self, scope: &IdentityScope) -> Result<Option<Cart>, PersistenceError> {
        let key = key_for(scope);
        let Some(raw) = self.storage.get(&key)? else {
            return Ok(None);
        };
        decode_snapshot(&key, &raw).map(Some)
    }

    /// Write `cart` under the key for `scope`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::StorageUnavailable` if the backend cannot be
    /// written.
    pub fn save(&self, scope: &IdentityScope, cart: &Cart) -> Result<(), PersistenceError> {
        self.save_key(&key_for(scope), cart.lines())
    }

    /// Remove the snapshot for `scope`. Succeeds if there is none.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::StorageUnavailable` if the backend cannot be
    /// written.
    pub fn delete(&self, scope: &IdentityScope) -> Result<(), PersistenceError> {
        self.delete_key(&key_for(scope))
    }

    fn save_key(&self, key: &str, lines: &[CartLine]) -> Result<(), PersistenceError> {
        let body = serde_json::to_string(lines)?;
        self.storage.set(key, &body)?;
        debug!(key, lines = lines.len(), "Saved cart snapshot");
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<(), PersistenceError> {
        self.storage.remove(key)?;
        debug!(key, "Deleted cart snapshot");
        Ok(())
    }
}

/// Decode a stored snapshot.
///
/// A JSON `null` is an empty cart, matching what older clients could leave
/// behind. Extra per-line fields are ignored.
fn decode_snapshot(key: &str, raw: &str) -> Result<Cart, PersistenceError> {
    let corrupt = |reason: String| PersistenceError::CorruptSnapshot {
        key: key.to_owned(),
        reason,
    };

    let lines: Option<Vec<CartLine>> =
        serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    Cart::from_lines(lines.unwrap_or_default()).map_err(|e| corrupt(e.to_string()))
}

enum WriteCommand {
    Save { key: String, lines: Vec<CartLine> },
    Delete { key: String },
    Flush(oneshot::Sender<()>),
}

/// Background writer for cart snapshots.
///
/// Writes are queued and applied in order on a blocking worker thread. A
/// failed write is logged and dropped; the in-memory cart stays
/// authoritative. Cloning shares the same queue.
#[derive(Clone)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
    adapter: Arc<PersistenceAdapter>,
}

impl SnapshotWriter {
    /// Start the writer.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(adapter: Arc<PersistenceAdapter>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Arc::clone(&adapter);
        tokio::task::spawn_blocking(move || run_writer(&worker, rx));
        Self { tx, adapter }
    }

    /// The adapter writes are applied through.
    #[must_use]
    pub fn adapter(&self) -> &PersistenceAdapter {
        &self.adapter
    }

    /// Queue a save of `cart` for `scope`.
    pub fn save(&self, scope: &IdentityScope, cart: &Cart) {
        self.send(WriteCommand::Save {
            key: key_for(scope),
            lines: cart.lines().to_vec(),
        });
    }

    /// Queue removal of the snapshot for `scope`.
    pub fn delete(&self, scope: &IdentityScope) {
        self.send(WriteCommand::Delete {
            key: key_for(scope),
        });
    }

    /// Queue the post-clear write for `scope`.
    ///
    /// A guest snapshot is deleted outright. A logged-in shopper's snapshot
    /// is reset to an empty cart so the key stays claimed.
    pub fn clear(&self, scope: &IdentityScope) {
        match scope {
            IdentityScope::Guest => self.delete(scope),
            IdentityScope::Authenticated(_) => self.save(scope, &Cart::new()),
        }
    }

    /// Load the cart for `scope` once every queued write has landed.
    ///
    /// Never fails; see [`PersistenceAdapter::load`].
    pub async fn load(&self, scope: &IdentityScope) -> Cart {
        self.flush().await;

        let adapter = Arc::clone(&self.adapter);
        let scope = scope.clone();
        match tokio::task::spawn_blocking(move || adapter.load(&scope)).await {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "Cart snapshot load task failed; starting empty");
                Cart::new()
            }
        }
    }

    /// Wait until every write queued so far has been applied or dropped.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(done_tx)).is_err() {
            warn!("Snapshot writer has stopped; nothing to flush");
            return;
        }
        // The worker drops the sender only if it exits mid-flush.
        let _ = done_rx.await;
    }

    fn send(&self, command: WriteCommand) {
        if self.tx.send(command).is_err() {
            warn!("Snapshot writer has stopped; dropping cart write");
        }
    }
}

fn run_writer(adapter: &PersistenceAdapter, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
    while let Some(command) = rx.blocking_recv() {
        match command {
            WriteCommand::Save { key, lines } => {
                if let Err(e) = adapter.save_key(&key, &lines) {
                    warn!(key = %key, error = %e, "Failed to save cart snapshot; keeping in-memory cart");
                }
            }
            WriteCommand::Delete { key } => {
                if let Err(e) = adapter.delete_key(&key) {
                    warn!(key = %key, error = %e, "Failed to delete cart snapshot");
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Snapshot writer stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forkful_core::{CatalogItem, ItemId, Money};
    use proptest::prelude::*;

    use super::*;
    use crate::storage::MemoryStorage;

    fn item(id: i64, price: u64) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(id),
            name: format!("Dish {id}"),
            price: Money::from_minor(price),
            description: None,
            tags: Vec::new(),
            image: Some(format!("https://img.example/{id}.jpg")),
        }
    }

    fn authenticated(token: &str) -> IdentityScope {
        IdentityScope::from_token(Some(token))
    }

    fn adapter() -> (Arc<MemoryStorage>, PersistenceAdapter) {
        let storage = Arc::new(MemoryStorage::new());
        let adapter = PersistenceAdapter::new(storage.clone());
        (storage, adapter)
    }

    #[test]
    fn test_key_for_guest() {
        assert_eq!(key_for(&IdentityScope::Guest), "cart_guest");
    }

    #[test]
    fn test_key_for_short_token_uses_whole_token() {
        assert_eq!(key_for(&authenticated("abc123")), "cart_abc123");
    }

    #[test]
    fn test_key_for_long_token_is_truncated() {
        let scope = authenticated("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.payload");
        assert_eq!(key_for(&scope), "cart_eyJhbGciOiJIUzI1");
    }

    #[test]
    fn test_key_for_token_reading_guest() {
        assert_eq!(key_for(&authenticated("guest")), "cart_~guest");
        assert_eq!(key_for(&authenticated("~guest")), "cart_~~guest");
        assert_eq!(key_for(&authenticated("guest-1")), "cart_guest-1");
        assert_ne!(key_for(&authenticated("guest")), GUEST_KEY);
    }

    #[test]
    fn test_token_reading_guest_does_not_touch_guest_cart() {
        let (storage, adapter) = adapter();
        let mut guest = Cart::new();
        guest.add_item(&item(1, 299), 2).unwrap();
        adapter.save(&IdentityScope::Guest, &guest).unwrap();

        let shopper = authenticated("guest");
        assert!(adapter.load(&shopper).is_empty());
        adapter.save(&shopper, &Cart::new()).unwrap();

        assert_eq!(adapter.load(&IdentityScope::Guest), guest);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_key_for_is_deterministic() {
        assert_eq!(key_for(&authenticated("tok")), key_for(&authenticated("tok")));
        assert_ne!(key_for(&authenticated("tok")), key_for(&IdentityScope::Guest));
    }

    #[test]
    fn test_round_trip_every_scope() {
        let (_, adapter) = adapter();
        for scope in [
            IdentityScope::Guest,
            authenticated("alice"),
            authenticated("a-very-long-token-for-bob"),
        ] {
            let mut cart = Cart::new();
            cart.add_item(&item(1, 299), 2).unwrap();
            cart.add_item(&item(3, 159), 1).unwrap();

            adapter.save(&scope, &cart).unwrap();
            assert_eq!(adapter.load(&scope), cart);
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (_, adapter) = adapter();
        assert!(adapter.load(&IdentityScope::Guest).is_empty());
        assert!(adapter.try_load(&IdentityScope::Guest).unwrap().is_none());
    }

    #[test]
    fn test_load_unparsable_is_empty() {
        let (storage, adapter) = adapter();
        storage.set(GUEST_KEY, "{not json").unwrap();

        assert!(adapter.load(&IdentityScope::Guest).is_empty());
        assert!(matches!(
            adapter.try_load(&IdentityScope::Guest),
            Err(PersistenceError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn test_load_invariant_violation_is_corrupt() {
        let (storage, adapter) = adapter();
        storage
            .set(GUEST_KEY, r#"[{"id":1,"name":"A","price":10,"qty":0}]"#)
            .unwrap();
        assert!(matches!(
            adapter.try_load(&IdentityScope::Guest),
            Err(PersistenceError::CorruptSnapshot { .. })
        ));

        storage
            .set(GUEST_KEY, r#"[{"id":1,"name":"A","price":10,"qty":-2}]"#)
            .unwrap();
        assert!(adapter.load(&IdentityScope::Guest).is_empty());
    }

    #[test]
    fn test_load_ignores_unknown_line_fields() {
        let (storage, adapter) = adapter();
        storage
            .set(
                GUEST_KEY,
                r#"[{"id":2,"name":"Chicken Biryani","price":34900,"qty":2,
                     "rating":4.7,"tags":["Spicy"],"eta":"35-45 mins"}]"#,
            )
            .unwrap();

        let cart = adapter.load(&IdentityScope::Guest);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.subtotal(), Money::from_minor(69_800));
    }

    #[test]
    fn test_load_null_is_empty() {
        let (storage, adapter) = adapter();
        storage.set(GUEST_KEY, "null").unwrap();
        assert!(adapter.try_load(&IdentityScope::Guest).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_save_unavailable() {
        let storage = Arc::new(MemoryStorage::unavailable());
        let adapter = PersistenceAdapter::new(storage);
        assert!(matches!(
            adapter.save(&IdentityScope::Guest, &Cart::new()),
            Err(PersistenceError::StorageUnavailable(_))
        ));
        assert!(adapter.load(&IdentityScope::Guest).is_empty());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let (_, adapter) = adapter();
        adapter.delete(&authenticated("nobody")).unwrap();
    }

    #[tokio::test]
    async fn test_writer_applies_in_order() {
        let (storage, adapter) = adapter();
        let writer = SnapshotWriter::spawn(Arc::new(adapter));

        let mut cart = Cart::new();
        cart.add_item(&item(1, 299), 1).unwrap();
        writer.save(&IdentityScope::Guest, &cart);
        cart.add_item(&item(1, 299), 1).unwrap();
        writer.save(&IdentityScope::Guest, &cart);
        writer.flush().await;

        assert_eq!(writer.adapter().load(&IdentityScope::Guest), cart);
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_writer_clear_semantics() {
        let (storage, adapter) = adapter();
        let writer = SnapshotWriter::spawn(Arc::new(adapter));
        let alice = authenticated("alice");

        let mut cart = Cart::new();
        cart.add_item(&item(1, 299), 1).unwrap();
        writer.save(&IdentityScope::Guest, &cart);
        writer.save(&alice, &cart);
        writer.clear(&IdentityScope::Guest);
        writer.clear(&alice);
        writer.flush().await;

        assert_eq!(storage.get(GUEST_KEY).unwrap(), None);
        assert_eq!(storage.get("cart_alice").unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_writer_survives_storage_outage() {
        let (storage, adapter) = adapter();
        let writer = SnapshotWriter::spawn(Arc::new(adapter));

        let mut cart = Cart::new();
        cart.add_item(&item(1, 299), 1).unwrap();

        storage.set_available(false);
        writer.save(&IdentityScope::Guest, &cart);
        writer.flush().await;

        storage.set_available(true);
        writer.save(&IdentityScope::Guest, &cart);
        writer.flush().await;
        assert_eq!(writer.adapter().load(&IdentityScope::Guest), cart);
    }

    fn arb_token() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z0-9._~-]{1,40}",
            Just("guest".to_string()),
            "~{1,3}guest",
            "guest[a-z~]{0,4}",
        ]
    }

    fn arb_cart() -> impl Strategy<Value = Cart> {
        prop::collection::btree_map(1..20_i64, (1..5_000_u64, 1..50_u32), 0..6).prop_map(
            |lines| {
                let mut cart = Cart::new();
                for (id, (price, qty)) in lines {
                    cart.add_item(&item(id, price), qty).unwrap();
                }
                cart
            },
        )
    }

    proptest! {
        /// No token maps onto the guest key.
        #[test]
        fn authenticated_keys_avoid_guest(token in arb_token()) {
            prop_assert_ne!(key_for(&authenticated(&token)), GUEST_KEY);
        }

        /// Tokens collide only when their prefixes match.
        #[test]
        fn keys_differ_when_prefixes_differ(a in arb_token(), b in arb_token()) {
            let prefix = |t: &str| t.chars().take(TOKEN_PREFIX_LEN).collect::<String>();
            prop_assert_eq!(
                key_for(&authenticated(&a)) == key_for(&authenticated(&b)),
                prefix(&a) == prefix(&b)
            );
        }

        /// Whatever is saved for a scope loads back unchanged.
        #[test]
        fn save_then_load_round_trips(token in prop::option::of(arb_token()), cart in arb_cart()) {
            let (_, adapter) = adapter();
            let scope = IdentityScope::from_token(token.as_deref());
            adapter.save(&scope, &cart).unwrap();
            prop_assert_eq!(adapter.load(&scope), cart);
        }

        /// Writing one scope leaves every other scope's snapshot alone.
        #[test]
        fn scopes_are_isolated(
            a in arb_token(),
            b in arb_token(),
            first in arb_cart(),
            second in arb_cart(),
        ) {
            let (_, adapter) = adapter();
            let (alice, bob) = (authenticated(&a), authenticated(&b));
            prop_assume!(key_for(&alice) != key_for(&bob));

            adapter.save(&IdentityScope::Guest, &first).unwrap();
            adapter.save(&alice, &first).unwrap();
            adapter.save(&bob, &second).unwrap();
            adapter.delete(&bob).unwrap();

            prop_assert_eq!(adapter.load(&IdentityScope::Guest), first.clone());
            prop_assert_eq!(adapter.load(&alice), first);
        }
    }
}
