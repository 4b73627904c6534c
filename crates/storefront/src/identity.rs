//! Shopper identity and identity-change notifications.
//!
//! The login flow itself lives outside the engine; all the engine sees is an
//! opaque token (or none, for a guest). The token is never inspected, only
//! used to pick which stored cart belongs to the shopper.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use crate::persistence::key_for;

/// An opaque authentication token issued by the login service.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    /// Wrap a raw token. Blank tokens mean "no identity" and yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(SecretString::from(raw.to_owned())))
        }
    }

    /// Expose the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

/// The partition a cart is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityScope {
    /// Not logged in.
    #[default]
    Guest,
    /// Logged in with the given token.
    Authenticated(AuthToken),
}

impl IdentityScope {
    /// Scope for an optional raw token; missing or blank tokens are guests.
    #[must_use]
    pub fn from_token(token: Option<&str>) -> Self {
        token
            .and_then(AuthToken::parse)
            .map_or(Self::Guest, Self::Authenticated)
    }

    /// Whether this is the guest scope.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// Storage key for this scope; safe to log.
    #[must_use]
    pub fn storage_key(&self) -> String {
        key_for(self)
    }
}

/// Publishes the current identity to the cart engine.
///
/// Logging in or out replaces the published scope; subscribers observe the
/// latest value. Registering an account does not log the shopper in, so it
/// publishes nothing.
#[derive(Debug)]
pub struct IdentityProvider {
    tx: watch::Sender<IdentityScope>,
}

impl IdentityProvider {
    /// Create a provider starting at `initial`.
    #[must_use]
    pub fn new(initial: IdentityScope) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a login. A blank token publishes the guest scope.
    pub fn login(&self, token: &str) -> IdentityScope {
        let scope = IdentityScope::from_token(Some(token));
        tracing::info!(scope = %scope.storage_key(), "Identity changed: login");
        self.tx.send_replace(scope.clone());
        scope
    }

    /// Publish a logout.
    pub fn logout(&self) {
        tracing::info!("Identity changed: logout");
        self.tx.send_replace(IdentityScope::Guest);
    }

    /// The currently published scope.
    #[must_use]
    pub fn current(&self) -> IdentityScope {
        self.tx.borrow().clone()
    }

    /// Subscribe to scope changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IdentityScope> {
        self.tx.subscribe()
    }
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new(IdentityScope::Guest)
    }
}
