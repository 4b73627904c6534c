//! Checkout: turning the active cart into a confirmed order.
//!
//! The payment step is delegated to a [`PaymentGateway`]. The cart is only
//! cleared once the gateway confirms; a declined, cancelled or unreachable
//! payment leaves it exactly as it was.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use forkful_core::{Cart, CartLine, OrderTotals, Surcharges};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::add_breadcrumb;
use crate::store::CartStore;

/// Failure reported by the payment collaborator.
///
/// Messages are shown to the shopper as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The payment was refused.
    #[error("{0}")]
    Declined(String),
    /// The shopper backed out.
    #[error("Payment was cancelled")]
    Cancelled,
    /// The collaborator could not be reached.
    #[error("{0}")]
    Unreachable(String),
}

/// Reasons an order could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("Your cart is empty")]
    EmptyCart,
    /// Another confirmation is still waiting on payment.
    #[error("An order is already being placed")]
    CheckoutInProgress,
    /// The payment collaborator refused or failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// What the payment collaborator is asked to confirm.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Lines being ordered, as they were when checkout started.
    pub lines: Vec<CartLine>,
    /// Totals for those lines.
    pub totals: OrderTotals,
}

/// Acknowledgement of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Collaborator-assigned reference.
    pub reference: String,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    /// Locally assigned order id.
    pub order_id: Uuid,
    /// When the payment was confirmed.
    pub placed_at: DateTime<Utc>,
    /// Collaborator reference for the payment.
    pub payment_reference: String,
    /// Lines that were ordered.
    pub lines: Vec<CartLine>,
    /// Totals that were charged.
    pub totals: OrderTotals,
}

/// External payment collaborator.
///
/// Resolves once, with either a confirmation or an error; there is no
/// progress reporting.
pub trait PaymentGateway: Send + Sync {
    /// Confirm payment for `order`.
    fn confirm(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<PaymentConfirmation, PaymentError>> + Send;
}

/// Gateway that approves every order; payment is collected on delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashOnDelivery;

impl PaymentGateway for CashOnDelivery {
    async fn confirm(&self, order: &OrderRequest) -> Result<PaymentConfirmation, PaymentError> {
        Ok(PaymentConfirmation {
            reference: format!("cod-{}", order.totals.grand_total.minor()),
        })
    }
}

/// Holds the in-flight flag until dropped.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Combines the cart with surcharges and finalizes orders.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutAggregator {
    surcharges: Surcharges,
}

impl CheckoutAggregator {
    /// Create an aggregator applying `surcharges`.
    #[must_use]
    pub const fn new(surcharges: Surcharges) -> Self {
        Self { surcharges }
    }

    /// Surcharges applied to every order.
    #[must_use]
    pub const fn surcharges(&self) -> &Surcharges {
        &self.surcharges
    }

    /// Totals for `cart` under `surcharges`.
    #[must_use]
    pub fn compute_order(cart: &Cart, surcharges: &Surcharges) -> OrderTotals {
        OrderTotals::compute(cart, surcharges)
    }

    /// Place an order for the active cart.
    ///
    /// Any identity change published since the last cart operation is applied
    /// first. The store lock is released while the gateway works, so the cart
    /// can still be read in the meantime, but its lines stay frozen until the
    /// payment resolves. On success the cart that placed the order is
    /// cleared, even if the shopper has since switched identity.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if the cart has no lines
    /// - `CheckoutError::CheckoutInProgress` if another confirmation is pending
    /// - `CheckoutError::Payment` if the gateway refused; the cart is unchanged
    #[instrument(skip_all)]
    pub async fn confirm_order<G: PaymentGateway>(
        &self,
        store: &Mutex<CartStore>,
        gateway: &G,
    ) -> Result<OrderReceipt, CheckoutError> {
        let (guard, origin, request) = {
            let mut store = store.lock().await;
            store.sync_identity().await;
            if store.cart().is_empty() {
                return Err(CheckoutError::EmptyCart);
            }
            let guard =
                InFlight::acquire(store.checkout_flag()).ok_or(CheckoutError::CheckoutInProgress)?;
            let request = OrderRequest {
                lines: store.cart().lines().to_vec(),
                totals: Self::compute_order(store.cart(), &self.surcharges),
            };
            (guard, store.scope().clone(), request)
        };

        add_breadcrumb("checkout", "Confirming order", None);
        info!(
            scope = %origin.storage_key(),
            lines = request.lines.len(),
            grand_total = %request.totals.grand_total,
            "Confirming order"
        );

        let confirmation = gateway
            .confirm(&request)
            .await
            .inspect_err(|e| warn!(error = %e, "Payment not confirmed; cart kept"))?;

        let receipt = OrderReceipt {
            order_id: Uuid::new_v4(),
            placed_at: Utc::now(),
            payment_reference: confirmation.reference,
            lines: request.lines,
            totals: request.totals,
        };

        {
            let mut store = store.lock().await;
            if *store.scope() == origin {
                store.complete_order();
            } else {
                store.writer().clear(&origin);
            }
        }
        drop(guard);

        info!(order_id = %receipt.order_id, "Order placed");
        add_breadcrumb("checkout", "Order placed", None);
        Ok(receipt)
    }
}
