//! Checkout from a populated cart through to a cleared snapshot.

#![allow(clippy::unwrap_used)]

use forkful_core::{ItemId, Money};
use forkful_integration_tests::TestContext;
use forkful_storefront::checkout::{
    CashOnDelivery, CheckoutError, OrderRequest, PaymentConfirmation, PaymentError, PaymentGateway,
};
use forkful_storefront::error::AppError;
use forkful_storefront::store::CartState;

struct Declines;

impl PaymentGateway for Declines {
    async fn confirm(&self, _: &OrderRequest) -> Result<PaymentConfirmation, PaymentError> {
        Err(PaymentError::Declined(
            "Your card has insufficient funds.".to_string(),
        ))
    }
}

#[tokio::test]
async fn guest_checkout_clears_cart_and_snapshot() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.add_to_cart(ItemId::new(1), 1).await.unwrap();
    state.add_to_cart(ItemId::new(4), 2).await.unwrap();
    state.shutdown().await;
    assert!(ctx.raw("cart_guest").is_some());

    let receipt = state.place_order(&CashOnDelivery).await.unwrap();
    assert_eq!(receipt.lines.len(), 2);
    assert_eq!(receipt.totals.subtotal, Money::from_minor(59_700));
    assert_eq!(receipt.totals.grand_total, Money::from_minor(66_200));

    assert_eq!(state.store().lock().await.state(), CartState::Empty);
    state.shutdown().await;
    assert!(ctx.raw("cart_guest").is_none());
}

#[tokio::test]
async fn shopper_checkout_resets_snapshot() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.login("frank").await;
    state.add_to_cart(ItemId::new(2), 1).await.unwrap();
    state.place_order(&CashOnDelivery).await.unwrap();
    state.shutdown().await;

    assert_eq!(ctx.raw("cart_frank").as_deref(), Some("[]"));
}

#[tokio::test]
async fn declined_payment_keeps_everything() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.add_to_cart(ItemId::new(3), 2).await.unwrap();
    state.shutdown().await;
    let before = ctx.raw("cart_guest").unwrap();

    let err = state.place_order(&Declines).await.unwrap_err();
    assert!(err.is_user_facing());
    assert_eq!(err.user_message(), "Your card has insufficient funds.");

    state.shutdown().await;
    assert_eq!(ctx.raw("cart_guest").unwrap(), before);
    assert_eq!(state.store().lock().await.state(), CartState::Populated);
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    let err = state.place_order(&CashOnDelivery).await.unwrap_err();
    assert!(matches!(err, AppError::Checkout(CheckoutError::EmptyCart)));
    assert!(state.cart_lines().await.is_empty());
}
