//! Cart persistence across restarts and identity changes.

#![allow(clippy::unwrap_used)]

use forkful_core::{ItemId, Money};
use forkful_integration_tests::TestContext;
use serde_json::Value;

const PIZZA: ItemId = ItemId::new(1);
const BIRYANI: ItemId = ItemId::new(2);
const MOMOS: ItemId = ItemId::new(3);

#[tokio::test]
async fn guest_cart_survives_restart() {
    let ctx = TestContext::new();

    let state = ctx.open().await;
    state.add_to_cart(PIZZA, 1).await.unwrap();
    state.add_to_cart(PIZZA, 1).await.unwrap();
    state.shutdown().await;
    drop(state);

    let state = ctx.open().await;
    let lines = state.cart_lines().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity, 2);
    assert_eq!(state.totals().await.subtotal, Money::from_minor(59_800));
}

#[tokio::test]
async fn snapshot_uses_browser_layout() {
    let ctx = TestContext::new();

    let state = ctx.open().await;
    state.add_to_cart(MOMOS, 3).await.unwrap();
    state.shutdown().await;

    let raw = ctx.raw("cart_guest").unwrap();
    let json: Value = serde_json::from_str(&raw).unwrap();
    let line = json.get(0).unwrap();
    assert_eq!(line.get("id").and_then(Value::as_i64), Some(3));
    assert_eq!(line.get("name").and_then(Value::as_str), Some("Veg Momos"));
    assert_eq!(line.get("price").and_then(Value::as_u64), Some(15_900));
    assert_eq!(line.get("qty").and_then(Value::as_u64), Some(3));
    assert!(line.get("image").is_some());
}

#[tokio::test]
async fn login_does_not_merge_guest_cart() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.add_to_cart(PIZZA, 1).await.unwrap();
    state.login("alice-session-token-0123456789").await;
    assert!(state.cart_lines().await.is_empty());

    state.add_to_cart(BIRYANI, 2).await.unwrap();
    state.shutdown().await;

    // Guest snapshot is left where it was.
    assert!(ctx.raw("cart_guest").unwrap().contains("\"id\":1"));
    let alice = ctx.raw("cart_alice-session-to").unwrap();
    assert!(alice.contains("\"id\":2"));
    assert!(!alice.contains("\"id\":1"));
}

#[tokio::test]
async fn logout_restores_guest_cart_and_keeps_shopper_cart() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.add_to_cart(PIZZA, 1).await.unwrap();
    state.login("bob").await;
    state.add_to_cart(BIRYANI, 1).await.unwrap();

    state.logout().await;
    let guest = state.cart_lines().await;
    assert_eq!(guest.len(), 1);
    assert_eq!(guest.first().unwrap().item_id, PIZZA);

    state.login("bob").await;
    let bob = state.cart_lines().await;
    assert_eq!(bob.len(), 1);
    assert_eq!(bob.first().unwrap().item_id, BIRYANI);
}

#[tokio::test]
async fn session_token_survives_restart() {
    let ctx = TestContext::new();

    let state = ctx.open().await;
    state.login("carol").await;
    state.add_to_cart(MOMOS, 1).await.unwrap();
    state.shutdown().await;
    drop(state);

    let state = ctx.open().await;
    assert_eq!(
        state.store().lock().await.scope().storage_key(),
        "cart_carol"
    );
    assert_eq!(state.cart_lines().await.len(), 1);

    state.logout().await;
    state.shutdown().await;
    drop(state);

    let state = ctx.open().await;
    assert!(state.store().lock().await.scope().is_guest());
    assert!(state.cart_lines().await.is_empty());
}

#[tokio::test]
async fn shoppers_are_isolated() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.login("dave").await;
    state.add_to_cart(PIZZA, 4).await.unwrap();
    state.login("erin").await;
    state.add_to_cart(PIZZA, 1).await.unwrap();
    assert!(state.remove_from_cart(PIZZA).await.unwrap());
    state.shutdown().await;

    let dave = ctx.raw("cart_dave").unwrap();
    assert!(dave.contains("\"qty\":4"));
    assert_eq!(ctx.raw("cart_erin").as_deref(), Some("[]"));
    assert!(ctx.raw("cart_guest").is_none());
}

#[tokio::test]
async fn token_named_guest_gets_its_own_cart() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.add_to_cart(PIZZA, 2).await.unwrap();
    state.login("guest").await;
    assert!(state.cart_lines().await.is_empty());
    state.add_to_cart(BIRYANI, 1).await.unwrap();
    state.clear_cart().await.unwrap();
    state.shutdown().await;

    assert_eq!(ctx.raw("cart_~guest").as_deref(), Some("[]"));
    let guest = ctx.raw("cart_guest").unwrap();
    assert!(guest.contains("\"qty\":2"));
}

#[tokio::test]
async fn tokens_differing_in_case_are_isolated() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.login("Frank").await;
    state.add_to_cart(PIZZA, 1).await.unwrap();
    state.login("frank").await;
    assert!(state.cart_lines().await.is_empty());
    state.add_to_cart(MOMOS, 2).await.unwrap();
    state.shutdown().await;
    drop(state);

    let state = ctx.open().await;
    let lines = state.cart_lines().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().item_id, MOMOS);
    assert!(ctx.raw("cart_Frank").unwrap().contains("\"id\":1"));
}

#[tokio::test]
async fn login_published_on_provider_moves_next_mutation() {
    let ctx = TestContext::new();
    let state = ctx.open().await;

    state.identity().login("grace");
    state.add_to_cart(BIRYANI, 1).await.unwrap();
    state.shutdown().await;

    assert!(ctx.raw("cart_grace").unwrap().contains("\"id\":2"));
    assert!(ctx.raw("cart_guest").is_none());
}
