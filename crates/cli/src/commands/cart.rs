//! Cart inspection and mutation.

use forkful_core::{ItemId, QuantityUpdate};
use forkful_storefront::state::AppState;

use super::{CliError, print_lines};

/// Print the current cart.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState) {
    let lines = state.cart_lines().await;
    if lines.is_empty() {
        println!("Your cart is empty");
        return;
    }
    print_lines(&lines, &state.totals().await);
}

/// Add `qty` units of a menu item.
///
/// # Errors
///
/// Returns an error if the item is not on the menu or `qty` is zero.
#[allow(clippy::print_stdout)]
pub async fn add(state: &AppState, id: ItemId, qty: u32) -> Result<(), CliError> {
    let quantity = state.add_to_cart(id, qty).await?;
    let name = state
        .catalog()
        .get(id)
        .map_or_else(|| id.to_string(), |item| item.name.clone());
    println!("{name}: {quantity} in cart");
    Ok(())
}

/// Overwrite an item's quantity.
///
/// # Errors
///
/// Returns an error if `qty` is positive and the item is not in the cart.
#[allow(clippy::print_stdout)]
pub async fn set(state: &AppState, id: ItemId, qty: i64) -> Result<(), CliError> {
    match state.set_quantity(id, qty).await? {
        QuantityUpdate::Updated => println!("Item {id}: quantity set to {qty}"),
        QuantityUpdate::Removed => println!("Item {id}: removed"),
        QuantityUpdate::Unchanged => println!("Item {id}: not in cart"),
    }
    Ok(())
}

/// Remove an item.
///
/// # Errors
///
/// Returns an error if an order is being placed.
#[allow(clippy::print_stdout)]
pub async fn remove(state: &AppState, id: ItemId) -> Result<(), CliError> {
    if state.remove_from_cart(id).await? {
        println!("Item {id}: removed");
    } else {
        println!("Item {id}: not in cart");
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if an order is being placed.
#[allow(clippy::print_stdout)]
pub async fn clear(state: &AppState) -> Result<(), CliError> {
    state.clear_cart().await?;
    println!("Cart cleared");
    Ok(())
}
