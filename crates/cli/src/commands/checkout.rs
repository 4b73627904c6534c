//! Order placement.

use forkful_storefront::checkout::CashOnDelivery;
use forkful_storefront::state::AppState;

use super::{CliError, print_lines};

/// Place the order for the current cart, paying on delivery.
///
/// # Errors
///
/// Returns an error if the cart is empty or an order is already pending.
#[allow(clippy::print_stdout)]
pub async fn place_order(state: &AppState) -> Result<(), CliError> {
    let receipt = state.place_order(&CashOnDelivery).await?;

    println!("Order {} placed", receipt.order_id);
    println!("{}", receipt.placed_at.format("%Y-%m-%d %H:%M UTC"));
    print_lines(&receipt.lines, &receipt.totals);
    println!("Pay {} on delivery", receipt.totals.grand_total);
    Ok(())
}
