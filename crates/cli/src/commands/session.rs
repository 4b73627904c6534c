//! Login and logout.

use forkful_storefront::state::AppState;

/// Switch to the cart of the shopper holding `token`.
#[allow(clippy::print_stdout)]
pub async fn login(state: &AppState, token: &str) {
    let scope = state.login(token).await;
    if scope.is_guest() {
        println!("Blank token; continuing as guest");
        return;
    }

    let lines = state.cart_lines().await;
    println!("Logged in ({} item(s) in your cart)", lines.len());
}

/// Switch back to the guest cart.
#[allow(clippy::print_stdout)]
pub async fn logout(state: &AppState) {
    state.logout().await;
    println!("Logged out; your cart is saved for next time");
}
