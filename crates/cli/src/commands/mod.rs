//! Command implementations and shared rendering.

pub mod cart;
pub mod checkout;
pub mod menu;
pub mod session;

use forkful_core::{CartLine, OrderTotals};
use forkful_storefront::error::AppError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The storefront refused or failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// Output could not be rendered.
    #[error("Failed to render output: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl CliError {
    /// Message to show on the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::App(e) => e.user_message(),
            Self::Render(e) => e.to_string(),
        }
    }

    /// Log the error, capturing environmental failures to Sentry.
    pub fn report(&self) {
        match self {
            Self::App(e) => e.report(),
            Self::Render(e) => tracing::error!(error = %e, "Command output failed"),
        }
    }
}

/// Print cart lines followed by the totals breakdown.
#[allow(clippy::print_stdout)]
pub fn print_lines(lines: &[CartLine], totals: &OrderTotals) {
    for line in lines {
        println!(
            "{:>4}  x{:<4} {:<25} {:>12}",
            line.item_id.to_string(),
            line.quantity,
            line.name,
            line.line_total().to_string()
        );
    }
    println!("{:-<50}", "");
    print_amount("Subtotal", &totals.subtotal.to_string());
    print_amount("Delivery fee", &totals.delivery_fee.to_string());
    print_amount("Taxes & charges", &totals.taxes.to_string());
    print_amount("Total", &totals.grand_total.to_string());
}

#[allow(clippy::print_stdout)]
fn print_amount(label: &str, amount: &str) {
    println!("{label:<37} {amount:>12}");
}
