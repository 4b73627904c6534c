//! Forkful CLI - a terminal storefront over the cart engine.
//!
//! # Usage
//!
//! ```bash
//! # Browse the menu
//! forkful menu
//!
//! # Fill the cart
//! forkful cart add 1 --qty 2
//! forkful cart set 1 3
//! forkful cart show
//!
//! # Switch to a logged-in cart, then back to the guest cart
//! forkful login --token <TOKEN>
//! forkful logout
//!
//! # Place the order (cash on delivery)
//! forkful checkout
//! ```
//!
//! Carts and the session token are kept under `FORKFUL_DATA_DIR`, so each
//! invocation resumes where the last one left off.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use forkful_core::ItemId;
use forkful_storefront::config::StorefrontConfig;
use forkful_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "forkful")]
#[command(author, version, about = "Forkful terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the menu
    Menu {
        /// Print the menu as YAML (usable as `FORKFUL_CATALOG_PATH`)
        #[arg(long)]
        yaml: bool,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in with a token from the login service
    Login {
        /// Authentication token
        #[arg(short, long)]
        token: String,
    },
    /// Log out and return to the guest cart
    Logout,
    /// Place the order for the current cart
    Checkout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a menu item
    Add {
        /// Menu item ID
        id: ItemId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Set an item's quantity (0 or less removes it)
    Set {
        /// Menu item ID
        id: ItemId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// Remove an item
    Remove {
        /// Menu item ID
        id: ItemId,
    },
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => return fail(&CliError::App(e.into())),
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "forkful_storefront=info,forkful_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

#[allow(clippy::print_stderr)]
fn fail(error: &CliError) -> ExitCode {
    error.report();
    eprintln!("error: {}", error.user_message());
    ExitCode::FAILURE
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::open(config).await?;

    let result = match cli.command {
        Commands::Menu { yaml } => commands::menu::list(&state, yaml),
        Commands::Cart { action } => match action {
            CartAction::Show => {
                commands::cart::show(&state).await;
                Ok(())
            }
            CartAction::Add { id, qty } => commands::cart::add(&state, id, qty).await,
            CartAction::Set { id, qty } => commands::cart::set(&state, id, qty).await,
            CartAction::Remove { id } => commands::cart::remove(&state, id).await,
            CartAction::Clear => commands::cart::clear(&state).await,
        },
        Commands::Login { token } => {
            commands::session::login(&state, &token).await;
            Ok(())
        }
        Commands::Logout => {
            commands::session::logout(&state).await;
            Ok(())
        }
        Commands::Checkout => commands::checkout::place_order(&state).await,
    };

    // Snapshots must land before the process exits.
    state.shutdown().await;
    result
}
