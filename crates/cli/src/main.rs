//! Shopfront CLI - Cart editing, login, and checkout from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with its order summary
//! shop-cli cart show
//!
//! # Add two units of a product
//! shop-cli cart add 64f1c2ab -q 2
//!
//! # Create an account, then verify the email it was sent to
//! shop-cli signup --name Asha -e asha@example.com
//!
//! # Log in; the guest cart is merged into the account cart
//! shop-cli login -e asha@example.com
//!
//! # Place an order
//! shop-cli cart checkout --name Asha --email asha@example.com --address "12 MG Road"
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit the cart, place an order
//! - `signup` - Create an account
//! - `login` / `logout` - Switch between account and guest cart
//!
//! Every command syncs the cart before exiting, so edits are not left
//! waiting out the debounce window.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_core::PaymentMethod;
use shopfront_storefront::StorefrontConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Shopfront cart from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    /// Create an account
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and merge the guest cart into the account cart
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out; the account cart stays on the server
    Logout,
}

#[derive(Subcommand)]
enum CartCommand {
    /// Print the cart and order summary
    Show {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add units of a product
    Add {
        /// Product id
        product: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        product: String,
    },
    /// Set the quantity of a product already in the cart
    Update {
        /// Product id
        product: String,

        /// New quantity
        quantity: u32,
    },
    /// Apply a coupon code
    Coupon {
        /// Coupon code
        code: String,
    },
    /// Empty the cart
    Clear,
    /// Re-read the account cart from the server
    Refresh,
    /// Place an order for the whole cart
    Checkout {
        /// Recipient name
        #[arg(long)]
        name: String,

        /// Contact email
        #[arg(long)]
        email: String,

        /// Shipping address
        #[arg(long)]
        address: String,

        /// `card` or `cod`
        #[arg(long, default_value = "card")]
        payment: PaymentMethod,
    },
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

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Exit status for a missing or malformed configuration.
const CONFIG_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::from(CONFIG_EXIT);
        }
    };

    // Sentry must be initialized before the tracing subscriber, and the
    // guard must outlive any reported error so the event is sent
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match commands::run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            tracing::error!("Command failed: {e}");
            ExitCode::from(e.exit_status())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_signup_reads_all_fields() {
        let cli = Cli::try_parse_from([
            "shop-cli", "signup", "--name", "Asha", "-e", "asha@example.com", "-p", "secret",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Signup { ref name, ref email, .. }
                if name == "Asha" && email == "asha@example.com"
        ));
    }
}
