//! Command implementations.
//!
//! Each invocation restores the saved session, starts a [`CartSync`] against
//! the configured backend, runs one command, then flushes the cart and
//! writes the session back.

pub mod auth;
pub mod cart;
mod session_file;

use shopfront_core::EmailError;
use shopfront_storefront::{
    CartSync, FileStore, HttpApi, StorefrontConfig, SyncError,
};
use thiserror::Error;

use crate::{CartCommand, Commands};

/// The coordinator as wired up for the CLI.
pub type Cart = CartSync<HttpApi, FileStore>;

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::InvalidEmail(_) => 2,
            Self::Sync(_) | Self::Io(_) | Self::Json(_) => 1,
        }
    }

    /// Capture internal failures to Sentry.
    pub fn report(&self) {
        match self {
            Self::Sync(err) => err.report(),
            Self::Io(_) | Self::Json(_) => {
                sentry::capture_error(self);
            }
            Self::InvalidEmail(_) | Self::Usage(_) => {}
        }
    }
}

/// Run a command against a freshly started coordinator.
///
/// # Errors
///
/// Returns `CliError` if the command fails. The cart is still flushed and
/// the session saved.
pub async fn run(command: Commands, config: StorefrontConfig) -> Result<(), CliError> {
    let api = HttpApi::new(&config).map_err(SyncError::from)?;
    let store = FileStore::new(config.guest_cart_path());
    let session_path = config.session_path();
    let session = session_file::load(&session_path).await;

    let cart = CartSync::start(api, store, session, config.sync).await;

    let result = match command {
        Commands::Cart { action } => run_cart(&cart, action).await,
        Commands::Signup {
            name,
            email,
            password,
        } => auth::signup(&cart, &name, &email, password).await,
        Commands::Login { email, password } => auth::login(&cart, &email, password).await,
        Commands::Logout => {
            auth::logout(&cart).await;
            Ok(())
        }
    };

    if !cart.flush().await {
        tracing::warn!("Cart could not be synced; changes are kept locally");
    }
    session_file::save(&session_path, &cart.session()).await?;

    result
}

async fn run_cart(cart: &Cart, action: CartCommand) -> Result<(), CliError> {
    match action {
        CartCommand::Show { json } => cart::show(cart, json),
        CartCommand::Add { product, quantity } => {
            cart.add_item(product.as_str(), quantity);
            cart::show(cart, false)
        }
        CartCommand::Remove { product } => {
            cart::require_line(cart, &product)?;
            cart.remove_item(product.as_str());
            cart::show(cart, false)
        }
        CartCommand::Update { product, quantity } => cart::update(cart, &product, quantity),
        CartCommand::Coupon { code } => {
            cart.apply_coupon(code);
            cart::show(cart, false)
        }
        CartCommand::Clear => {
            cart.clear();
            cart::show(cart, false)
        }
        CartCommand::Refresh => cart::refresh(cart).await,
        CartCommand::Checkout {
            name,
            email,
            address,
            payment,
        } => cart::checkout(cart, name, email, address, payment).await,
    }
}

#[cfg(test)]
mod tests {
    use shopfront_storefront::AuthError;

    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(CliError::Usage("bad".to_string()).exit_status(), 2);
        assert_eq!(
            CliError::from(SyncError::from(AuthError::InvalidCredentials)).exit_status(),
            1
        );
        assert_eq!(
            CliError::from(std::io::Error::other("disk full")).exit_status(),
            1
        );
    }
}
