//! Signup, login and logout commands.

use std::io::{self, Write};

use shopfront_core::Email;
use shopfront_storefront::{Credentials, LoginOutcome, Registration};

use super::{Cart, CliError};

/// Create an account and explain the verification step.
///
/// # Errors
///
/// Returns `CliError::InvalidEmail` for a malformed address,
/// `CliError::Usage` for a blank name, and `CliError::Sync` if the backend
/// refuses the sign-up.
pub async fn signup(
    cart: &Cart,
    name: &str,
    email: &str,
    password: String,
) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::Usage("Name must not be blank".to_string()));
    }
    let registration = Registration::new(name, Email::parse(email)?, password);
    let user = cart.register(&registration).await?;

    let mut out = io::stdout().lock();
    writeln!(out, "Account created for {}.", user.email)?;
    writeln!(out, "Check your inbox and verify the email before logging in.")?;
    Ok(())
}

/// Log in and report how the guest cart was folded in.
///
/// # Errors
///
/// Returns `CliError::InvalidEmail` for a malformed address and
/// `CliError::Sync` if the backend rejects the credentials.
pub async fn login(cart: &Cart, email: &str, password: String) -> Result<(), CliError> {
    let credentials = Credentials::new(Email::parse(email)?, password);
    let outcome = cart.login(&credentials).await?;

    let mut out = io::stdout().lock();
    match outcome {
        LoginOutcome::Merged {
            user,
            items,
            pushed,
        } => {
            writeln!(out, "Logged in as {}.", display_name(&user.name, &user.email))?;
            writeln!(out, "Account cart now has {items} line(s).")?;
            if !pushed {
                writeln!(out, "The merged cart will be uploaded on the next change.")?;
            }
        }
        LoginOutcome::Offline { user } => {
            writeln!(out, "Logged in as {}.", display_name(&user.name, &user.email))?;
            writeln!(
                out,
                "Account cart unavailable; keeping the guest cart on this device."
            )?;
        }
    }
    Ok(())
}

/// Sync pending edits and return to guest mode.
pub async fn logout(cart: &Cart) {
    let was_authenticated = cart.session().has_credentials();
    cart.logout().await;
    if was_authenticated {
        tracing::info!("Logged out");
    } else {
        tracing::info!("Not logged in");
    }
}

fn display_name<'a>(name: &'a str, email: &'a str) -> &'a str {
    if name.trim().is_empty() { email } else { name }
}
