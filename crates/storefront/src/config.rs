//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_API_URL` - Base URL of the backend (auth + cart endpoints)
//!
//! ## Optional
//! - `SHOPFRONT_DATA_DIR` - Directory for the guest cart and saved session (default: .shopfront)
//! - `SHOPFRONT_SYNC_DEBOUNCE_MS` - Quiet period before a cart change is synced (default: 500)
//! - `SHOPFRONT_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `SHOPFRONT_TAX_RATE` - Tax as a fraction of the subtotal (default: 0.18)
//! - `SHOPFRONT_PLATFORM_FEE` - Flat fee per order (default: 20)
//! - `SHOPFRONT_CURRENCY` - ISO 4217 code for display (default: INR)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use shopfront_core::{CurrencyCode, SummaryRates};
use thiserror::Error;
use url::Url;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DATA_DIR: &str = ".shopfront";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Where the guest cart and saved session live
    pub data_dir: PathBuf,
    /// Cart synchronization tuning
    pub sync: SyncConfig,
    /// Timeout applied to every backend request
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Cart synchronization and checkout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last cart change before it is written out.
    pub debounce: Duration,
    /// Tax and fee rates for the order summary.
    pub rates: SummaryRates,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            rates: SummaryRates::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let api_url = env.parse_required::<Url>("SHOPFRONT_API_URL")?;
        let data_dir = PathBuf::from(env.or_default("SHOPFRONT_DATA_DIR", DEFAULT_DATA_DIR));
        let debounce_ms = env.parse_or("SHOPFRONT_SYNC_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        let timeout_secs = env.parse_or("SHOPFRONT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        let defaults = SummaryRates::default();
        let rates = SummaryRates {
            tax_rate: env.parse_or::<Decimal>("SHOPFRONT_TAX_RATE", defaults.tax_rate)?,
            platform_fee: env.parse_or::<Decimal>("SHOPFRONT_PLATFORM_FEE", defaults.platform_fee)?,
            currency: env.parse_or::<CurrencyCode>("SHOPFRONT_CURRENCY", defaults.currency)?,
        };

        if rates.tax_rate.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_TAX_RATE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            data_dir,
            sync: SyncConfig {
                debounce: Duration::from_millis(debounce_ms),
                rates,
            },
            http_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Path of the guest cart file.
    #[must_use]
    pub fn guest_cart_path(&self) -> PathBuf {
        self.data_dir.join("guest-cart.json")
    }

    /// Path of the saved login session.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a required variable.
    fn parse_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self
            .optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        parse_value(key, &value)
    }

    /// Parse an optional variable, falling back to a default when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map_or(Ok(default), |value| parse_value(key, &value))
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
