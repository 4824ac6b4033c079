//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the payment provider. Both halves are required together.
#[derive(Clone, Debug)]
pub struct PaymentKeys {
    pub key_id: String,
    pub key_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub privileged_emails: Vec<String>,
    pub payment_keys: Option<PaymentKeys>,
    pub payment_api_base: String,
    pub payment_currency: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Usage Limits ---
        let mut privileged_emails = parse_email_list(lookup("PRIVILEGED_EMAILS").as_deref());
        if let Some(owner) = lookup("OWNER_EMAIL").filter(|e| !e.trim().is_empty()) {
            privileged_emails.push(owner.trim().to_string());
        }

        // --- Payments ---
        let payment_keys = match (lookup("RAZORPAY_KEY_ID"), lookup("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(PaymentKeys { key_id, key_secret }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingVar("RAZORPAY_KEY_SECRET".to_string()))
            }
            (None, Some(_)) => return Err(ConfigError::MissingVar("RAZORPAY_KEY_ID".to_string())),
        };
        let payment_api_base = lookup("RAZORPAY_API_BASE")
            .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string());
        let payment_currency = lookup("PAYMENT_CURRENCY").unwrap_or_else(|| "INR".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            privileged_emails,
            payment_keys,
            payment_api_base,
            payment_currency,
        })
    }
}

/// Splits a comma separated list of addresses, dropping blanks.
fn parse_email_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
