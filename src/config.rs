//! Environment configuration.
//!
//! Values come from the process environment, after `.env` has been loaded by
//! the binary:
//! - `STOREFRONT_CURRENCY` (default `USD`)
//! - `STOREFRONT_RETURN_WINDOW_DAYS` (default `30`)
//! - `RUST_LOG` (default `info`)

use thiserror::Error;

use crate::domain::aggregates::ReturnPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {value:?} ({reason})")]
    Invalid { name: &'static str, value: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub currency: String,
    pub return_policy: ReturnPolicy,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            return_policy: ReturnPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let currency = match lookup("STOREFRONT_CURRENCY") {
            Some(raw) => {
                let code = raw.trim().to_uppercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(ConfigError::Invalid { name: "STOREFRONT_CURRENCY", value: raw, reason: "expected a 3-letter currency code" });
                }
                code
            }
            None => defaults.currency,
        };

        let return_policy = match lookup("STOREFRONT_RETURN_WINDOW_DAYS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(days) if days > 0 => ReturnPolicy::new(days),
                _ => return Err(ConfigError::Invalid { name: "STOREFRONT_RETURN_WINDOW_DAYS", value: raw, reason: "expected a positive number of days" }),
            },
            None => defaults.return_policy,
        };

        let log_filter = lookup("RUST_LOG").filter(|v| !v.trim().is_empty()).unwrap_or(defaults.log_filter);

        Ok(Self { currency, return_policy, log_filter })
    }
}
