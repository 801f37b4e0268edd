//! Configuration
//!
//! Settings come from command line flags, falling back to environment variables and a
//! `.env` file in the working directory.

use std::{path::PathBuf, time::Duration};

use clap::Args;
use rusty_money::{Findable, iso::Currency};
use thiserror::Error;

use crate::{
    api::MarketplaceConfig,
    cart::{DEFAULT_NAMESPACE, JsonFileCartStorage},
    checkout::{AccessToken, Session},
    uuids::UserUuid,
};

/// Errors raised while interpreting configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The currency code is not a known ISO 4217 code.
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Marketplace API settings.
#[derive(Debug, Clone, Args)]
pub struct ApiConfig {
    /// Base URL of the marketplace API
    #[arg(long, env = "BAZAAR_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Bearer token of a signed-in buyer; checkout runs as a guest without it
    #[arg(long, env = "BAZAAR_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Identity of the signed-in buyer
    #[arg(long, env = "BAZAAR_USER_ID")]
    pub user_id: Option<UserUuid>,

    /// Request timeout in seconds
    #[arg(long, env = "BAZAAR_API_TIMEOUT_SECONDS", default_value_t = 30u64)]
    pub api_timeout_seconds: u64,
}

impl ApiConfig {
    /// Client settings.
    pub fn marketplace(&self) -> MarketplaceConfig {
        MarketplaceConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.api_timeout_seconds),
        }
    }

    /// Member session when both a token and a user id are configured, guest otherwise.
    pub fn session(&self) -> Session {
        match (&self.api_token, self.user_id) {
            (Some(token), Some(user)) if !token.trim().is_empty() => Session::Member {
                user,
                access_token: AccessToken::new(token.trim()),
            },
            _ => Session::Guest,
        }
    }
}

/// Local cart storage settings.
#[derive(Debug, Clone, Args)]
pub struct StorageConfig {
    /// Directory holding the persisted cart
    #[arg(long, env = "BAZAAR_DATA_DIR", default_value = ".bazaar")]
    pub data_dir: PathBuf,

    /// Namespace of the cart file inside the data directory
    #[arg(long, env = "BAZAAR_CART_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub cart_namespace: String,

    /// ISO 4217 code of the store currency
    #[arg(long, env = "BAZAAR_CURRENCY", default_value = "IDR")]
    pub currency: String,
}

impl StorageConfig {
    /// Store currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] if the code is not recognised.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        let code = self.currency.trim().to_ascii_uppercase();

        Currency::find(&code).ok_or(ConfigError::UnknownCurrency(code))
    }

    /// File storage for the cart.
    pub fn cart_storage(&self) -> JsonFileCartStorage {
        JsonFileCartStorage::new(&self.data_dir, &self.cart_namespace)
    }
}

/// Bazaar configuration
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Marketplace API settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Cart storage settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn flags_override_defaults() -> TestResult {
        let harness = Harness::try_parse_from([
            "bazaar",
            "--data-dir",
            "/tmp/bazaar",
            "--cart-namespace",
            "koperasi",
            "--currency",
            "usd",
            "--api-timeout-seconds",
            "5",
            "--log-format",
            "json",
        ])?;

        let config = harness.config;

        assert_eq!(config.storage.currency()?.iso_alpha_code, "USD");
        assert_eq!(
            config.storage.cart_storage().path(),
            PathBuf::from("/tmp/bazaar/koperasi.json")
        );
        assert_eq!(config.api.marketplace().timeout, Duration::from_secs(5));
        assert_eq!(config.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_an_error() -> TestResult {
        let harness = Harness::try_parse_from(["bazaar", "--currency", "XYZ1"])?;

        assert_eq!(
            harness.config.storage.currency(),
            Err(ConfigError::UnknownCurrency("XYZ1".to_string()))
        );

        Ok(())
    }

    #[test]
    fn session_needs_token_and_user() -> TestResult {
        let user = UserUuid::now_v7();
        let harness = Harness::try_parse_from([
            "bazaar",
            "--api-token",
            "secret",
            "--user-id",
            &user.to_string(),
        ])?;

        assert!(matches!(
            harness.config.api.session(),
            Session::Member { user: member, .. } if member == user
        ));

        let harness = Harness::try_parse_from(["bazaar", "--api-token", "secret"])?;

        assert_eq!(harness.config.api.session(), Session::Guest);

        Ok(())
    }
}
