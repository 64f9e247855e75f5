//! Loads per-exchange credentials from the environment.
//!
//! Grounded on `original_source/app/config.py`'s `get_required_env`: every credential is a
//! required environment variable, missing ones are a fatal [`ConfigError`] at startup rather
//! than a later panic, and the result is a typed struct rather than a loose dict.

use arb_instrument::ExchangeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(String),
}

/// Credentials and dial-in options for a single exchange, mirroring the keys the original's
/// per-exchange `api_keys` dict entries carry (`apiKey`/`secret`/`password`/`sandbox`/
/// `enableRateLimit`/`createMarketBuyOrderRequiresPrice`/`hostname`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub secret: String,
    pub password: Option<String>,
    pub sandbox: bool,
    pub enable_rate_limit: bool,
    pub create_market_buy_order_requires_price: bool,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub exchanges: HashMap<ExchangeId, ExchangeCredentials>,
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn flag_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Reads credentials for every exchange in `enabled` from `{PREFIX}_API_KEY`,
    /// `{PREFIX}_API_SECRET`, `{PREFIX}_PASSWORD`, `{PREFIX}_SANDBOX`, `{PREFIX}_HOSTNAME`.
    pub fn from_env(enabled: &[ExchangeId]) -> Result<Self, ConfigError> {
        let mut exchanges = HashMap::new();
        for &exchange in enabled {
            let prefix = env_prefix(exchange);
            let credentials = ExchangeCredentials {
                api_key: required_env(&format!("{prefix}_API_KEY"))?,
                secret: required_env(&format!("{prefix}_API_SECRET"))?,
                password: optional_env(&format!("{prefix}_PASSWORD")),
                sandbox: flag_env(&format!("{prefix}_SANDBOX"), false),
                enable_rate_limit: flag_env(&format!("{prefix}_ENABLE_RATE_LIMIT"), true),
                create_market_buy_order_requires_price: flag_env(
                    &format!("{prefix}_MARKET_BUY_REQUIRES_PRICE"),
                    false,
                ),
                hostname: optional_env(&format!("{prefix}_HOSTNAME")),
            };
            exchanges.insert(exchange, credentials);
        }
        Ok(Self { exchanges })
    }
}

fn env_prefix(exchange: ExchangeId) -> String {
    exchange.as_str().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_required_var_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var("OKX_API_KEY");
        }
        let err = Config::from_env(&[ExchangeId::Okx]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref var) if var == "OKX_API_KEY"));
    }

    #[test]
    fn reads_full_credentials_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("OKX_API_KEY", "key");
            std::env::set_var("OKX_API_SECRET", "secret");
            std::env::set_var("OKX_PASSWORD", "pw");
        }
        let config = Config::from_env(&[ExchangeId::Okx]).unwrap();
        let creds = &config.exchanges[&ExchangeId::Okx];
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.password.as_deref(), Some("pw"));
        unsafe {
            std::env::remove_var("OKX_API_KEY");
            std::env::remove_var("OKX_API_SECRET");
            std::env::remove_var("OKX_PASSWORD");
        }
    }
}
