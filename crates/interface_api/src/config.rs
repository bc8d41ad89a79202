//! API configuration

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use core_kernel::Currency;
use domain_ledger::{FeeSchedule, LedgerSettings, RetryPolicy, DEFAULT_PLATFORM_FEE_PERCENT};

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable
/// (`API_PORT`, `API_JWT_SECRET`, ...); unset fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Platform fee charged on primary purchases, in percent
    pub platform_fee_percent: Decimal,
    /// ISO code every wallet and property is denominated in
    pub currency: String,
    /// Attempts per command before giving up on write conflicts
    pub max_commit_attempts: u32,
    /// Backoff before the first retry, doubled on each further attempt
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/fractional_estate".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            platform_fee_percent: DEFAULT_PLATFORM_FEE_PERCENT,
            currency: "USD".to_string(),
            max_commit_attempts: 3,
            retry_base_delay_ms: 25,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ledger settings derived from the fee, currency and retry fields
    pub fn ledger_settings(&self) -> Result<LedgerSettings, config::ConfigError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e| config::ConfigError::Message(format!("API_CURRENCY: {}", e)))?;
        if self.platform_fee_percent < Decimal::ZERO || self.platform_fee_percent >= Decimal::ONE_HUNDRED {
            return Err(config::ConfigError::Message(format!(
                "API_PLATFORM_FEE_PERCENT must be in [0, 100), got {}",
                self.platform_fee_percent
            )));
        }
        if self.max_commit_attempts == 0 {
            return Err(config::ConfigError::Message(
                "API_MAX_COMMIT_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(LedgerSettings {
            currency,
            fees: FeeSchedule::from_percentage(self.platform_fee_percent),
            retry: RetryPolicy::new(
                self.max_commit_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_ledger_settings() {
        let settings = ApiConfig::default().ledger_settings().unwrap();
        assert_eq!(settings.currency, Currency::USD);
        assert_eq!(settings, LedgerSettings::default());
    }

    #[test]
    fn test_rejects_unknown_currency() {
        let config = ApiConfig {
            currency: "XYZ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.ledger_settings().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_fee() {
        let config = ApiConfig {
            platform_fee_percent: dec!(100),
            ..ApiConfig::default()
        };
        assert!(config.ledger_settings().is_err());
    }

    #[test]
    fn test_server_addr() {
        let config = ApiConfig {
            port: 9090,
            ..ApiConfig::default()
        };
        assert_eq!(config.server_addr(), "0.0.0.0:9090");
    }
}
