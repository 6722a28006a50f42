//! Configuration for the Textile Processing Ledger engine
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with TPL_ prefix
//!
//! The ledger settings are an explicit value handed to services at
//! construction rather than ambient global state.

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Main engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Ledger business settings
    pub ledger: LedgerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

/// Business settings consumed by the ledger services
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    /// Wastage percentage above which a program is flagged
    pub wastage_threshold_percent: Decimal,

    /// Tax rate applied to tax-registered bills
    pub tax_rate_percent: Decimal,

    /// Currency symbol used in notification messages and documents
    pub currency_symbol: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = std::env::var("TPL_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("ledger.wastage_threshold_percent", "15.00")?
            .set_default("ledger.tax_rate_percent", "5.00")?
            .set_default("ledger.currency_symbol", "₹")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (TPL_ prefix)
            .add_source(
                Environment::with_prefix("TPL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            wastage_threshold_percent: Decimal::from_str("15.00").expect("valid default"),
            tax_rate_percent: Decimal::from_str("5.00").expect("valid default"),
            currency_symbol: "₹".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ledger_settings() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.wastage_threshold_percent, Decimal::from(15));
        assert_eq!(settings.tax_rate_percent, Decimal::from(5));
        assert_eq!(settings.currency_symbol, "₹");
    }
}
