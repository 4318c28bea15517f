//! Configuration
//!
//! Store-wide settings loaded from YAML:
//!
//! ```yaml
//! currency: USD
//! tax_rate: 8%
//! commission_rate: 30%
//! payment_latency_ms: 2000
//! data_dir: ./data
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rusty_money::iso::Currency;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    ledger::Rates,
    payments::DEFAULT_LATENCY,
    pricing::{PricingError, Rate, parse_currency, parse_percentage, validate_rate},
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid currency or rate
    #[error("Invalid setting {setting}: {source}")]
    Invalid {
        /// Offending setting
        setting: &'static str,
        /// Underlying error
        source: PricingError,
    },
}

/// Raw YAML shape; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    currency: Option<String>,
    tax_rate: Option<String>,
    commission_rate: Option<String>,
    payment_latency_ms: Option<u64>,
    data_dir: Option<PathBuf>,
}

/// Store-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Currency checkout sells in; books priced otherwise are not sold
    pub currency: &'static Currency,

    /// Tax and commission rates
    pub rates: Rates,

    /// Simulated payment gateway latency
    pub payment_latency: Duration,

    /// Where [`crate::store::JsonFileStore`] keeps its documents
    pub data_dir: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: rusty_money::iso::USD,
            rates: Rates {
                tax: percent(8),
                commission: percent(30),
            },
            payment_latency: DEFAULT_LATENCY,
            data_dir: PathBuf::from("./data"),
        }
    }
}

fn percent(value: i64) -> Rate {
    Rate::from(rust_decimal::Decimal::new(value, 2))
}

impl LedgerConfig {
    /// Load settings from a YAML file, falling back to defaults for anything
    /// not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// currency or rate is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Parse settings from YAML text.
    ///
    /// # Errors
    ///
    /// See [`LedgerConfig::from_file`].
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_norway::from_str(yaml)?;

        Self::try_from(file)
    }
}

impl TryFrom<ConfigFile> for LedgerConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let defaults = Self::default();

        let currency = match file.currency {
            Some(code) => parse_currency(&code).map_err(invalid("currency"))?,
            None => defaults.currency,
        };

        let tax = match file.tax_rate {
            Some(rate) => checked_rate(&rate).map_err(invalid("tax_rate"))?,
            None => defaults.rates.tax,
        };

        let commission = match file.commission_rate {
            Some(rate) => checked_rate(&rate).map_err(invalid("commission_rate"))?,
            None => defaults.rates.commission,
        };

        Ok(Self {
            currency,
            rates: Rates { tax, commission },
            payment_latency: file
                .payment_latency_ms
                .map_or(defaults.payment_latency, Duration::from_millis),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
        })
    }
}

fn invalid(setting: &'static str) -> impl FnOnce(PricingError) -> ConfigError {
    move |source| ConfigError::Invalid { setting, source }
}

fn checked_rate(s: &str) -> Result<Rate, PricingError> {
    let rate = parse_percentage(s)?;

    validate_rate(&rate)?;

    Ok(rate)
}
