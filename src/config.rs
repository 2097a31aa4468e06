//! Terminal configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use crate::engine::EnginePolicy;
use std::env;
use std::path::PathBuf;

const LOW_STOCK_VAR: &str = "CREW_STORE_LOW_STOCK_THRESHOLD";

/// Terminal configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory of the file-backed key-value store
    pub data_dir: PathBuf,

    /// Restock items when an order is refunded
    pub restock_on_refund: bool,

    /// Let sales drive stock below zero
    pub allow_oversell: bool,

    /// Stock level below which a product is flagged as running low
    pub low_stock_threshold: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./crew-store-data"),
            restock_on_refund: true,
            allow_oversell: true,
            low_stock_threshold: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            data_dir: lookup("CREW_STORE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            restock_on_refund: parse_flag(&lookup, "CREW_STORE_RESTOCK_ON_REFUND")?
                .unwrap_or(defaults.restock_on_refund),

            allow_oversell: parse_flag(&lookup, "CREW_STORE_ALLOW_OVERSELL")?
                .unwrap_or(defaults.allow_oversell),

            low_stock_threshold: match lookup(LOW_STOCK_VAR) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(LOW_STOCK_VAR.to_string()))?,
                None => defaults.low_stock_threshold,
            },
        })
    }

    pub fn policy(&self) -> EnginePolicy {
        EnginePolicy {
            restock_on_refund: self.restock_on_refund,
            allow_oversell: self.allow_oversell,
        }
    }
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name.to_string())),
        },
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
