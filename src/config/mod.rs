//! # Configuration Management Module
//!
//! Ledger configuration lives in a TOML file (default `tradeledger.toml`).
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - which key-value backend balances persist through
//! - [`LedgerConfig`] - reserved identifiers for the global and level balances
//! - [`CurrencySystem`] - how amounts are displayed and parsed
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! backend = "sled"
//! path = "./data/ledger"
//!
//! [ledger]
//! global_key = "global.money.sum"
//! level_key = "level.money.sum"
//!
//! [currency]
//! kind = "decimal"
//! name = "credit"
//! name_plural = "credits"
//! symbol = "¤"
//! decimals = 2
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Sections may be omitted; missing sections take their defaults.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::currency::CurrencySystem;
use crate::storage::{JsonFileStore, MemoryStore, SharedStore, SledStore};

/// Reserved identifier of the global balance.
pub const DEFAULT_GLOBAL_KEY: &str = "global.money.sum";

/// Identifier the level balance is stored under unless configured otherwise.
pub const DEFAULT_LEVEL_KEY: &str = "level.money.sum";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Sled,
    Json,
    /// Nothing survives the process; handy for dry runs.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for sled, file for json, ignored for memory.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sled,
            path: "./data/ledger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_global_key")]
    pub global_key: String,
    /// Identifier `TradeContext::open_level` (and the `settle` command) load.
    #[serde(default = "default_level_key")]
    pub level_key: String,
}

fn default_global_key() -> String {
    DEFAULT_GLOBAL_KEY.to_string()
}

fn default_level_key() -> String {
    DEFAULT_LEVEL_KEY.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            global_key: default_global_key(),
            level_key: default_level_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed level, defaulting to `Info` for unknown names.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub currency: CurrencySystem,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.ledger.global_key.is_empty() {
            return Err(anyhow!("ledger.global_key must not be empty"));
        }
        if config.ledger.level_key.is_empty() {
            return Err(anyhow!("ledger.level_key must not be empty"));
        }
        if config.ledger.level_key == config.ledger.global_key {
            return Err(anyhow!(
                "ledger.level_key must differ from ledger.global_key"
            ));
        }
        if let CurrencySystem::Decimal(decimal) = &config.currency {
            // 10^18 is the largest power of ten an i64 holds
            if decimal.decimals > 18 {
                return Err(anyhow!(
                    "currency.decimals must be at most 18, got {}",
                    decimal.decimals
                ));
            }
        }
        Ok(config)
    }

    /// Create a default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        std::fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))?;
        Ok(())
    }

    /// Open the configured storage backend.
    pub fn open_store(&self) -> Result<SharedStore> {
        let store: SharedStore = match self.storage.backend {
            StorageBackend::Sled => Arc::new(SledStore::open(&self.storage.path)?),
            StorageBackend::Json => Arc::new(JsonFileStore::open(&self.storage.path)?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}
