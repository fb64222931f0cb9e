//! # Host Configuration
//!
//! Layered configuration for the script host: built-in defaults, then an
//! optional TOML file, then `SCRIPT_HOST__*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use pmm_core::MarketInfo;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use script_engine::{RuntimeConfig, DEFAULT_MID_PRICE_HISTORY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of environment overrides, e.g. `SCRIPT_HOST__TICK_INTERVAL_MS=500`.
pub const ENV_PREFIX: &str = "SCRIPT_HOST";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where the script runs relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingModel {
    /// Hooks run synchronously inside host calls
    InProcess,
    /// Script runs on its own thread behind channels
    CrossProcess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub model: SchedulingModel,
    /// Script manifest to load at startup
    pub script: Option<PathBuf>,
    pub exchange: String,
    pub trading_pair: String,
    pub tick_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub live_interval_ms: u64,
    /// How long shutdown waits for a cross-process script to stop
    pub shutdown_timeout_ms: u64,
    pub mid_price_history: usize,
    /// First mid price of the paper market
    pub start_price: Decimal,
    /// Seed of the paper market's price walk
    pub price_seed: u64,
    pub log_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            model: SchedulingModel::CrossProcess,
            script: None,
            exchange: "paper".to_string(),
            trading_pair: "ETH-USDT".to_string(),
            tick_interval_ms: 1_000,
            poll_interval_ms: 100,
            live_interval_ms: 1_000,
            shutdown_timeout_ms: 5_000,
            mid_price_history: DEFAULT_MID_PRICE_HISTORY,
            start_price: dec!(2000),
            price_seed: 42,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl HostConfig {
    /// Loads defaults, then `path` (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&HostConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: HostConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.trading_pair.split('-').filter(|part| !part.is_empty()).count() != 2 {
            return Err(ConfigError::Invalid(format!(
                "trading_pair `{}` must look like BASE-QUOTE",
                self.trading_pair
            )));
        }
        if self.start_price <= Decimal::ZERO {
            return Err(ConfigError::Invalid("start_price must be positive".into()));
        }
        self.runtime()
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            live_interval: Duration::from_millis(self.live_interval_ms),
            mid_price_history: self.mid_price_history,
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }

    pub fn market_info(&self) -> MarketInfo {
        MarketInfo::new(self.exchange.clone(), self.trading_pair.clone())
    }
}
