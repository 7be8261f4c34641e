// =============================================================================
// Runtime Configuration — analysis parameters with atomic save
// =============================================================================
//
// Every tunable parameter of the analysis service lives here so that it can
// be changed at runtime through the API without a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::HurstConfig;
use crate::market_data::binance::DEFAULT_BASE_URL;
use crate::market_data::synthetic::DEFAULT_SEED;
use crate::playback::DashboardParams;

/// Config file used when `FRACTAL_LAB_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "fractal_lab.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "BNBUSDT".to_string(),
        "XRPUSDT".to_string(),
        "ADAUSDT".to_string(),
    ]
}

fn default_intervals() -> Vec<String> {
    vec![
        "1m".to_string(),
        "5m".to_string(),
        "15m".to_string(),
        "1h".to_string(),
    ]
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_kline_limit() -> u32 {
    500
}

fn default_binance_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_playback_tick_ms() -> u64 {
    500
}

fn default_synthetic_length() -> usize {
    500
}

fn default_synthetic_seed() -> u64 {
    DEFAULT_SEED
}

fn default_initial_scale() -> usize {
    100
}

fn default_dashboard_min_hurst_samples() -> usize {
    100
}

fn default_momentum_window() -> usize {
    5
}

fn default_mean_reversion_window() -> usize {
    20
}

fn default_sma_short() -> usize {
    10
}

fn default_sma_long() -> usize {
    50
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Server --------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Market data ---------------------------------------------------------

    /// Symbols offered by the dashboard.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Kline intervals offered by the dashboard.
    #[serde(default = "default_intervals")]
    pub intervals: Vec<String>,

    /// Symbol used when `/playback/start` names none.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default = "default_interval")]
    pub default_interval: String,

    /// Klines requested per Binance fetch (capped at 1000 by Binance).
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,

    // --- Playback ------------------------------------------------------------

    /// Milliseconds between playback ticks.
    #[serde(default = "default_playback_tick_ms")]
    pub playback_tick_ms: u64,

    /// Length of the synthetic buffer loaded at startup.
    #[serde(default = "default_synthetic_length")]
    pub synthetic_length: usize,

    #[serde(default = "default_synthetic_seed")]
    pub synthetic_seed: u64,

    /// Candles shown while playback is idle.
    #[serde(default = "default_initial_scale")]
    pub initial_scale: usize,

    // --- Analysis ------------------------------------------------------------

    /// Visible candles required before the dashboard shows a Hurst exponent.
    #[serde(default = "default_dashboard_min_hurst_samples")]
    pub dashboard_min_hurst_samples: usize,

    #[serde(default)]
    pub hurst: HurstConfig,

    #[serde(default = "default_momentum_window")]
    pub momentum_window: usize,

    #[serde(default = "default_mean_reversion_window")]
    pub mean_reversion_window: usize,

    #[serde(default = "default_sma_short")]
    pub sma_short: usize,

    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            symbols: default_symbols(),
            intervals: default_intervals(),
            default_symbol: default_symbol(),
            default_interval: default_interval(),
            kline_limit: default_kline_limit(),
            binance_base_url: default_binance_base_url(),
            playback_tick_ms: default_playback_tick_ms(),
            synthetic_length: default_synthetic_length(),
            synthetic_seed: default_synthetic_seed(),
            initial_scale: default_initial_scale(),
            dashboard_min_hurst_samples: default_dashboard_min_hurst_samples(),
            hurst: HurstConfig::default(),
            momentum_window: default_momentum_window(),
            mean_reversion_window: default_mean_reversion_window(),
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            default_symbol = %config.default_symbol,
            hurst_kind = %config.hurst.kind,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// The subset of parameters every dashboard snapshot needs.
    pub fn dashboard_params(&self) -> DashboardParams {
        DashboardParams {
            hurst: self.hurst,
            min_hurst_samples: self.dashboard_min_hurst_samples,
            momentum_window: self.momentum_window,
            mean_reversion_window: self.mean_reversion_window,
            sma_short: self.sma_short,
            sma_long: self.sma_long,
        }
    }
}
