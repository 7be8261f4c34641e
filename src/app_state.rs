// =============================================================================
// Central Application State — fractal-lab analysis service
// =============================================================================
//
// Ties the playback controller, the runtime configuration and the Binance
// client together and provides a unified snapshot for the REST API and the
// WebSocket feed.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared state. Locks are never held
//     across an `.await`.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::{synthetic, BinanceClient, CandleSeries};
use crate::playback::{DataSource, PlaybackController, PlaybackSnapshot};
use crate::runtime_config::RuntimeConfig;

/// Start price of the synthetic startup buffer.
const SYNTHETIC_START_PRICE: f64 = 100.0;
/// Bar spacing of the synthetic startup buffer (one minute).
const SYNTHETIC_STEP_MS: i64 = 60_000;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// visible change so WebSocket clients know when to re-render.
    pub state_version: AtomicU64,

    /// Sequence number stamped on outgoing WebSocket messages.
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub config_path: PathBuf,

    // ── Data & playback ─────────────────────────────────────────────────
    pub playback: RwLock<PlaybackController>,
    pub binance: BinanceClient,

    // ── Diagnostics ─────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state with a synthetic buffer so the dashboard has data
    /// before any Binance fetch.
    pub fn new(config: RuntimeConfig, config_path: impl Into<PathBuf>) -> Result<Self> {
        let binance = BinanceClient::new(config.binance_base_url.clone())?;

        let candles = CandleSeries::new(synthetic::candles(
            config.synthetic_length,
            config.synthetic_seed,
            SYNTHETIC_START_PRICE,
            SYNTHETIC_STEP_MS,
        ))
        .context("synthetic startup buffer is invalid")?;

        let playback = PlaybackController::new(
            candles,
            DataSource::Synthetic {
                seed: config.synthetic_seed,
            },
            config.initial_scale,
        );

        Ok(Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            playback: RwLock::new(playback),
            binance,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        })
    }

    // ── Version Tracking ────────────────────────────────────────────────

    /// Bump the state version, returning the previous value.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    pub fn next_sequence(&self) -> u64 {
        self.ws_sequence_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Playback ────────────────────────────────────────────────────────

    /// Apply `f` to the playback controller and bump the version when it
    /// reports a change.
    pub fn update_playback<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PlaybackController) -> bool,
    {
        let changed = f(&mut *self.playback.write());
        if changed {
            self.increment_version();
        }
        changed
    }

    /// Advance playback by one bar (called by the scheduled tick task).
    pub fn tick_playback(&self) -> bool {
        self.update_playback(PlaybackController::tick)
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build the payload served by `GET /api/v1/playback` and pushed over
    /// the WebSocket feed.
    pub fn build_snapshot(&self) -> DashboardSnapshot {
        let version = self.current_state_version();
        let params = self.runtime_config.read().dashboard_params();
        let playback = self.playback.read().snapshot(&params);

        DashboardSnapshot {
            version,
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            playback,
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Snapshot types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub version: u64,
    /// Unix milliseconds.
    pub server_time: i64,
    pub uptime_secs: u64,
    pub playback: PlaybackSnapshot,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let config = RuntimeConfig {
            synthetic_length: 120,
            initial_scale: 40,
            ..RuntimeConfig::default()
        };
        AppState::new(config, "unused.json").unwrap()
    }

    #[test]
    fn starts_with_synthetic_buffer() {
        let state = state();
        let snap = state.build_snapshot();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.playback.total, 120);
        assert_eq!(snap.playback.visible, 40);
        assert_eq!(snap.playback.source, DataSource::Synthetic { seed: 42 });
    }

    #[test]
    fn tick_bumps_version_only_on_change() {
        let state = state();
        assert!(!state.tick_playback());
        assert_eq!(state.current_state_version(), 1);

        assert!(state.update_playback(PlaybackController::start));
        assert!(state.tick_playback());
        assert_eq!(state.current_state_version(), 3);
        assert_eq!(state.build_snapshot().playback.visible, 1);
    }

    #[test]
    fn error_ring_is_capped() {
        let state = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 5");
    }

    #[test]
    fn sequence_numbers_increase() {
        let state = state();
        assert_eq!(state.next_sequence(), 1);
        assert_eq!(state.next_sequence(), 2);
    }
}
