// =============================================================================
// Playback Controller — replays a candle buffer one bar per tick
// =============================================================================
//
// The dashboard reveals the buffer progressively: a scheduled task calls
// `tick()` while playback runs, and every snapshot re-runs the analyses on
// the visible prefix. All state lives in `PlaybackState`; the analytic core
// only ever sees the immutable prefix slices.
//
// View rules:
//   running, or paused mid-playback  =>  candles[..cursor]
//   idle at cursor 0                 =>  candles[..scale]
//
// Pausing freezes the revealed prefix. Older single-script dashboards
// snapped back to `scale` candles (or to the whole buffer) whenever playback
// was not running; here only `reset()` returns to the `scale` view.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::{FractalDetector, FractalPoint, HurstConfig, HurstEstimator, HurstRegime, HurstResult};
use crate::analysis::fractal::FRACTAL_WINDOW;
use crate::indicators::mean_reversion::calculate_mean_reversion;
use crate::indicators::momentum::current_momentum;
use crate::indicators::sma::crossover_signals;
use crate::market_data::{Candle, CandleSeries};
use crate::types::TradeSignal;

// =============================================================================
// State
// =============================================================================

/// Cursor into the buffer plus the run flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub cursor: usize,
    pub is_running: bool,
}

/// Where the current buffer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Synthetic { seed: u64 },
    Binance { symbol: String, interval: String },
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic { seed } => write!(f, "synthetic(seed={seed})"),
            Self::Binance { symbol, interval } => write!(f, "binance({symbol} {interval})"),
        }
    }
}

/// Analysis parameters applied to every snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardParams {
    pub hurst: HurstConfig,
    /// Visible candles required before the Hurst exponent is shown.
    pub min_hurst_samples: usize,
    pub momentum_window: usize,
    pub mean_reversion_window: usize,
    pub sma_short: usize,
    pub sma_long: usize,
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self {
            hurst: HurstConfig::default(),
            min_hurst_samples: 100,
            momentum_window: 5,
            mean_reversion_window: 20,
            sma_short: 10,
            sma_long: 50,
        }
    }
}

// =============================================================================
// PlaybackController
// =============================================================================

pub struct PlaybackController {
    candles: CandleSeries,
    source: DataSource,
    state: PlaybackState,
    scale: usize,
}

impl PlaybackController {
    pub fn new(candles: CandleSeries, source: DataSource, scale: usize) -> Self {
        let scale = scale.min(candles.len());
        Self {
            candles,
            source,
            state: PlaybackState::default(),
            scale,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn candles(&self) -> &CandleSeries {
        &self.candles
    }

    pub fn is_finished(&self) -> bool {
        !self.candles.is_empty() && self.state.cursor >= self.candles.len()
    }

    /// Begin (or resume) playback. A finished playback restarts from the
    /// first bar. Returns `false` when nothing changed.
    pub fn start(&mut self) -> bool {
        if self.candles.is_empty() || self.state.is_running {
            return false;
        }
        if self.is_finished() {
            self.state.cursor = 0;
        }
        self.state.is_running = true;
        info!(cursor = self.state.cursor, source = %self.source, "Playback started");
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        info!(cursor = self.state.cursor, "Playback paused");
        true
    }

    pub fn reset(&mut self) -> bool {
        let changed = self.state != PlaybackState::default();
        self.state = PlaybackState::default();
        if changed {
            info!("Playback reset");
        }
        changed
    }

    /// Replace the buffer and reset the cursor. The scale is kept, clamped
    /// to the new length.
    pub fn load(&mut self, candles: CandleSeries, source: DataSource) {
        info!(count = candles.len(), source = %source, "Playback buffer loaded");
        self.scale = self.scale.min(candles.len());
        self.candles = candles;
        self.source = source;
        self.state = PlaybackState::default();
    }

    /// Set the idle view size, clamped to the buffer. Returns the value
    /// actually applied.
    pub fn set_scale(&mut self, scale: usize) -> usize {
        self.scale = scale.min(self.candles.len());
        debug!(requested = scale, applied = self.scale, "Playback scale set");
        self.scale
    }

    /// Advance one bar while running; reaching the end stops playback.
    /// Returns whether the state changed.
    pub fn tick(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }

        let len = self.candles.len();
        if self.state.cursor < len {
            self.state.cursor += 1;
        }
        if self.state.cursor >= len {
            self.state.is_running = false;
            info!(cursor = self.state.cursor, "Playback reached end of buffer");
        }
        true
    }

    /// Number of candles currently on display. A paused controller keeps
    /// showing `cursor` candles rather than falling back to `scale`.
    pub fn visible_len(&self) -> usize {
        if self.state.is_running || self.state.cursor > 0 {
            self.state.cursor.min(self.candles.len())
        } else {
            self.scale.min(self.candles.len())
        }
    }

    pub fn visible(&self) -> CandleSeries {
        self.candles.prefix(self.visible_len())
    }

    /// Run every analysis on the visible prefix.
    pub fn snapshot(&self, params: &DashboardParams) -> PlaybackSnapshot {
        let visible = self.visible();
        let highs = visible.highs();
        let lows = visible.lows();
        let closes = visible.closes();

        let mut messages = Vec::new();

        let fractals = if visible.len() >= FRACTAL_WINDOW {
            match FractalDetector::detect(&highs, &lows) {
                Ok(annotation) => Some(annotation.points()),
                Err(e) => {
                    messages.push(format!("fractals: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let hurst = if visible.len() >= params.min_hurst_samples {
            match HurstEstimator::new(params.hurst).estimate(&closes) {
                Ok(result) => Some(HurstView::from(result)),
                Err(e) => {
                    messages.push(format!("hurst: {e}"));
                    None
                }
            }
        } else {
            messages.push(format!(
                "hurst: waiting for {} candles, {} visible",
                params.min_hurst_samples,
                visible.len()
            ));
            None
        };

        let indicators = LatestIndicators {
            last_close: closes.last().copied(),
            momentum: current_momentum(&closes, params.momentum_window),
            mean_reversion: calculate_mean_reversion(&closes, params.mean_reversion_window)
                .last()
                .copied(),
            crossover: crossover_signals(&closes, params.sma_short, params.sma_long)
                .last()
                .copied(),
        };

        PlaybackSnapshot {
            source: self.source.clone(),
            state: self.state,
            scale: self.scale,
            total: self.candles.len(),
            visible: visible.len(),
            candles: visible.into_candles(),
            fractals,
            hurst,
            indicators,
            messages,
        }
    }
}

// =============================================================================
// Snapshot types
// =============================================================================

/// Hurst result with its interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HurstView {
    #[serde(flatten)]
    pub result: HurstResult,
    pub regime: HurstRegime,
    pub description: &'static str,
}

impl From<HurstResult> for HurstView {
    fn from(result: HurstResult) -> Self {
        let regime = result.regime();
        Self {
            result,
            regime,
            description: regime.description(),
        }
    }
}

/// Most recent value of each indicator over the visible prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatestIndicators {
    pub last_close: Option<f64>,
    pub momentum: Option<f64>,
    pub mean_reversion: Option<f64>,
    pub crossover: Option<TradeSignal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub source: DataSource,
    pub state: PlaybackState,
    pub scale: usize,
    pub total: usize,
    pub visible: usize,
    pub candles: Vec<Candle>,
    pub fractals: Option<Vec<FractalPoint>>,
    pub hurst: Option<HurstView>,
    pub indicators: LatestIndicators,
    /// Why an analysis is absent, if it is.
    pub messages: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================
