// =============================================================================
// Hurst Exponent — Rescaled Range (R/S) Analysis
// =============================================================================
//
// The Hurst exponent H characterises the long-term memory of a time series:
//
//   H > 0.55  =>  persistent (trending)
//   H ~ 0.50  =>  random walk
//   H < 0.45  =>  anti-persistent (mean-reverting)
//
// Algorithm:
//   1. Turn the input into increments according to its `SeriesKind`.
//   2. Pick window sizes ("scales") from MIN_SCALE up to n/2:
//        simplified  => 8, 16, 32, ...            (powers of two)
//        exhaustive  => floor(8 * 2^(k/4)), k>=0  (four per octave, deduped)
//   3. For each scale s, split the increments into floor(n/s) non-overlapping
//      chunks. For each chunk:
//        - cumulative deviation from the chunk mean
//        - R = max(cumulative) - min(cumulative)
//        - S = population standard deviation of the chunk
//        - R/S, skipping flat chunks (S == 0 up to rounding of the mean)
//      Average R/S over the chunks. A scale with no usable chunk is dropped.
//   4. Divide out the small-window bias: R/S of white noise grows slower
//      than sqrt(s) for short windows, which pushes a plain fit above 0.5.
//      Each average is multiplied by sqrt(s * pi / 2) / E[R/S](s), where
//      E[R/S](s) is the Anis-Lloyd expectation for i.i.d. Gaussian noise.
//      The factor tends to 1 as s grows.
//   5. OLS regression of ln(adjusted R/S) on ln(s). The slope is H.
//
// H is reported as fitted; it is not clamped to [0, 1].

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::analysis::regression::{fit_ols, LinearFit};
use crate::error::AnalysisError;
use crate::series::{ensure_finite, transform, transform_warmup};
use crate::types::SeriesKind;

/// Smallest window length used for R/S.
pub const MIN_SCALE: usize = 8;

/// Dense scales per doubling of the window length.
const SCALES_PER_OCTAVE: f64 = 4.0;

/// Half-width of the band around 0.5 read as a random walk.
const RANDOM_WALK_BAND: f64 = 0.05;

/// Estimator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HurstConfig {
    /// How the input series is turned into increments.
    #[serde(default)]
    pub kind: SeriesKind,
    /// Powers-of-two scales when true, four scales per octave otherwise.
    #[serde(default = "default_simplified")]
    pub simplified: bool,
}

fn default_simplified() -> bool {
    true
}

impl Default for HurstConfig {
    fn default() -> Self {
        Self {
            kind: SeriesKind::Price,
            simplified: true,
        }
    }
}

impl HurstConfig {
    /// Minimum input length accepted by [`HurstEstimator::estimate`].
    ///
    /// Two distinct scales are needed for the fit, and the second scale only
    /// fits when the increment series is at least twice as long:
    ///
    /// | simplified | scales | increments | + differencing |
    /// |------------|--------|------------|----------------|
    /// | true       | 8, 16  | 32         | 33             |
    /// | false      | 8, 9   | 18         | 19             |
    pub fn min_samples(&self) -> usize {
        let second_scale = if self.simplified {
            MIN_SCALE * 2
        } else {
            dense_scale(1)
        };
        2 * second_scale + transform_warmup(self.kind)
    }
}

/// How to read an estimated exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HurstRegime {
    /// Rises tend to be followed by rises.
    Persistent,
    /// No usable memory.
    RandomWalk,
    /// Rises tend to be followed by falls.
    AntiPersistent,
}

impl HurstRegime {
    pub fn from_exponent(h: f64) -> Self {
        if h > 0.5 + RANDOM_WALK_BAND {
            Self::Persistent
        } else if h < 0.5 - RANDOM_WALK_BAND {
            Self::AntiPersistent
        } else {
            Self::RandomWalk
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Persistent => "persistent: moves tend to continue in the same direction",
            Self::RandomWalk => "random walk: no clear tendency",
            Self::AntiPersistent => "anti-persistent: rises are often followed by falls",
        }
    }
}

impl std::fmt::Display for HurstRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistent => write!(f, "PERSISTENT"),
            Self::RandomWalk => write!(f, "RANDOM_WALK"),
            Self::AntiPersistent => write!(f, "ANTI_PERSISTENT"),
        }
    }
}

/// Outcome of one estimation.
///
/// `ln(fluctuations[i]) ≈ h * ln(scales[i]) + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HurstResult {
    /// Hurst exponent (slope of the log-log fit).
    pub h: f64,
    /// Intercept of the log-log fit.
    pub intercept: f64,
    /// Window lengths that contributed to the fit, ascending.
    pub scales: Vec<usize>,
    /// Bias-adjusted average R/S per entry of `scales`.
    pub fluctuations: Vec<f64>,
}

impl HurstResult {
    pub fn regime(&self) -> HurstRegime {
        HurstRegime::from_exponent(self.h)
    }

    /// `(ln scale, ln R/S)` pairs the line was fitted on.
    pub fn log_log_points(&self) -> Vec<(f64, f64)> {
        self.scales
            .iter()
            .zip(&self.fluctuations)
            .map(|(&s, &f)| ((s as f64).ln(), f.ln()))
            .collect()
    }

    pub fn fit(&self) -> LinearFit {
        LinearFit {
            slope: self.h,
            intercept: self.intercept,
        }
    }

    /// Fitted line evaluated at every `ln scale`.
    pub fn regression_line(&self) -> Vec<(f64, f64)> {
        let fit = self.fit();
        self.scales
            .iter()
            .map(|&s| {
                let x = (s as f64).ln();
                (x, fit.predict(x))
            })
            .collect()
    }
}

/// Rescaled-range Hurst estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HurstEstimator {
    config: HurstConfig,
}

impl HurstEstimator {
    pub fn new(config: HurstConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> HurstConfig {
        self.config
    }

    /// Estimate the Hurst exponent of `series`.
    ///
    /// Errors:
    /// - [`AnalysisError::InvalidInput`] for non-finite samples, or
    ///   non-positive samples when the kind is `Price`.
    /// - [`AnalysisError::InsufficientData`] when the series is shorter than
    ///   [`HurstConfig::min_samples`], or fewer than two scales survive the
    ///   zero-variance filter (e.g. a flat series).
    pub fn estimate(&self, series: &[f64]) -> Result<HurstResult, AnalysisError> {
        ensure_finite(series, "series")?;

        let required = self.config.min_samples();
        if series.len() < required {
            trace!(len = series.len(), required, "Hurst: insufficient data");
            return Err(AnalysisError::InsufficientData {
                what: "samples",
                required,
                actual: series.len(),
            });
        }

        let increments = transform(series, self.config.kind)?;
        let candidates = window_scales(increments.len(), self.config.simplified);

        let mut scales = Vec::with_capacity(candidates.len());
        let mut fluctuations = Vec::with_capacity(candidates.len());
        for scale in candidates {
            match average_rescaled_range(&increments, scale) {
                Some(rs) => {
                    scales.push(scale);
                    fluctuations.push(rs * small_window_adjustment(scale));
                }
                None => trace!(scale, "Hurst: every chunk flat, scale dropped"),
            }
        }

        let log_n: Vec<f64> = scales.iter().map(|&s| (s as f64).ln()).collect();
        let log_rs: Vec<f64> = fluctuations.iter().map(|rs| rs.ln()).collect();

        // Two distinct scales always give non-zero x-variance, so `None`
        // only happens below two points.
        let fit = fit_ols(&log_n, &log_rs).ok_or(AnalysisError::InsufficientData {
            what: "scales with non-zero variance",
            required: 2,
            actual: scales.len(),
        })?;

        debug!(
            hurst = format!("{:.4}", fit.slope),
            points = scales.len(),
            kind = %self.config.kind,
            simplified = self.config.simplified,
            "Hurst exponent computed"
        );

        Ok(HurstResult {
            h: fit.slope,
            intercept: fit.intercept,
            scales,
            fluctuations,
        })
    }
}

/// `floor(MIN_SCALE * 2^(k / SCALES_PER_OCTAVE))`.
fn dense_scale(k: usize) -> usize {
    (MIN_SCALE as f64 * 2f64.powf(k as f64 / SCALES_PER_OCTAVE)).floor() as usize
}

/// Candidate window lengths for an increment series of length `len`,
/// ascending, all within `[MIN_SCALE, len / 2]`.
pub fn window_scales(len: usize, simplified: bool) -> Vec<usize> {
    let max_scale = len / 2;
    let mut scales = Vec::new();

    if simplified {
        let mut scale = MIN_SCALE;
        while scale <= max_scale {
            scales.push(scale);
            scale *= 2;
        }
    } else {
        for k in 0.. {
            let scale = dense_scale(k);
            if scale > max_scale {
                break;
            }
            if scales.last() != Some(&scale) {
                scales.push(scale);
            }
        }
    }

    scales
}

/// Anis-Lloyd expected R/S of `n` i.i.d. Gaussian samples:
///
/// `Γ((n-1)/2) / (√π Γ(n/2)) * Σ_{i=1}^{n-1} √((n-i)/i)`
///
/// The gamma ratio follows `r(n+2) = r(n) * (n-1)/n` from `r(2) = √π` and
/// `r(3) = 2/√π`, which avoids overflowing Γ for long windows.
fn expected_noise_rescaled_range(n: usize) -> f64 {
    let pi_sqrt = std::f64::consts::PI.sqrt();
    let mut gamma_ratio = if n % 2 == 0 { pi_sqrt } else { 2.0 / pi_sqrt };
    let mut m = if n % 2 == 0 { 2 } else { 3 };
    while m < n {
        gamma_ratio *= (m - 1) as f64 / m as f64;
        m += 2;
    }

    let sum: f64 = (1..n).map(|i| ((n - i) as f64 / i as f64).sqrt()).sum();
    gamma_ratio / pi_sqrt * sum
}

/// Factor mapping the raw average R/S at `scale` onto the `sqrt(s)` line
/// white noise follows asymptotically.
fn small_window_adjustment(scale: usize) -> f64 {
    (scale as f64 * std::f64::consts::FRAC_PI_2).sqrt() / expected_noise_rescaled_range(scale)
}

/// Mean R/S over the non-overlapping chunks of length `scale`, or `None`
/// when every chunk has zero standard deviation.
fn average_rescaled_range(increments: &[f64], scale: usize) -> Option<f64> {
    let mut rs_sum = 0.0_f64;
    let mut valid_chunks = 0_usize;

    for chunk in increments.chunks_exact(scale) {
        if let Some(rs) = rescaled_range(chunk) {
            rs_sum += rs;
            valid_chunks += 1;
        }
    }

    (valid_chunks > 0).then(|| rs_sum / valid_chunks as f64)
}

fn rescaled_range(chunk: &[f64]) -> Option<f64> {
    let len = chunk.len() as f64;
    let mean = chunk.iter().sum::<f64>() / len;

    // Population σ.
    let variance = chunk.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / len;
    let std_dev = variance.sqrt();

    // Flat up to the rounding of the mean, measured against the chunk's own
    // magnitude.
    let mean_abs = chunk.iter().map(|x| x.abs()).sum::<f64>() / len;
    if std_dev <= len * f64::EPSILON * mean_abs {
        return None;
    }

    let mut running = 0.0_f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &x in chunk {
        running += x - mean;
        min = min.min(running);
        max = max.max(running);
    }

    Some((max - min) / std_dev)
}
