// =============================================================================
// Price series — the ordered numeric input shared by every analysis
// =============================================================================
//
// A `PriceSeries` is an immutable, strictly time-ordered run of finite
// samples. Window arithmetic downstream is index based, so timestamps only
// have to be increasing, not evenly spaced, and are not kept once checked.
// Growing buffers are prefixed at the candle level (`CandleSeries::prefix`).

use crate::error::AnalysisError;
use crate::types::SeriesKind;

/// Finite samples whose time index has been checked for strict order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    values: Vec<f64>,
}

impl PriceSeries {
    /// Build a series from parallel timestamp / value columns.
    ///
    /// Rejects mismatched lengths, non-increasing timestamps and non-finite
    /// values with [`AnalysisError::InvalidInput`].
    pub fn new(timestamps: &[i64], values: Vec<f64>) -> Result<Self, AnalysisError> {
        if timestamps.len() != values.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "timestamp/value length mismatch: {} vs {}",
                timestamps.len(),
                values.len()
            )));
        }

        if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AnalysisError::InvalidInput(format!(
                "timestamps must be strictly increasing (violated at index {})",
                i + 1
            )));
        }

        ensure_finite(&values, "values")?;

        Ok(Self { values })
    }

    /// Build a series indexed by sample position.
    pub fn from_values(values: Vec<f64>) -> Result<Self, AnalysisError> {
        ensure_finite(&values, "values")?;
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Reject any NaN or infinite sample, naming the offending column and index.
pub fn ensure_finite(values: &[f64], name: &str) -> Result<(), AnalysisError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(AnalysisError::InvalidInput(format!(
            "{name}[{i}] is not a finite number"
        ))),
        None => Ok(()),
    }
}

/// Number of samples `transform` consumes before producing its first output.
pub fn transform_warmup(kind: SeriesKind) -> usize {
    match kind {
        SeriesKind::Change => 0,
        SeriesKind::Price | SeriesKind::RandomWalk => 1,
    }
}

/// Turn levels into the increment series analysed by the Hurst estimator.
///
/// - `Price`      => `ln(x[t] / x[t-1])`, every sample must be > 0
/// - `RandomWalk` => `x[t] - x[t-1]`
/// - `Change`     => copied as given
pub fn transform(values: &[f64], kind: SeriesKind) -> Result<Vec<f64>, AnalysisError> {
    match kind {
        SeriesKind::Change => Ok(values.to_vec()),
        SeriesKind::RandomWalk => Ok(values.windows(2).map(|w| w[1] - w[0]).collect()),
        SeriesKind::Price => {
            if let Some(i) = values.iter().position(|&v| v <= 0.0) {
                return Err(AnalysisError::InvalidInput(format!(
                    "price series must be strictly positive for log returns (index {i} is {})",
                    values[i]
                )));
            }
            Ok(values.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
        }
    }
}
