use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

// ---------------------------------------------------------------------------
// CandleSeries -- validated, time-ordered candles
// ---------------------------------------------------------------------------

/// Ordered candles with strictly increasing `open_time`, finite prices and
/// `high >= low` on every bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, AnalysisError> {
        for (i, c) in candles.iter().enumerate() {
            let prices = [c.open, c.high, c.low, c.close];
            if prices.iter().any(|p| !p.is_finite()) {
                return Err(AnalysisError::InvalidInput(format!(
                    "candle {i} has a non-finite price"
                )));
            }
            if c.high < c.low {
                return Err(AnalysisError::InvalidInput(format!(
                    "candle {i} has high {} below low {}",
                    c.high, c.low
                )));
            }
        }

        if let Some(i) = candles
            .windows(2)
            .position(|w| w[1].open_time <= w[0].open_time)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "candle open times must be strictly increasing (violated at index {})",
                i + 1
            )));
        }

        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The first `n` candles (clamped to the length) as a series of their
    /// own. A prefix of a validated series is valid, so nothing is rechecked.
    pub fn prefix(&self, n: usize) -> CandleSeries {
        CandleSeries {
            candles: self.candles[..n.min(self.len())].to_vec(),
        }
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// Helper: Binance sends numeric values as JSON strings inside kline arrays.
pub fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(open_time: i64, close: f64) -> Candle {
        Candle::new(open_time, close, close + 1.0, close - 1.0, close, 100.0, open_time + 59_999)
    }

    #[test]
    fn columns_and_prefix() {
        let series = CandleSeries::new(
            (0..5).map(|i| sample_candle(i * 60_000, 100.0 + i as f64)).collect(),
        )
        .unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(series.closes(), vec![100.0, 101.0, 102.0, 103.0, 104.0]);
        assert_eq!(series.highs()[0], 101.0);
        assert_eq!(series.lows()[4], 103.0);
        let head = series.prefix(2);
        assert_eq!(head.closes(), vec![100.0, 101.0]);
        assert_eq!(head.into_candles()[1].open_time, 60_000);
        assert_eq!(series.prefix(99).len(), 5);
    }

    #[test]
    fn rejects_unordered_candles() {
        let err = CandleSeries::new(vec![sample_candle(60_000, 1.0), sample_candle(0, 2.0)])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn rejects_inverted_bar() {
        let mut c = sample_candle(0, 10.0);
        c.high = 5.0;
        assert!(CandleSeries::new(vec![c]).is_err());
    }

    #[test]
    fn rejects_nan_price() {
        let mut c = sample_candle(0, 10.0);
        c.close = f64::NAN;
        assert!(CandleSeries::new(vec![c]).is_err());
    }

    #[test]
    fn empty_is_valid() {
        let series = CandleSeries::default();
        assert!(series.is_empty());
        assert!(series.closes().is_empty());
    }

    #[test]
    fn parse_string_and_number() {
        assert_eq!(parse_string_f64(&serde_json::json!("1.5"), "x").unwrap(), 1.5);
        assert_eq!(parse_string_f64(&serde_json::json!(2.5), "x").unwrap(), 2.5);
        assert!(parse_string_f64(&serde_json::json!("abc"), "x").is_err());
        assert!(parse_string_f64(&serde_json::json!(null), "x").is_err());
    }
}
