// =============================================================================
// Binance REST API Client — public market data only
// =============================================================================
//
// Only the unsigned klines endpoint is used. Nothing here needs an API key.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::market_data::candle::{parse_string_f64, Candle};

/// Default Binance REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Intervals the dashboard offers; others are passed through with a warning.
pub const SUPPORTED_INTERVALS: &[&str] = &["1m", "5m", "15m", "1h"];

/// Binance caps `limit` at 1000 klines per request.
const MAX_KLINE_LIMIT: u32 = 1000;

/// Binance REST client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /api/v3/klines (public, no signature required).
    ///
    /// Returns candles oldest-first, as Binance orders them.
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        if !SUPPORTED_INTERVALS.contains(&interval) {
            warn!(interval = %interval, "unsupported kline interval requested -- passing through");
        }
        let limit = limit.clamp(1, MAX_KLINE_LIMIT);

        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol.to_uppercase(),
            interval,
            limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

/// Parse Binance's array-of-arrays klines payload.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, ...
///
/// Rows that are too short or carry unparseable numbers are skipped.
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for (i, entry) in raw.iter().enumerate() {
        match parse_kline_row(entry) {
            Ok(candle) => candles.push(candle),
            Err(e) => warn!(row = i, error = %e, "skipping malformed kline entry"),
        }
    }
    Ok(candles)
}

fn parse_kline_row(entry: &serde_json::Value) -> Result<Candle> {
    let arr = entry.as_array().context("kline entry is not an array")?;
    if arr.len() < 7 {
        anyhow::bail!("kline entry has {} elements, expected at least 7", arr.len());
    }

    let open_time = arr[0].as_i64().context("missing open time")?;
    let open = parse_string_f64(&arr[1], "open")?;
    let high = parse_string_f64(&arr[2], "high")?;
    let low = parse_string_f64(&arr[3], "low")?;
    let close = parse_string_f64(&arr[4], "close")?;
    let volume = parse_string_f64(&arr[5], "volume")?;
    let close_time = arr[6].as_i64().context("missing close time")?;

    Ok(Candle::new(open_time, open, high, low, close, volume, close_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_klines_ok() {
        let body = serde_json::json!([
            [1700000000000_i64, "37000.00", "37050.00", "36990.00", "37020.00", "123.456",
             1700000059999_i64, "4567890.12", 1500, "60.123", "2224455.66", "0"],
            [1700000060000_i64, "37020.00", "37100.00", "37000.00", "37090.00", "99.0",
             1700000119999_i64, "1.0", 10, "1.0", "1.0", "0"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert!((candles[0].close - 37020.0).abs() < f64::EPSILON);
        assert!((candles[1].high - 37100.0).abs() < f64::EPSILON);
        assert_eq!(candles[1].close_time, 1_700_000_119_999);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let body = serde_json::json!([
            [1, "1.0", "2.0"],
            [2, "1.0", "2.0", "0.5", "nan?", "1", 3],
            "not an array",
            [4, "1.0", "2.0", "0.5", "1.5", "10", 5]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 4);
    }

    #[test]
    fn non_array_body_is_error() {
        let body = serde_json::json!({ "code": -1121, "msg": "Invalid symbol." });
        assert!(parse_klines(&body).is_err());
    }

    #[test]
    fn base_url_is_normalised() {
        let client = BinanceClient::new("http://localhost:9999/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
