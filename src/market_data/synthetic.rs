// =============================================================================
// Synthetic series — seeded random walks for demos and offline playback
// =============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::market_data::candle::Candle;

pub const DEFAULT_SEED: u64 = 42;

/// Per-bar log-return volatility of [`candles`].
const CANDLE_VOLATILITY: f64 = 0.01;

/// Cumulative sum of `len` standard-normal draws.
pub fn random_walk(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut level = 0.0;
    let walk: Vec<f64> = (0..len)
        .map(|_| {
            let step: f64 = rng.sample(StandardNormal);
            level += step;
            level
        })
        .collect();

    debug!(len, seed, "synthetic random walk generated");
    walk
}

/// A strictly positive geometric random walk rendered as candles.
///
/// Each bar opens at the previous close; `high`/`low` are the max/min of
/// open and close. Open times start at 0 and advance by `step_ms`.
pub fn candles(len: usize, seed: u64, start_price: f64, step_ms: i64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);

    let step_ms = step_ms.max(1);
    let mut price = if start_price.is_finite() && start_price > 0.0 {
        start_price
    } else {
        1.0
    };

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let open = price;
        let z: f64 = rng.sample(StandardNormal);
        let close = open * (CANDLE_VOLATILITY * z).exp();
        let volume = rng.gen_range(100.0..10_000.0);
        let open_time = i as i64 * step_ms;

        out.push(Candle::new(
            open_time,
            open,
            open.max(close),
            open.min(close),
            close,
            volume,
            open_time + step_ms - 1,
        ));
        price = close;
    }

    debug!(len, seed, start_price, "synthetic candles generated");
    out
}
