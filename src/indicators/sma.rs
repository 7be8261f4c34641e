// =============================================================================
// Simple Moving Average Crossover
// =============================================================================
//
// Two SMAs of different length:
//   SMA_short > SMA_long   =>  BUY   (short-term trend above long-term)
//   SMA_short <= SMA_long  =>  SELL
//
// Signals start at the first bar where the long SMA is defined.

use serde::Serialize;

use crate::indicators::mean_reversion::rolling_mean;
use crate::types::TradeSignal;

/// A bar where the crossover position flips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossoverEvent {
    /// Index into the input closes.
    pub index: usize,
    pub signal: TradeSignal,
}

/// Crossover position for every bar from `long - 1` onwards.
///
/// Element `k` corresponds to `closes[k + long - 1]`. Empty when either
/// window is zero, `short >= long`, or there is not enough data.
pub fn crossover_signals(closes: &[f64], short: usize, long: usize) -> Vec<TradeSignal> {
    if short == 0 || short >= long || closes.len() < long {
        return Vec::new();
    }

    let sma_short = rolling_mean(closes, short);
    let sma_long = rolling_mean(closes, long);

    // Drop the leading short-SMA values that have no long-SMA partner.
    sma_short[long - short..]
        .iter()
        .zip(&sma_long)
        .map(|(s, l)| if s > l { TradeSignal::Buy } else { TradeSignal::Sell })
        .collect()
}

/// Bars where the crossover position changes, including the first defined
/// bar.
pub fn crossover_events(closes: &[f64], short: usize, long: usize) -> Vec<CrossoverEvent> {
    let signals = crossover_signals(closes, short, long);
    let offset = long.saturating_sub(1);

    let mut events: Vec<CrossoverEvent> = Vec::new();
    for (k, &signal) in signals.iter().enumerate() {
        if events.last().map(|e| e.signal) != Some(signal) {
            events.push(CrossoverEvent {
                index: k + offset,
                signal,
            });
        }
    }
    events
}
