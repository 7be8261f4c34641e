// =============================================================================
// Momentum & Rate of Change
// =============================================================================
//
// Momentum is the raw price change over a look-back window:
//   MOM = close - close_n
//
// ROC expresses the same move as a percentage of the older close:
//   ROC = ((close - close_n) / close_n) * 100
//
// Positive values indicate upward momentum; negative values downward.

/// Momentum series for `closes` over `window` bars.
///
/// Element `k` corresponds to `closes[k + window]`. Empty when `window` is
/// zero or there is not enough data.
pub fn calculate_momentum(closes: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || closes.len() <= window {
        return Vec::new();
    }

    closes
        .iter()
        .zip(&closes[window..])
        .map(|(old, new)| new - old)
        .collect()
}

/// Calculate the Rate of Change (ROC) for the given closing prices and period.
///
/// Element `k` corresponds to `closes[k + period]`. A zero reference close
/// yields 0.0 rather than an infinite value.
pub fn calculate_roc(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period);
    for i in period..closes.len() {
        let prev = closes[i - period];
        if prev == 0.0 {
            result.push(0.0);
        } else {
            result.push(((closes[i] - prev) / prev) * 100.0);
        }
    }
    result
}

/// Bar-to-bar fractional change, `close[i] / close[i-1] - 1`.
///
/// Element `k` corresponds to `closes[k + 1]`.
pub fn pct_change(closes: &[f64]) -> Vec<f64> {
    calculate_roc(closes, 1).into_iter().map(|p| p / 100.0).collect()
}

/// Return the most recent momentum value.
pub fn current_momentum(closes: &[f64], window: usize) -> Option<f64> {
    calculate_momentum(closes, window).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_basic() {
        let closes = [10.0, 11.0, 13.0, 12.0, 15.0];
        assert_eq!(calculate_momentum(&closes, 2), vec![3.0, 1.0, 3.0]);
        assert_eq!(current_momentum(&closes, 2), Some(3.0));
    }

    #[test]
    fn momentum_insufficient_data() {
        assert!(calculate_momentum(&[1.0, 2.0], 2).is_empty());
        assert!(calculate_momentum(&[1.0, 2.0, 3.0], 0).is_empty());
        assert_eq!(current_momentum(&[1.0], 5), None);
    }

    #[test]
    fn roc_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let roc = calculate_roc(&closes, 14);
        assert_eq!(roc.len(), 6);
        // From 1 to 15: ROC = (15-1)/1 * 100 = 1400%
        assert!((roc[0] - 1400.0).abs() < 1e-10);
    }

    #[test]
    fn roc_zero_reference() {
        assert_eq!(calculate_roc(&[0.0, 5.0], 1), vec![0.0]);
    }

    #[test]
    fn pct_change_basic() {
        let out = pct_change(&[100.0, 110.0, 99.0]);
        assert!((out[0] - 0.10).abs() < 1e-12);
        assert!((out[1] + 0.10).abs() < 1e-12);
    }
}
