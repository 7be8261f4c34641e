// =============================================================================
// Rolling Mean & Mean-Reversion Deviation
// =============================================================================
//
// Deviation from the simple moving average:
//   DEV_t = close_t - SMA_t(window)
//
// Large positive deviations are stretched above the mean, large negative ones
// below it; a mean-reverting market pulls both back towards zero.

/// Simple moving average over `window` bars.
///
/// Element `k` corresponds to `closes[k + window - 1]`. Empty when `window`
/// is zero or exceeds the input.
pub fn rolling_mean(closes: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || closes.len() < window {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - window + 1);
    let mut sum: f64 = closes[..window].iter().sum();
    result.push(sum / window as f64);

    for i in window..closes.len() {
        sum += closes[i] - closes[i - window];
        result.push(sum / window as f64);
    }
    result
}

/// Deviation of each close from its rolling mean.
///
/// Aligned like [`rolling_mean`]: element `k` corresponds to
/// `closes[k + window - 1]`.
pub fn calculate_mean_reversion(closes: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || closes.len() < window {
        return Vec::new();
    }

    rolling_mean(closes, window)
        .into_iter()
        .zip(&closes[window - 1..])
        .map(|(mean, close)| close - mean)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_known_values() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rolling_mean(&closes, 3), vec![2.0, 3.0, 4.0]);
        assert_eq!(rolling_mean(&closes, 5), vec![3.0]);
    }

    #[test]
    fn rolling_mean_edge_cases() {
        assert!(rolling_mean(&[1.0, 2.0], 3).is_empty());
        assert!(rolling_mean(&[1.0, 2.0], 0).is_empty());
        assert!(rolling_mean(&[], 1).is_empty());
    }

    #[test]
    fn deviation_from_mean() {
        let closes = [10.0, 10.0, 10.0, 16.0];
        let dev = calculate_mean_reversion(&closes, 3);
        assert_eq!(dev.len(), 2);
        assert!(dev[0].abs() < 1e-12);
        // SMA(10, 10, 16) = 12 => 16 - 12 = 4
        assert!((dev[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn deviation_insufficient_data() {
        assert!(calculate_mean_reversion(&[1.0], 20).is_empty());
        assert!(calculate_mean_reversion(&[1.0, 2.0], 0).is_empty());
    }
}
