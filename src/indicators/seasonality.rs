// =============================================================================
// Monthly Seasonality — small caps vs large caps, December vs January
// =============================================================================
//
// Monthly return = last close of the month / last close of the previous
// available month - 1, in percent. The first month of a series has no
// reference close and is omitted.
//
// The comparison joins two return series on (year, month); the turn-of-year
// view then pairs December and January of the same calendar year.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A timestamped close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix time in milliseconds (UTC).
    pub time: i64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyComparison {
    pub year: i32,
    pub month: u32,
    pub small_pct: f64,
    pub large_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnOfYear {
    pub year: i32,
    pub december: MonthlyComparison,
    pub january: MonthlyComparison,
}

/// Month-over-month returns of `points`, ordered by (year, month).
///
/// Points need not be sorted; the latest point of each month is its close.
/// Points with an out-of-range timestamp or a non-finite close are skipped.
pub fn monthly_returns(points: &[PricePoint]) -> Vec<MonthlyReturn> {
    // (year, month) -> (time, close) of the latest point seen in that month.
    let mut month_end: BTreeMap<(i32, u32), (i64, f64)> = BTreeMap::new();

    for p in points {
        let Some(dt) = DateTime::<Utc>::from_timestamp_millis(p.time) else {
            warn!(time = p.time, "Seasonality: timestamp out of range, skipped");
            continue;
        };
        if !p.close.is_finite() {
            warn!(time = p.time, "Seasonality: non-finite close, skipped");
            continue;
        }

        let entry = month_end
            .entry((dt.year(), dt.month()))
            .or_insert((p.time, p.close));
        if p.time >= entry.0 {
            *entry = (p.time, p.close);
        }
    }

    let closes: Vec<((i32, u32), f64)> = month_end
        .into_iter()
        .map(|(key, (_, close))| (key, close))
        .collect();

    closes
        .windows(2)
        .filter(|w| w[0].1 != 0.0)
        .map(|w| {
            let ((year, month), close) = w[1];
            MonthlyReturn {
                year,
                month,
                return_pct: (close / w[0].1 - 1.0) * 100.0,
            }
        })
        .collect()
}

/// Join two monthly return series on (year, month).
pub fn compare_monthly(small: &[MonthlyReturn], large: &[MonthlyReturn]) -> Vec<MonthlyComparison> {
    let large_by_month: BTreeMap<(i32, u32), f64> = large
        .iter()
        .map(|r| ((r.year, r.month), r.return_pct))
        .collect();

    small
        .iter()
        .filter_map(|s| {
            large_by_month
                .get(&(s.year, s.month))
                .map(|&large_pct| MonthlyComparison {
                    year: s.year,
                    month: s.month,
                    small_pct: s.return_pct,
                    large_pct,
                })
        })
        .collect()
}

/// Pair December and January of the same calendar year.
pub fn turn_of_year(comparison: &[MonthlyComparison]) -> Vec<TurnOfYear> {
    let by_month: BTreeMap<(i32, u32), MonthlyComparison> = comparison
        .iter()
        .map(|c| ((c.year, c.month), *c))
        .collect();

    by_month
        .iter()
        .filter(|((_, month), _)| *month == 12)
        .filter_map(|(&(year, _), &december)| {
            by_month.get(&(year, 1)).map(|&january| TurnOfYear {
                year,
                december,
                january,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(y: i32, m: u32, d: u32, close: f64) -> PricePoint {
        PricePoint {
            time: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().timestamp_millis(),
            close,
        }
    }

    #[test]
    fn month_end_to_month_end() {
        let points = vec![
            point(2022, 1, 3, 90.0),
            point(2022, 1, 31, 100.0),
            point(2022, 2, 1, 104.0),
            point(2022, 2, 28, 110.0),
            point(2022, 3, 31, 99.0),
        ];
        let returns = monthly_returns(&points);
        assert_eq!(returns.len(), 2);
        assert_eq!((returns[0].year, returns[0].month), (2022, 2));
        assert!((returns[0].return_pct - 10.0).abs() < 1e-9);
        assert!((returns[1].return_pct + 10.0).abs() < 1e-9);
    }

    #[test]
    fn unsorted_points_use_latest_in_month() {
        let points = vec![
            point(2022, 2, 28, 110.0),
            point(2022, 1, 31, 100.0),
            point(2022, 2, 1, 50.0),
        ];
        let returns = monthly_returns(&points);
        assert_eq!(returns.len(), 1);
        assert!((returns[0].return_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn year_boundary_and_pairing() {
        let small = monthly_returns(&[
            point(2021, 11, 30, 100.0),
            point(2021, 12, 31, 105.0),
            point(2022, 1, 31, 94.5),
            point(2022, 12, 30, 100.0),
        ]);
        let large = monthly_returns(&[
            point(2021, 11, 30, 200.0),
            point(2021, 12, 31, 202.0),
            point(2022, 1, 31, 212.1),
            point(2022, 12, 30, 220.0),
        ]);

        let cmp = compare_monthly(&small, &large);
        assert_eq!(cmp.len(), 3);
        assert_eq!((cmp[0].year, cmp[0].month), (2021, 12));
        assert!((cmp[0].small_pct - 5.0).abs() < 1e-9);
        assert!((cmp[0].large_pct - 1.0).abs() < 1e-9);

        // December 2021 has no January 2021 partner; December 2022 pairs
        // with January 2022.
        let toy = turn_of_year(&cmp);
        assert_eq!(toy.len(), 1);
        assert_eq!(toy[0].year, 2022);
        assert_eq!(toy[0].january.month, 1);
        assert!((toy[0].january.small_pct + 10.0).abs() < 1e-9);
        assert!((toy[0].january.large_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_and_zero_reference_are_skipped() {
        let points = vec![
            point(2022, 1, 31, 0.0),
            point(2022, 2, 28, 10.0),
            point(2022, 3, 31, f64::NAN),
            point(2022, 4, 29, 12.0),
        ];
        let returns = monthly_returns(&points);
        // Jan close is zero => Feb omitted. Mar skipped => Apr vs Feb.
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].month, 4);
        assert!((returns[0].return_pct - 20.0).abs() < 1e-9);
    }
}
