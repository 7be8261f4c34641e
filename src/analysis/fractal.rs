// =============================================================================
// Fractal pivots — 5-sample strict extremum window
// =============================================================================
//
// A bar `i` is an UP fractal when its high is strictly greater than the highs
// of the two bars on each side, and a DOWN fractal when its low is strictly
// lower than the lows of the two bars on each side:
//
//   UP   at i  <=>  high[i] > high[j]  for j in {i-2, i-1, i+1, i+2}
//   DOWN at i  <=>  low[i]  < low[j]   for j in {i-2, i-1, i+1, i+2}
//
// Only centres with two valid neighbours on each side are classified, so the
// first two and last two bars are never marked. Equal values never qualify.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::AnalysisError;
use crate::series::ensure_finite;
use crate::types::FractalKind;

/// Width of the comparison window (centre plus two neighbours per side).
pub const FRACTAL_WINDOW: usize = 5;

/// Neighbours required on each side of a candidate centre.
const HALF_WINDOW: usize = FRACTAL_WINDOW / 2;

/// A single confirmed pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractalPoint {
    pub index: usize,
    pub kind: FractalKind,
}

/// Fractal marks aligned with the analysed high/low columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractalAnnotation {
    /// `up[i]` is true when bar `i` is an UP fractal.
    pub up: Vec<bool>,
    /// `down[i]` is true when bar `i` is a DOWN fractal.
    pub down: Vec<bool>,
}

impl FractalAnnotation {
    /// Length of the annotated series.
    fn len(&self) -> usize {
        self.up.len()
    }

    /// Sparse `(index, kind)` view, ordered by index. A bar that is both an
    /// UP and a DOWN fractal (an outside bar) yields two points, UP first.
    pub fn points(&self) -> Vec<FractalPoint> {
        let mut points = Vec::new();
        for i in 0..self.len() {
            if self.up[i] {
                points.push(FractalPoint {
                    index: i,
                    kind: FractalKind::Up,
                });
            }
            if self.down[i] {
                points.push(FractalPoint {
                    index: i,
                    kind: FractalKind::Down,
                });
            }
        }
        points
    }
}

/// Stateless fractal pivot detector.
pub struct FractalDetector;

impl FractalDetector {
    /// Classify every interior bar of `high` / `low` as an UP and/or DOWN
    /// fractal.
    ///
    /// Fails with [`AnalysisError::InvalidInput`] when the columns differ in
    /// length, hold fewer than [`FRACTAL_WINDOW`] samples, or contain a
    /// non-finite value.
    pub fn detect(high: &[f64], low: &[f64]) -> Result<FractalAnnotation, AnalysisError> {
        if high.len() != low.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "high/low length mismatch: {} vs {}",
                high.len(),
                low.len()
            )));
        }
        if high.len() < FRACTAL_WINDOW {
            return Err(AnalysisError::InvalidInput(format!(
                "fractal detection needs at least {FRACTAL_WINDOW} bars, got {}",
                high.len()
            )));
        }
        ensure_finite(high, "high")?;
        ensure_finite(low, "low")?;

        let n = high.len();
        let mut up = vec![false; n];
        let mut down = vec![false; n];

        for i in HALF_WINDOW..n - HALF_WINDOW {
            up[i] = is_strict_extremum(high, i, |centre, other| centre > other);
            down[i] = is_strict_extremum(low, i, |centre, other| centre < other);
        }

        let annotation = FractalAnnotation { up, down };
        trace!(
            bars = n,
            up = annotation.up.iter().filter(|&&f| f).count(),
            down = annotation.down.iter().filter(|&&f| f).count(),
            "Fractals detected"
        );
        Ok(annotation)
    }
}

/// True when `values[i]` beats each of its four window neighbours under
/// `beats`. The caller guarantees `2 <= i <= len - 3`.
fn is_strict_extremum(values: &[f64], i: usize, beats: impl Fn(f64, f64) -> bool) -> bool {
    let centre = values[i];
    beats(centre, values[i - 2])
        && beats(centre, values[i - 1])
        && beats(centre, values[i + 1])
        && beats(centre, values[i + 2])
}
