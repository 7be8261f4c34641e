// =============================================================================
// Analytic Core
// =============================================================================
//
// Pure, deterministic, synchronous analyses over ordered numeric series. No
// shared state, no I/O; safe to call concurrently on independent inputs.
//
// - Fractal pivots (5-sample strict extremum window)
// - Hurst exponent (rescaled-range analysis + log-log OLS fit)

pub mod fractal;
pub mod hurst;
pub mod regression;

pub use fractal::{FractalAnnotation, FractalDetector, FractalPoint};
pub use hurst::{HurstConfig, HurstEstimator, HurstRegime, HurstResult};
