// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator helpers that sit next to the analytic core.
// Unlike the core, insufficient data is not an error here: series functions
// return an empty `Vec` and point lookups return `None`.

pub mod mean_reversion;
pub mod momentum;
pub mod seasonality;
pub mod sma;
