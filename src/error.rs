// =============================================================================
// Analysis errors
// =============================================================================
//
// The analytic core never returns a partially computed or zero-filled result.
// Every rejection is raised at the point of detection as one of two kinds.

use thiserror::Error;

/// Errors raised by the fractal and Hurst analyses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Malformed input: length mismatch, non-finite values, too-short series
    /// for a fixed-width window, or non-positive prices for log returns.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input is well formed but too small for the requested analysis.
    #[error("insufficient data: need at least {required} {what}, got {actual}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        actual: usize,
    },
}

impl AnalysisError {
    /// Short machine-readable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InsufficientData { .. } => "insufficient_data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = AnalysisError::InsufficientData {
            what: "samples",
            required: 33,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 33 samples, got 10"
        );
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn invalid_input_message() {
        let err = AnalysisError::InvalidInput("high/low length mismatch".into());
        assert_eq!(err.to_string(), "invalid input: high/low length mismatch");
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn implements_std_error() {
        fn assert_std_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_std_error::<AnalysisError>();
    }
}
