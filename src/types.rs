// =============================================================================
// Shared types used across fractal-lab
// =============================================================================

use serde::{Deserialize, Serialize};

/// How a series handed to the Hurst estimator should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Price levels; analysed as log returns.
    Price,
    /// Already a series of increments; analysed as given.
    Change,
    /// Additive random-walk levels; analysed as first differences.
    RandomWalk,
}

impl Default for SeriesKind {
    fn default() -> Self {
        Self::Price
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Change => write!(f, "change"),
            Self::RandomWalk => write!(f, "random_walk"),
        }
    }
}

/// Direction of a confirmed fractal pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalKind {
    /// Local maximum of the highs.
    Up,
    /// Local minimum of the lows.
    Down,
}

impl std::fmt::Display for FractalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Moving-average crossover position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSignal {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}
