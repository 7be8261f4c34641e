pub mod binance;
pub mod candle;
pub mod synthetic;

// Re-export the common types for convenient access (e.g. `use crate::market_data::Candle`).
pub use binance::BinanceClient;
pub use candle::{Candle, CandleSeries};
