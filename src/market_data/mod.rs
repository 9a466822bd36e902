pub mod candle;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{closes, into_ascending, Candle};
