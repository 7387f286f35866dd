//! Data models for trades and their performance summary.

mod summary;
pub mod timestamp;
mod trade;

pub use summary::StatsSummary;
pub use trade::{NewTrade, Trade, TradePatch, TradeSide};

/// Errors raised by trade data that breaks the model's invariants.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    /// A stored side that is neither "long" nor "short".
    #[error("invalid trade side: {0:?}")]
    InvalidSide(String),

    #[error("{0}")]
    Validation(String),
}
