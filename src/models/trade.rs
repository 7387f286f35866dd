//! Trade model representing a single journaled position.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TradeError;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "long",
            TradeSide::Short => "short",
        }
    }

    /// Sign applied to the price move when computing P&L.
    pub fn direction(&self) -> f64 {
        match self {
            TradeSide::Long => 1.0,
            TradeSide::Short => -1.0,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(TradeSide::Long),
            "short" => Ok(TradeSide::Short),
            other => Err(TradeError::InvalidSide(other.to_string())),
        }
    }
}

/// Journaled trade, open until an exit price is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Store-assigned identifier
    pub id: i64,

    /// Traded instrument (e.g., "AAPL", "BTCUSDT")
    pub symbol: String,

    /// Position direction
    pub side: TradeSide,

    /// Position size, always positive
    pub quantity: f64,

    /// Price paid (long) or received (short) at open
    pub entry_price: f64,

    /// Price at close; `None` while the position is open
    pub exit_price: Option<f64>,

    /// When the position was opened
    #[serde(with = "super::timestamp")]
    pub entry_time: DateTime<Utc>,

    /// When the position was closed
    #[serde(with = "super::timestamp::option")]
    pub exit_time: Option<DateTime<Utc>>,

    /// Free-form strategy label
    pub strategy_tag: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some()
    }

    /// Signed realized P&L, or `None` for an open trade.
    pub fn pnl(&self) -> Option<f64> {
        self.exit_price
            .map(|exit| (exit - self.entry_price) * self.quantity * self.side.direction())
    }

    /// Build a copy of this trade with every field present in `patch` overridden.
    pub fn patched(&self, patch: &TradePatch) -> Trade {
        Trade {
            id: self.id,
            symbol: patch.symbol.clone().unwrap_or_else(|| self.symbol.clone()),
            side: patch.side.unwrap_or(self.side),
            quantity: patch.quantity.unwrap_or(self.quantity),
            entry_price: patch.entry_price.unwrap_or(self.entry_price),
            exit_price: patch.exit_price.unwrap_or(self.exit_price),
            entry_time: patch.entry_time.unwrap_or(self.entry_time),
            exit_time: patch.exit_time.unwrap_or(self.exit_time),
            strategy_tag: patch
                .strategy_tag
                .clone()
                .unwrap_or_else(|| self.strategy_tag.clone()),
            notes: patch.notes.clone().unwrap_or_else(|| self.notes.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), TradeError> {
        validate_fields(
            &self.symbol,
            self.quantity,
            self.entry_price,
            self.exit_price,
            self.entry_time,
            self.exit_time,
        )
    }
}

/// Payload for recording a new trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub entry_price: f64,

    #[serde(default)]
    pub exit_price: Option<f64>,

    #[serde(with = "super::timestamp")]
    pub entry_time: DateTime<Utc>,

    #[serde(default, with = "super::timestamp::option")]
    pub exit_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub strategy_tag: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTrade {
    pub fn validate(&self) -> Result<(), TradeError> {
        validate_fields(
            &self.symbol,
            self.quantity,
            self.entry_price,
            self.exit_price,
            self.entry_time,
            self.exit_time,
        )
    }
}

/// Partial update for an existing trade.
///
/// An absent field leaves the stored value untouched. Nullable fields use a
/// nested `Option` so that an explicit JSON `null` clears the stored value,
/// e.g. `{"exit_price": null}` re-opens a trade. `null` for a required field
/// is rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TradePatch {
    #[serde(default, deserialize_with = "present")]
    pub symbol: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub side: Option<TradeSide>,

    #[serde(default, deserialize_with = "present")]
    pub quantity: Option<f64>,

    #[serde(default, deserialize_with = "present")]
    pub entry_price: Option<f64>,

    #[serde(default, deserialize_with = "present")]
    pub exit_price: Option<Option<f64>>,

    #[serde(default, deserialize_with = "super::timestamp::present")]
    pub entry_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "super::timestamp::present_nullable")]
    pub exit_time: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "present")]
    pub strategy_tag: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

/// Marks a field that appeared in the payload, even as `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_fields(
    symbol: &str,
    quantity: f64,
    entry_price: f64,
    exit_price: Option<f64>,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
) -> Result<(), TradeError> {
    if symbol.trim().is_empty() {
        return Err(TradeError::Validation("symbol must not be empty".into()));
    }
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(TradeError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if !entry_price.is_finite() {
        return Err(TradeError::Validation("entry_price must be a finite number".into()));
    }
    if let Some(exit) = exit_price {
        if !exit.is_finite() {
            return Err(TradeError::Validation("exit_price must be a finite number".into()));
        }
        if !((exit - entry_price) * quantity).is_finite() {
            return Err(TradeError::Validation(
                "realized P&L is out of range for these prices and quantity".into(),
            ));
        }
    }
    if let Some(exit) = exit_time {
        if entry_time > exit {
            return Err(TradeError::Validation(
                "entry_time must not be later than exit_time".into(),
            ));
        }
    }
    Ok(())
}
