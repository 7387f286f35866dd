//! Realized performance summary over the journaled trades.

use serde::{Deserialize, Serialize};

/// Win/loss and realized P&L statistics, computed fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Number of trades, open and closed
    pub total_trades: u64,

    /// Closed trades with positive P&L
    pub winning_trades: u64,

    /// Closed trades with negative P&L
    pub losing_trades: u64,

    /// Winning trades over closed trades (0.0 to 1.0)
    pub winrate: f64,

    /// Sum of P&L over closed trades
    pub realized_pnl: f64,

    /// Mean P&L of winning trades
    pub avg_win: Option<f64>,

    /// Mean P&L of losing trades (negative)
    pub avg_loss: Option<f64>,
}

impl StatsSummary {
    /// Summary for a journal with no trades.
    pub fn empty() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            winrate: 0.0,
            realized_pnl: 0.0,
            avg_win: None,
            avg_loss: None,
        }
    }

    /// False if any figure overflowed; such a summary has no JSON number form.
    pub fn is_finite(&self) -> bool {
        self.winrate.is_finite()
            && self.realized_pnl.is_finite()
            && self.avg_win.map_or(true, f64::is_finite)
            && self.avg_loss.map_or(true, f64::is_finite)
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let money = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("${:.2}", v));

        writeln!(f, "\n{:=^40}", " TRADE SUMMARY ")?;
        writeln!(f, "Total Trades: {}", self.total_trades)?;
        writeln!(f, "Winners:      {} ({:.1}%)", self.winning_trades, self.winrate * 100.0)?;
        writeln!(f, "Losers:       {}", self.losing_trades)?;
        writeln!(f, "Realized P&L: ${:.2}", self.realized_pnl)?;
        writeln!(f, "Avg Win:      {}", money(self.avg_win))?;
        writeln!(f, "Avg Loss:     {}", money(self.avg_loss))?;
        write!(f, "{:=^40}", "")
    }
}
