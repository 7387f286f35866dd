//! Calculator for the realized P&L summary: win/loss counts, win rate, averages.

use statrs::statistics::Statistics;

use crate::models::{StatsSummary, Trade};

/// Calculator for computing a journal's realized performance.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarize a set of trades.
    ///
    /// Open trades only contribute to `total_trades`; everything else is
    /// derived from the signed P&L of closed trades. Input order is irrelevant.
    pub fn summarize(trades: &[Trade]) -> StatsSummary {
        if trades.is_empty() {
            return StatsSummary::empty();
        }

        let pnls: Vec<f64> = trades.iter().filter_map(Trade::pnl).collect();
        let mut summary = Self::summarize_pnls(&pnls);
        summary.total_trades = trades.len() as u64;
        summary
    }

    /// Summary over the P&L of closed trades alone.
    fn summarize_pnls(pnls: &[f64]) -> StatsSummary {
        let wins: Vec<f64> = pnls.iter().copied().filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|&p| p < 0.0).collect();

        // Break-even trades count toward the total and the win rate denominator
        let realized_pnl: f64 = pnls.iter().sum();
        let winrate = if pnls.is_empty() {
            0.0
        } else {
            wins.len() as f64 / pnls.len() as f64
        };

        StatsSummary {
            total_trades: pnls.len() as u64,
            winning_trades: wins.len() as u64,
            losing_trades: losses.len() as u64,
            winrate,
            realized_pnl,
            avg_win: Self::mean(&wins),
            avg_loss: Self::mean(&losses),
        }
    }

    fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().mean())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeSide;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(id: i64, side: TradeSide, entry: f64, exit: Option<f64>, qty: f64) -> Trade {
        let opened = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap() + Duration::days(id);
        Trade {
            id,
            symbol: "MSFT".to_string(),
            side,
            quantity: qty,
            entry_price: entry,
            exit_price: exit,
            entry_time: opened,
            exit_time: exit.map(|_| opened + Duration::hours(6)),
            strategy_tag: None,
            notes: None,
        }
    }

    #[test]
    fn test_empty_journal() {
        assert_eq!(StatsCalculator::summarize(&[]), StatsSummary::empty());
    }

    #[test]
    fn test_only_open_trades() {
        let trades = vec![
            trade(1, TradeSide::Long, 100.0, None, 1.0),
            trade(2, TradeSide::Short, 42.0, None, 3.0),
        ];

        let summary = StatsCalculator::summarize(&trades);

        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.winning_trades, 0);
        assert_eq!(summary.losing_trades, 0);
        assert_eq!(summary.winrate, 0.0);
        assert_eq!(summary.realized_pnl, 0.0);
        assert_eq!(summary.avg_win, None);
        assert_eq!(summary.avg_loss, None);
    }

    #[test]
    fn test_single_long_win() {
        let trades = vec![trade(1, TradeSide::Long, 100.0, Some(110.0), 2.0)];

        let summary = StatsCalculator::summarize(&trades);

        assert_eq!(
            summary,
            StatsSummary {
                total_trades: 1,
                winning_trades: 1,
                losing_trades: 0,
                winrate: 1.0,
                realized_pnl: 20.0,
                avg_win: Some(20.0),
                avg_loss: None,
            }
        );
    }

    #[test]
    fn test_short_profits_from_price_drop() {
        let trades = vec![trade(1, TradeSide::Short, 50.0, Some(40.0), 1.0)];

        let summary = StatsCalculator::summarize(&trades);

        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.winrate, 1.0);
        assert_eq!(summary.realized_pnl, 10.0);
        assert_eq!(summary.avg_win, Some(10.0));
    }

    #[test]
    fn test_mixed_closed_and_open() {
        let trades = vec![
            trade(1, TradeSide::Long, 100.0, Some(130.0), 1.0), // +30
            trade(2, TradeSide::Short, 200.0, Some(205.0), 2.0), // -10
            trade(3, TradeSide::Long, 75.0, None, 4.0),
        ];

        let summary = StatsCalculator::summarize(&trades);

        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.winrate, 0.5);
        assert_eq!(summary.realized_pnl, 20.0);
        assert_eq!(summary.avg_win, Some(30.0));
        assert_eq!(summary.avg_loss, Some(-10.0));
    }

    #[test]
    fn test_break_even_counts_in_denominator_only() {
        let trades = vec![
            trade(1, TradeSide::Long, 10.0, Some(10.0), 5.0), // 0
            trade(2, TradeSide::Long, 10.0, Some(12.0), 5.0), // +10
        ];

        let summary = StatsCalculator::summarize(&trades);

        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 0);
        assert_eq!(summary.winrate, 0.5);
        assert_eq!(summary.realized_pnl, 10.0);
        assert_eq!(summary.avg_loss, None);
    }

    #[test]
    fn test_averages_and_invariants() {
        let trades = vec![
            trade(1, TradeSide::Long, 100.0, Some(104.0), 1.0),  // +4
            trade(2, TradeSide::Long, 100.0, Some(108.0), 1.0),  // +8
            trade(3, TradeSide::Short, 100.0, Some(103.0), 1.0), // -3
            trade(4, TradeSide::Short, 100.0, Some(109.0), 1.0), // -9
            trade(5, TradeSide::Short, 100.0, Some(94.0), 0.5),  // +3
        ];

        let summary = StatsCalculator::summarize(&trades);
        let expected_pnl: f64 = trades.iter().filter_map(Trade::pnl).sum();

        assert_eq!(summary.winning_trades, 3);
        assert_eq!(summary.losing_trades, 2);
        assert!((summary.winrate - 0.6).abs() < 1e-12);
        assert!((summary.realized_pnl - expected_pnl).abs() < 1e-12);
        assert!((summary.avg_win.unwrap() - 5.0).abs() < 1e-12);
        assert!((summary.avg_loss.unwrap() + 6.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&summary.winrate));
    }

    #[test]
    fn test_idempotent_and_non_mutating() {
        let trades = vec![
            trade(1, TradeSide::Long, 100.0, Some(90.0), 3.0),
            trade(2, TradeSide::Short, 10.0, None, 1.0),
        ];
        let before = trades.clone();

        let first = StatsCalculator::summarize(&trades);
        let second = StatsCalculator::summarize(&trades);

        assert_eq!(first, second);
        assert_eq!(trades, before);
    }
}
