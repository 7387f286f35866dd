//! Performance statistics over journaled trades.

mod calculator;

pub use calculator::StatsCalculator;
