//! Database persistence for journaled trades.
//!
//! Trades live in a single SQLite table. `side` and timestamps are stored as
//! TEXT, so rows are decoded through [`TradeRow`] which re-checks the side
//! invariant on the way out.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

use crate::models::{NewTrade, Trade, TradeError, TradePatch, TradeSide};

const TRADE_COLUMNS: &str = "id, symbol, side, quantity, entry_price, exit_price, \
                             entry_time, exit_time, strategy_tag, notes";

/// Database connection pool for the trade journal.
pub struct Database {
    pool: SqlitePool,
}

/// Trade record as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
struct TradeRow {
    id: i64,
    symbol: String,
    side: String,
    quantity: f64,
    entry_price: f64,
    exit_price: Option<f64>,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
    strategy_tag: Option<String>,
    notes: Option<String>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = TradeError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        Ok(Trade {
            id: row.id,
            symbol: row.symbol,
            side: TradeSide::from_str(&row.side)?,
            quantity: row.quantity,
            entry_price: row.entry_price,
            exit_price: row.exit_price,
            entry_time: row.entry_time,
            exit_time: row.exit_time,
            strategy_tag: row.strategy_tag,
            notes: row.notes,
        })
    }
}

impl Database {
    /// Create a new database connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Every connection to an in-memory database gets its own empty copy,
        // so keep exactly one alive for the lifetime of the pool.
        let options = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity REAL NOT NULL,
                entry_price REAL NOT NULL,
                exit_price REAL,
                entry_time TEXT NOT NULL,
                exit_time TEXT,
                strategy_tag TEXT,
                notes TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trades table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_entry_time ON trades(entry_time)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Trades ====================

    /// Record a new trade and return it with its assigned id.
    pub async fn create(&self, trade: &NewTrade) -> Result<Trade> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            r#"
            INSERT INTO trades (symbol, side, quantity, entry_price, exit_price,
                                entry_time, exit_time, strategy_tag, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            TRADE_COLUMNS
        ))
        .bind(&trade.symbol)
        .bind(trade.side.as_str())
        .bind(trade.quantity)
        .bind(trade.entry_price)
        .bind(trade.exit_price)
        .bind(trade.entry_time)
        .bind(trade.exit_time)
        .bind(&trade.strategy_tag)
        .bind(&trade.notes)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert trade")?;

        debug!(trade_id = row.id, symbol = %row.symbol, "Trade inserted");
        Ok(Trade::try_from(row)?)
    }

    /// Get a trade by id.
    pub async fn get(&self, id: i64) -> Result<Option<Trade>> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {} FROM trades WHERE id = ?",
            TRADE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trade")?;

        row.map(Trade::try_from).transpose().map_err(Into::into)
    }

    /// Get every trade, oldest entry first.
    pub async fn list_all(&self) -> Result<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {} FROM trades ORDER BY entry_time ASC, id ASC",
            TRADE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch trades")?;

        rows.into_iter()
            .map(Trade::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Apply a partial update to a trade.
    ///
    /// The patched trade is validated before it is written; read and write
    /// happen in one transaction.
    pub async fn update(&self, id: i64, patch: &TradePatch) -> Result<Option<Trade>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {} FROM trades WHERE id = ?",
            TRADE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch trade")?;

        let Some(current) = current else {
            return Ok(None);
        };

        let updated = Trade::try_from(current)?.patched(patch);
        updated.validate()?;

        sqlx::query(
            r#"
            UPDATE trades SET
                symbol = ?,
                side = ?,
                quantity = ?,
                entry_price = ?,
                exit_price = ?,
                entry_time = ?,
                exit_time = ?,
                strategy_tag = ?,
                notes = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.symbol)
        .bind(updated.side.as_str())
        .bind(updated.quantity)
        .bind(updated.entry_price)
        .bind(updated.exit_price)
        .bind(updated.entry_time)
        .bind(updated.exit_time)
        .bind(&updated.strategy_tag)
        .bind(&updated.notes)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update trade")?;

        tx.commit().await?;

        debug!(trade_id = id, closed = updated.is_closed(), "Trade updated");
        Ok(Some(updated))
    }

    /// Delete a trade. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM trades WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete trade")?;

        Ok(result.rows_affected() > 0)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn memory_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn new_trade(symbol: &str, side: TradeSide, day: u32) -> NewTrade {
        NewTrade {
            symbol: symbol.to_string(),
            side,
            quantity: 2.0,
            entry_price: 100.0,
            exit_price: None,
            entry_time: Utc.with_ymd_and_hms(2024, 5, day, 13, 0, 0).unwrap(),
            exit_time: None,
            strategy_tag: Some("swing".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = memory_db().await;

        let first = db.create(&new_trade("AAPL", TradeSide::Long, 3)).await.unwrap();
        let second = db.create(&new_trade("TSLA", TradeSide::Short, 4)).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(second.side, TradeSide::Short);

        let fetched = db.get(first.id).await.unwrap().unwrap();
        assert_eq!(fetched, first);
        assert!(db.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_orders_by_entry_time() {
        let db = memory_db().await;

        db.create(&new_trade("LATE", TradeSide::Long, 20)).await.unwrap();
        db.create(&new_trade("EARLY", TradeSide::Long, 1)).await.unwrap();
        db.create(&new_trade("MID", TradeSide::Short, 10)).await.unwrap();

        let symbols: Vec<String> = db
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.symbol)
            .collect();

        assert_eq!(symbols, vec!["EARLY", "MID", "LATE"]);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let db = memory_db().await;
        let trade = db.create(&new_trade("NVDA", TradeSide::Long, 6)).await.unwrap();

        let close = TradePatch {
            exit_price: Some(Some(120.0)),
            exit_time: Some(Some(Utc.with_ymd_and_hms(2024, 5, 7, 15, 0, 0).unwrap())),
            strategy_tag: Some(None),
            ..Default::default()
        };
        let updated = db.update(trade.id, &close).await.unwrap().unwrap();

        assert_eq!(updated.exit_price, Some(120.0));
        assert_eq!(updated.strategy_tag, None);
        assert_eq!(updated.symbol, "NVDA");
        assert_eq!(db.get(trade.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_result() {
        let db = memory_db().await;
        let trade = db.create(&new_trade("AMD", TradeSide::Long, 6)).await.unwrap();

        let patch = TradePatch {
            quantity: Some(-1.0),
            ..Default::default()
        };
        let err = db.update(trade.id, &patch).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TradeError>(),
            Some(TradeError::Validation(_))
        ));
        assert_eq!(db.get(trade.id).await.unwrap().unwrap().quantity, 2.0);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let db = memory_db().await;

        assert!(db.update(42, &TradePatch::default()).await.unwrap().is_none());
        assert!(!db.delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = memory_db().await;
        let trade = db.create(&new_trade("META", TradeSide::Short, 8)).await.unwrap();

        assert!(db.delete(trade.id).await.unwrap());
        assert!(db.get(trade.id).await.unwrap().is_none());
        assert!(db.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_side_surfaces_integrity_error() {
        let db = memory_db().await;
        let trade = db.create(&new_trade("GME", TradeSide::Long, 9)).await.unwrap();

        sqlx::query("UPDATE trades SET side = 'flat' WHERE id = ?")
            .bind(trade.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.list_all().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TradeError>(),
            Some(TradeError::InvalidSide(s)) if s == "flat"
        ));
    }
}
