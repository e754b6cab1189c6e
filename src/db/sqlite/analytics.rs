//! Read-only analytics over a batch's log rows.
//!
//! Everything here is plain SQL aggregation; the running totals were fixed
//! when the rows were written, so these queries derive views, never state.

use serde::Serialize;
use sqlx::Row;

use crate::db::{BatchLogStore, StoreError};

use super::SqliteRepository;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_trades: i64,
    pub winning_trades: i64,
    pub losing_trades: i64,
    pub breakeven_trades: i64,
    pub avg_pnl_pct: f64,
    pub best_pnl_pct: f64,
    pub worst_pnl_pct: f64,
    pub total_pnl: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<LatestSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSnapshot {
    pub trade_number: i64,
    pub capital: String,
    pub cumulative_pnl: String,
    pub peak_capital: String,
    pub max_drawdown: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalPoint {
    pub trade_number: i64,
    pub exit_time_ms: i64,
    pub capital: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub day: String,
    pub pnl: f64,
    pub capital: String,
    pub trades: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub day: String,
    pub trades: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativePoint {
    pub exit_time_ms: i64,
    pub trade_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStat {
    pub symbol: String,
    pub trades: i64,
    pub wins: i64,
    pub losses: i64,
    pub avg_pnl_pct: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawdownPoint {
    pub trade_number: i64,
    pub exit_time_ms: i64,
    pub drawdown: String,
    pub max_drawdown: String,
}

impl SqliteRepository {
    pub async fn batch_summary(&self, batch_id: &str) -> Result<BatchSummary, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                SUM(CASE WHEN CAST(pnl_pct AS REAL) > 0 THEN 1 ELSE 0 END) AS wins,
                SUM(CASE WHEN CAST(pnl_pct AS REAL) < 0 THEN 1 ELSE 0 END) AS losses,
                SUM(CASE WHEN CAST(pnl_pct AS REAL) = 0 THEN 1 ELSE 0 END) AS breakeven,
                AVG(CAST(pnl_pct AS REAL)) AS avg_pct,
                MAX(CAST(pnl_pct AS REAL)) AS best_pct,
                MIN(CAST(pnl_pct AS REAL)) AS worst_pct,
                SUM(CAST(pnl_abs AS REAL)) AS total_pnl
            FROM batch_log
            WHERE batch_id = ?
            "#,
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;

        let latest = self.last_entry(batch_id).await?.map(|e| LatestSnapshot {
            trade_number: e.trade_number,
            capital: e.capital_after.to_canonical_string(),
            cumulative_pnl: e.cumulative_pnl.to_canonical_string(),
            peak_capital: e.peak_capital.to_canonical_string(),
            max_drawdown: e.max_drawdown.to_canonical_string(),
        });

        Ok(BatchSummary {
            total_trades: row.get("total"),
            winning_trades: row.get::<Option<i64>, _>("wins").unwrap_or(0),
            losing_trades: row.get::<Option<i64>, _>("losses").unwrap_or(0),
            breakeven_trades: row.get::<Option<i64>, _>("breakeven").unwrap_or(0),
            avg_pnl_pct: row.get::<Option<f64>, _>("avg_pct").unwrap_or(0.0),
            best_pnl_pct: row.get::<Option<f64>, _>("best_pct").unwrap_or(0.0),
            worst_pnl_pct: row.get::<Option<f64>, _>("worst_pct").unwrap_or(0.0),
            total_pnl: row.get::<Option<f64>, _>("total_pnl").unwrap_or(0.0),
            latest,
        })
    }

    pub async fn capital_series(&self, batch_id: &str) -> Result<Vec<CapitalPoint>, StoreError> {
        let rows = sqlx::query(
            "SELECT trade_number, exit_time_ms, capital_after FROM batch_log \
             WHERE batch_id = ? ORDER BY trade_number ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CapitalPoint {
                trade_number: row.get("trade_number"),
                exit_time_ms: row.get("exit_time_ms"),
                capital: row.get("capital_after"),
            })
            .collect())
    }

    /// Capital by calendar day of exit (UTC): pnl summed over the day,
    /// capital taken from the day's last trade.
    pub async fn daily_capital_series(
        &self,
        batch_id: &str,
    ) -> Result<Vec<DailyPoint>, StoreError> {
        // Bare capital_after resolves to the row carrying MAX(trade_number),
        // per SQLite's min/max aggregate row semantics.
        let rows = sqlx::query(
            r#"
            SELECT
                date(exit_time_ms / 1000, 'unixepoch') AS day,
                SUM(CAST(pnl_abs AS REAL)) AS pnl,
                COUNT(*) AS trades,
                capital_after,
                MAX(trade_number) AS last_number
            FROM batch_log
            WHERE batch_id = ?
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DailyPoint {
                day: row.get("day"),
                pnl: row.get::<Option<f64>, _>("pnl").unwrap_or(0.0),
                capital: row.get("capital_after"),
                trades: row.get("trades"),
            })
            .collect())
    }

    pub async fn trades_per_day(&self, batch_id: &str) -> Result<Vec<DayCount>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT date(exit_time_ms / 1000, 'unixepoch') AS day, COUNT(*) AS trades
            FROM batch_log
            WHERE batch_id = ?
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DayCount {
                day: row.get("day"),
                trades: row.get("trades"),
            })
            .collect())
    }

    /// Cumulative trade count over time; trade_number is already the
    /// 1-based position in exit order.
    pub async fn cumulative_trades(
        &self,
        batch_id: &str,
    ) -> Result<Vec<CumulativePoint>, StoreError> {
        let rows = sqlx::query(
            "SELECT exit_time_ms, trade_number FROM batch_log \
             WHERE batch_id = ? ORDER BY trade_number ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CumulativePoint {
                exit_time_ms: row.get("exit_time_ms"),
                trade_count: row.get("trade_number"),
            })
            .collect())
    }

    pub async fn symbol_breakdown(&self, batch_id: &str) -> Result<Vec<SymbolStat>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                symbol,
                COUNT(*) AS trades,
                SUM(CASE WHEN CAST(pnl_pct AS REAL) > 0 THEN 1 ELSE 0 END) AS wins,
                SUM(CASE WHEN CAST(pnl_pct AS REAL) < 0 THEN 1 ELSE 0 END) AS losses,
                AVG(CAST(pnl_pct AS REAL)) AS avg_pct,
                SUM(CAST(pnl_abs AS REAL)) AS total_pnl
            FROM batch_log
            WHERE batch_id = ?
            GROUP BY symbol
            ORDER BY symbol ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SymbolStat {
                symbol: row.get("symbol"),
                trades: row.get("trades"),
                wins: row.get::<Option<i64>, _>("wins").unwrap_or(0),
                losses: row.get::<Option<i64>, _>("losses").unwrap_or(0),
                avg_pnl_pct: row.get::<Option<f64>, _>("avg_pct").unwrap_or(0.0),
                total_pnl: row.get::<Option<f64>, _>("total_pnl").unwrap_or(0.0),
            })
            .collect())
    }

    pub async fn drawdown_series(&self, batch_id: &str) -> Result<Vec<DrawdownPoint>, StoreError> {
        let rows = sqlx::query(
            "SELECT trade_number, exit_time_ms, drawdown, max_drawdown FROM batch_log \
             WHERE batch_id = ? ORDER BY trade_number ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DrawdownPoint {
                trade_number: row.get("trade_number"),
                exit_time_ms: row.get("exit_time_ms"),
                drawdown: row.get("drawdown"),
                max_drawdown: row.get("max_drawdown"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, BatchStore};
    use crate::domain::{Batch, BatchLogEntry, Decimal, Direction, Symbol, TimeMs};
    use tempfile::TempDir;

    const DAY_MS: i64 = 86_400_000;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    async fn setup() -> (SqliteRepository, Batch, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = SqliteRepository::new(pool);

        let batch = Batch::new("alpha".to_string(), d("100000"), None);
        repo.insert_batch(&batch, &[]).await.unwrap();

        // Two winners on day one, one loser on day two.
        let rows = [
            ("t1", 1, "BTCUSD", "10", "10000", "100000", "110000", 1_000),
            ("t2", 2, "ETHUSD", "5", "5500", "110000", "115500", 2_000),
            (
                "t3",
                3,
                "BTCUSD",
                "-20",
                "-23100",
                "115500",
                "92400",
                DAY_MS + 1_000,
            ),
        ];
        for (trade_id, number, symbol, pct, abs, before, after, exit_ms) in rows {
            let peak = if number < 3 { after } else { "115500" };
            let dd = if number < 3 { "0" } else { "20" };
            repo.upsert_entry(&BatchLogEntry {
                batch_id: batch.id.clone(),
                trade_id: trade_id.to_string(),
                trade_number: number,
                symbol: Symbol::new(symbol),
                direction: Direction::Bullish,
                entry_px: d("100"),
                exit_px: d("110"),
                entry_time: TimeMs::new(exit_ms - 500),
                exit_time: TimeMs::new(exit_ms),
                pnl_pct: d(pct),
                pnl_abs: d(abs),
                capital_before: d(before),
                capital_after: d(after),
                cumulative_pnl: d(after) - d("100000"),
                peak_capital: d(peak),
                drawdown: d(dd),
                max_drawdown: d(dd),
            })
            .await
            .unwrap();
        }

        (repo, batch, temp_dir)
    }

    #[tokio::test]
    async fn test_summary_counts_and_latest() {
        let (repo, batch, _temp) = setup().await;

        let summary = repo.batch_summary(&batch.id).await.unwrap();
        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.breakeven_trades, 0);
        assert!((summary.best_pnl_pct - 10.0).abs() < 1e-9);
        assert!((summary.worst_pnl_pct - -20.0).abs() < 1e-9);

        let latest = summary.latest.unwrap();
        assert_eq!(latest.trade_number, 3);
        assert_eq!(latest.capital, "92400");
        assert_eq!(latest.max_drawdown, "20");
    }

    #[tokio::test]
    async fn test_summary_empty_batch() {
        let (repo, _batch, _temp) = setup().await;
        let empty = Batch::new("empty".to_string(), d("100000"), None);
        repo.insert_batch(&empty, &[]).await.unwrap();

        let summary = repo.batch_summary(&empty.id).await.unwrap();
        assert_eq!(summary.total_trades, 0);
        assert!(summary.latest.is_none());
    }

    #[tokio::test]
    async fn test_capital_and_drawdown_series() {
        let (repo, batch, _temp) = setup().await;

        let capital = repo.capital_series(&batch.id).await.unwrap();
        assert_eq!(capital.len(), 3);
        assert_eq!(capital[0].capital, "110000");
        assert_eq!(capital[2].capital, "92400");

        let drawdown = repo.drawdown_series(&batch.id).await.unwrap();
        assert_eq!(drawdown[2].drawdown, "20");
    }

    #[tokio::test]
    async fn test_daily_series_groups_by_exit_date() {
        let (repo, batch, _temp) = setup().await;

        let daily = repo.daily_capital_series(&batch.id).await.unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].day, "1970-01-01");
        assert_eq!(daily[0].trades, 2);
        assert!((daily[0].pnl - 15500.0).abs() < 1e-6);
        // Last-of-day running capital.
        assert_eq!(daily[0].capital, "115500");
        assert_eq!(daily[1].day, "1970-01-02");
        assert_eq!(daily[1].capital, "92400");

        let per_day = repo.trades_per_day(&batch.id).await.unwrap();
        assert_eq!(per_day[0].trades, 2);
        assert_eq!(per_day[1].trades, 1);
    }

    #[tokio::test]
    async fn test_cumulative_and_symbol_breakdown() {
        let (repo, batch, _temp) = setup().await;

        let cumulative = repo.cumulative_trades(&batch.id).await.unwrap();
        assert_eq!(cumulative.len(), 3);
        assert_eq!(cumulative[2].trade_count, 3);

        let breakdown = repo.symbol_breakdown(&batch.id).await.unwrap();
        assert_eq!(breakdown.len(), 2);
        let btc = breakdown.iter().find(|s| s.symbol == "BTCUSD").unwrap();
        assert_eq!(btc.trades, 2);
        assert_eq!(btc.wins, 1);
        assert_eq!(btc.losses, 1);
        assert!((btc.total_pnl - -13100.0).abs() < 1e-6);
    }
}
