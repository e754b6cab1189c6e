use async_trait::async_trait;
use sqlx::sqlite::Sqlite;
use sqlx::Transaction;

use crate::db::{BatchLogStore, StoreError};
use crate::domain::BatchLogEntry;

use super::{map_entry, SqliteRepository};

const LOG_COLUMNS: &str = "batch_id, trade_id, trade_number, symbol, direction, entry_px, \
     exit_px, entry_time_ms, exit_time_ms, pnl_pct, pnl_abs, capital_before, capital_after, \
     cumulative_pnl, peak_capital, drawdown, max_drawdown";

async fn insert_entry_tx(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &BatchLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO batch_log (
            batch_id, trade_id, trade_number, symbol, direction, entry_px, exit_px,
            entry_time_ms, exit_time_ms, pnl_pct, pnl_abs, capital_before, capital_after,
            cumulative_pnl, peak_capital, drawdown, max_drawdown
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(batch_id, trade_id) DO UPDATE SET
            trade_number = excluded.trade_number,
            symbol = excluded.symbol,
            direction = excluded.direction,
            entry_px = excluded.entry_px,
            exit_px = excluded.exit_px,
            entry_time_ms = excluded.entry_time_ms,
            exit_time_ms = excluded.exit_time_ms,
            pnl_pct = excluded.pnl_pct,
            pnl_abs = excluded.pnl_abs,
            capital_before = excluded.capital_before,
            capital_after = excluded.capital_after,
            cumulative_pnl = excluded.cumulative_pnl,
            peak_capital = excluded.peak_capital,
            drawdown = excluded.drawdown,
            max_drawdown = excluded.max_drawdown
        "#,
    )
    .bind(&entry.batch_id)
    .bind(&entry.trade_id)
    .bind(entry.trade_number)
    .bind(entry.symbol.as_str())
    .bind(entry.direction.to_string())
    .bind(entry.entry_px.to_canonical_string())
    .bind(entry.exit_px.to_canonical_string())
    .bind(entry.entry_time.as_ms())
    .bind(entry.exit_time.as_ms())
    .bind(entry.pnl_pct.to_canonical_string())
    .bind(entry.pnl_abs.to_canonical_string())
    .bind(entry.capital_before.to_canonical_string())
    .bind(entry.capital_after.to_canonical_string())
    .bind(entry.cumulative_pnl.to_canonical_string())
    .bind(entry.peak_capital.to_canonical_string())
    .bind(entry.drawdown.to_canonical_string())
    .bind(entry.max_drawdown.to_canonical_string())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl BatchLogStore for SqliteRepository {
    async fn last_entry(&self, batch_id: &str) -> Result<Option<BatchLogEntry>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM batch_log WHERE batch_id = ? ORDER BY trade_number DESC LIMIT 1",
            LOG_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_entry))
    }

    async fn upsert_entry(&self, entry: &BatchLogEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_entry_tx(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_log(
        &self,
        batch_id: &str,
        entries: &[BatchLogEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM batch_log WHERE batch_id = ?")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            insert_entry_tx(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn entries(
        &self,
        batch_id: &str,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<BatchLogEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM batch_log WHERE batch_id = ? \
             ORDER BY trade_number ASC LIMIT ? OFFSET ?",
            LOG_COLUMNS
        ))
        .bind(batch_id)
        .bind(limit.unwrap_or(-1))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_entry).collect())
    }
}
