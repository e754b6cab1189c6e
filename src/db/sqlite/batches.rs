use async_trait::async_trait;

use crate::db::{BatchStore, StoreError};
use crate::domain::{Batch, Symbol};

use super::{map_batch, SqliteRepository};

const BATCH_COLUMNS: &str = "id, name, capital, start_time_ms, created_at";

#[async_trait]
impl BatchStore for SqliteRepository {
    async fn insert_batch(&self, batch: &Batch, symbols: &[Symbol]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO batches (id, name, capital, start_time_ms, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&batch.id)
        .bind(&batch.name)
        .bind(batch.capital.to_canonical_string())
        .bind(batch.start_time.map(|t| t.as_ms()))
        .bind(batch.created_at.as_ms())
        .execute(&mut *tx)
        .await?;

        for symbol in symbols {
            sqlx::query("INSERT OR IGNORE INTO batch_symbols (batch_id, symbol) VALUES (?, ?)")
                .bind(&batch.id)
                .bind(symbol.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_batch(&self, id: &str) -> Result<Option<Batch>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM batches WHERE id = ?", BATCH_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_batch))
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM batches ORDER BY created_at ASC, id ASC",
            BATCH_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_batch).collect())
    }

    async fn update_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        sqlx::query("UPDATE batches SET name = ?, capital = ?, start_time_ms = ? WHERE id = ?")
            .bind(&batch.name)
            .bind(batch.capital.to_canonical_string())
            .bind(batch.start_time.map(|t| t.as_ms()))
            .bind(&batch.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_batch(&self, id: &str) -> Result<bool, StoreError> {
        // Membership and log rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM batches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn members(&self, id: &str) -> Result<Vec<Symbol>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT symbol FROM batch_symbols WHERE batch_id = ? ORDER BY symbol ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(s,)| Symbol::new(&s)).collect())
    }

    async fn replace_members(&self, id: &str, symbols: &[Symbol]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM batch_symbols WHERE batch_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for symbol in symbols {
            sqlx::query("INSERT OR IGNORE INTO batch_symbols (batch_id, symbol) VALUES (?, ?)")
                .bind(id)
                .bind(symbol.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO batch_symbols (batch_id, symbol) VALUES (?, ?)")
            .bind(id)
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM batch_symbols WHERE batch_id = ? AND symbol = ?")
            .bind(id)
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn batches_containing(&self, symbol: &Symbol) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(
            "SELECT b.id, b.name, b.capital, b.start_time_ms, b.created_at \
             FROM batches b \
             JOIN batch_symbols s ON s.batch_id = b.id \
             WHERE s.symbol = ? \
             ORDER BY b.created_at ASC, b.id ASC",
        )
        .bind(symbol.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_batch).collect())
    }
}
