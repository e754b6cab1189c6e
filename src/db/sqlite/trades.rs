use async_trait::async_trait;

use crate::db::{StoreError, TradeFilter, TradeStore};
use crate::domain::{Symbol, TimeMs, Trade, TradeStatus};

use super::{map_trade, SqliteRepository};

const TRADE_COLUMNS: &str = "id, symbol, timeframe, direction, status, entry_px, entry_time_ms, \
     exit_px, exit_time_ms, pnl_pct, entry_payload, exit_payload";

#[async_trait]
impl TradeStore for SqliteRepository {
    async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, symbol, timeframe, direction, status, entry_px, entry_time_ms,
                exit_px, exit_time_ms, pnl_pct, entry_payload, exit_payload, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trade.id)
        .bind(trade.symbol.as_str())
        .bind(&trade.timeframe)
        .bind(trade.direction.to_string())
        .bind(trade.status.to_string())
        .bind(trade.entry_px.to_canonical_string())
        .bind(trade.entry_time.as_ms())
        .bind(trade.exit_px.map(|d| d.to_canonical_string()))
        .bind(trade.exit_time.map(|t| t.as_ms()))
        .bind(trade.pnl_pct.map(|d| d.to_canonical_string()))
        .bind(trade.entry_payload.as_ref().map(|p| p.to_string()))
        .bind(trade.exit_payload.as_ref().map(|p| p.to_string()))
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn oldest_open_for_symbol(&self, symbol: &Symbol) -> Result<Option<Trade>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM trades WHERE symbol = ? AND status = 'open' \
             ORDER BY entry_time_ms ASC LIMIT 1",
            TRADE_COLUMNS
        ))
        .bind(symbol.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_trade))
    }

    async fn close_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE trades
            SET status = ?, exit_px = ?, exit_time_ms = ?, pnl_pct = ?, exit_payload = ?
            WHERE id = ?
            "#,
        )
        .bind(trade.status.to_string())
        .bind(trade.exit_px.map(|d| d.to_canonical_string()))
        .bind(trade.exit_time.map(|t| t.as_ms()))
        .bind(trade.pnl_pct.map(|d| d.to_canonical_string()))
        .bind(trade.exit_payload.as_ref().map(|p| p.to_string()))
        .bind(&trade.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_trade(&self, id: &str) -> Result<Option<Trade>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_trade))
    }

    async fn list_trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StoreError> {
        let mut sql = format!("SELECT {} FROM trades WHERE 1 = 1", TRADE_COLUMNS);
        if filter.symbol.is_some() {
            sql.push_str(" AND symbol = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY entry_time_ms DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(symbol) = &filter.symbol {
            query = query.bind(symbol.as_str().to_string());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }
        query = query.bind(filter.limit.unwrap_or(-1)).bind(filter.offset);

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(map_trade).collect())
    }

    async fn closed_trades_for_symbols(
        &self,
        symbols: &[Symbol],
        since: Option<TimeMs>,
    ) -> Result<Vec<Trade>, StoreError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; symbols.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM trades \
             WHERE status = 'closed' AND symbol IN ({}) AND entry_time_ms >= ? \
             ORDER BY exit_time_ms ASC, entry_time_ms ASC, id ASC",
            TRADE_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql);
        for symbol in symbols {
            query = query.bind(symbol.as_str().to_string());
        }
        query = query.bind(since.map_or(i64::MIN, |t| t.as_ms()));

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(map_trade).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{Decimal, Direction};
    use tempfile::TempDir;

    async fn setup() -> (SqliteRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (SqliteRepository::new(pool), temp_dir)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn open_trade(symbol: &str, entry_time: i64) -> Trade {
        Trade::open(
            Symbol::new(symbol),
            "1h".to_string(),
            Direction::Bullish,
            d("100"),
            TimeMs::new(entry_time),
            Some(serde_json::json!({"symbol": symbol})),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let (repo, _temp) = setup().await;
        let trade = open_trade("BTCUSD", 1000);
        repo.insert_trade(&trade).await.unwrap();

        let loaded = repo.get_trade(&trade.id).await.unwrap().unwrap();
        assert_eq!(loaded, trade);
    }

    #[tokio::test]
    async fn test_oldest_open_picks_earliest_entry() {
        let (repo, _temp) = setup().await;
        let late = open_trade("BTCUSD", 2000);
        let early = open_trade("BTCUSD", 1000);
        repo.insert_trade(&late).await.unwrap();
        repo.insert_trade(&early).await.unwrap();

        let found = repo
            .oldest_open_for_symbol(&Symbol::new("BTCUSD"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, early.id);
    }

    #[tokio::test]
    async fn test_close_trade_persists_exit_fields() {
        let (repo, _temp) = setup().await;
        let mut trade = open_trade("BTCUSD", 1000);
        repo.insert_trade(&trade).await.unwrap();

        trade.status = TradeStatus::Closed;
        trade.exit_px = Some(d("110"));
        trade.exit_time = Some(TimeMs::new(2000));
        trade.pnl_pct = Some(d("10"));
        trade.exit_payload = Some(serde_json::json!({"text": "closed"}));
        repo.close_trade(&trade).await.unwrap();

        let loaded = repo.get_trade(&trade.id).await.unwrap().unwrap();
        assert_eq!(loaded, trade);
        assert!(repo
            .oldest_open_for_symbol(&Symbol::new("BTCUSD"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_trades_filters() {
        let (repo, _temp) = setup().await;
        repo.insert_trade(&open_trade("BTCUSD", 1000)).await.unwrap();
        repo.insert_trade(&open_trade("ETHUSD", 2000)).await.unwrap();

        let all = repo.list_trades(&TradeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest entry first.
        assert_eq!(all[0].symbol.as_str(), "ETHUSD");

        let filter = TradeFilter {
            symbol: Some(Symbol::new("BTCUSD")),
            ..Default::default()
        };
        let btc = repo.list_trades(&filter).await.unwrap();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].symbol.as_str(), "BTCUSD");
    }

    #[tokio::test]
    async fn test_closed_trades_for_symbols_filters_and_orders() {
        let (repo, _temp) = setup().await;

        let mut t1 = open_trade("BTCUSD", 1000);
        t1.status = TradeStatus::Closed;
        t1.exit_px = Some(d("110"));
        t1.exit_time = Some(TimeMs::new(5000));
        t1.pnl_pct = Some(d("10"));

        let mut t2 = open_trade("ETHUSD", 2000);
        t2.status = TradeStatus::Closed;
        t2.exit_px = Some(d("90"));
        t2.exit_time = Some(TimeMs::new(3000));
        t2.pnl_pct = Some(d("-10"));

        let t3 = open_trade("BTCUSD", 4000); // still open, excluded

        for t in [&t1, &t2, &t3] {
            repo.insert_trade(t).await.unwrap();
        }
        repo.close_trade(&t1).await.unwrap();
        repo.close_trade(&t2).await.unwrap();

        let symbols = vec![Symbol::new("BTCUSD"), Symbol::new("ETHUSD")];
        let closed = repo.closed_trades_for_symbols(&symbols, None).await.unwrap();
        assert_eq!(closed.len(), 2);
        // Ascending by exit time.
        assert_eq!(closed[0].id, t2.id);
        assert_eq!(closed[1].id, t1.id);

        // Entry-time window cutoff.
        let since = repo
            .closed_trades_for_symbols(&symbols, Some(TimeMs::new(1500)))
            .await
            .unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].id, t2.id);
    }
}
