//! Batch registry: CRUD over batch definitions and instrument membership.
//!
//! No PnL logic lives here. Every mutation that changes which trades a
//! batch sees, or the capital baseline, triggers a full log rebuild before
//! returning, so readers always see a log consistent with the definition.

use std::sync::Arc;
use thiserror::Error;

use crate::db::{BatchStore, StoreError};
use crate::domain::{Batch, Decimal, Symbol, TimeMs};
use crate::engine::BatchLogEngine;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("batch not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct NewBatch {
    pub name: String,
    pub capital: Option<Decimal>,
    pub start_time: Option<TimeMs>,
    pub symbols: Vec<String>,
}

/// Partial update; `start_time` distinguishes "leave alone" (None) from
/// "clear" (Some(None)).
#[derive(Debug, Clone, Default)]
pub struct BatchUpdate {
    pub name: Option<String>,
    pub capital: Option<Decimal>,
    pub start_time: Option<Option<TimeMs>>,
}

#[derive(Debug, Clone)]
pub struct BatchDetail {
    pub batch: Batch,
    pub symbols: Vec<Symbol>,
}

pub struct BatchRegistry {
    batches: Arc<dyn BatchStore>,
    engine: Arc<BatchLogEngine>,
    default_capital: Decimal,
}

impl BatchRegistry {
    pub fn new(
        batches: Arc<dyn BatchStore>,
        engine: Arc<BatchLogEngine>,
        default_capital: Decimal,
    ) -> Self {
        BatchRegistry {
            batches,
            engine,
            default_capital,
        }
    }

    pub async fn create(&self, input: NewBatch) -> Result<BatchDetail, RegistryError> {
        let batch = Batch::new(
            input.name,
            input.capital.unwrap_or(self.default_capital),
            input.start_time,
        );
        let symbols: Vec<Symbol> = input.symbols.iter().map(|s| Symbol::new(s)).collect();

        self.batches.insert_batch(&batch, &symbols).await?;
        let symbols = self.batches.members(&batch.id).await?;
        self.engine.rebuild(&batch, &symbols).await?;

        tracing::info!(batch_id = %batch.id, name = %batch.name, "created batch");
        Ok(BatchDetail { batch, symbols })
    }

    pub async fn get(&self, id: &str) -> Result<BatchDetail, RegistryError> {
        let batch = self.require(id).await?;
        let symbols = self.batches.members(id).await?;
        Ok(BatchDetail { batch, symbols })
    }

    pub async fn list(&self) -> Result<Vec<BatchDetail>, RegistryError> {
        let mut details = Vec::new();
        for batch in self.batches.list_batches().await? {
            let symbols = self.batches.members(&batch.id).await?;
            details.push(BatchDetail { batch, symbols });
        }
        Ok(details)
    }

    pub async fn update(&self, id: &str, update: BatchUpdate) -> Result<BatchDetail, RegistryError> {
        let mut batch = self.require(id).await?;

        if let Some(name) = update.name {
            batch.name = name;
        }
        if let Some(capital) = update.capital {
            batch.capital = capital;
        }
        if let Some(start_time) = update.start_time {
            batch.start_time = start_time;
        }

        self.batches.update_batch(&batch).await?;
        let symbols = self.batches.members(id).await?;
        self.engine.rebuild(&batch, &symbols).await?;

        tracing::info!(batch_id = %batch.id, "updated batch");
        Ok(BatchDetail { batch, symbols })
    }

    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        if !self.batches.delete_batch(id).await? {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        tracing::info!(batch_id = %id, "deleted batch");
        Ok(())
    }

    pub async fn replace_symbols(
        &self,
        id: &str,
        symbols: Vec<String>,
    ) -> Result<BatchDetail, RegistryError> {
        let batch = self.require(id).await?;
        let normalized: Vec<Symbol> = symbols.iter().map(|s| Symbol::new(s)).collect();
        self.batches.replace_members(id, &normalized).await?;
        self.rebuilt_detail(batch).await
    }

    pub async fn add_symbol(&self, id: &str, symbol: &str) -> Result<BatchDetail, RegistryError> {
        let batch = self.require(id).await?;
        self.batches.add_member(id, &Symbol::new(symbol)).await?;
        self.rebuilt_detail(batch).await
    }

    pub async fn remove_symbol(
        &self,
        id: &str,
        symbol: &str,
    ) -> Result<BatchDetail, RegistryError> {
        let batch = self.require(id).await?;
        self.batches.remove_member(id, &Symbol::new(symbol)).await?;
        self.rebuilt_detail(batch).await
    }

    async fn require(&self, id: &str) -> Result<Batch, RegistryError> {
        self.batches
            .get_batch(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    async fn rebuilt_detail(&self, batch: Batch) -> Result<BatchDetail, RegistryError> {
        let symbols = self.batches.members(&batch.id).await?;
        self.engine.rebuild(&batch, &symbols).await?;
        tracing::info!(batch_id = %batch.id, members = symbols.len(), "updated batch membership");
        Ok(BatchDetail { batch, symbols })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BatchLogStore, MemoryStore, TradeStore};
    use crate::domain::{Direction, Trade, TradeStatus};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    async fn seed_closed_trade(store: &MemoryStore, symbol: &str, pnl_pct: &str, exit_ms: i64) {
        let mut trade = Trade::open(
            Symbol::new(symbol),
            String::new(),
            Direction::Bullish,
            d("100"),
            TimeMs::new(exit_ms - 500),
            None,
        );
        trade.status = TradeStatus::Closed;
        trade.exit_px = Some(d("110"));
        trade.exit_time = Some(TimeMs::new(exit_ms));
        trade.pnl_pct = Some(d(pnl_pct));
        store.insert_trade(&trade).await.unwrap();
    }

    fn registry(store: &Arc<MemoryStore>) -> BatchRegistry {
        let engine = Arc::new(BatchLogEngine::new(store.clone(), store.clone()));
        BatchRegistry::new(store.clone(), engine, d("100000"))
    }

    #[tokio::test]
    async fn test_create_applies_default_capital_and_normalizes_symbols() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(&store);

        let detail = registry
            .create(NewBatch {
                name: "alpha".to_string(),
                symbols: vec!["btcusd".to_string(), "ethusd".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(detail.batch.capital, d("100000"));
        assert!(detail.symbols.contains(&Symbol::new("BTCUSD")));
        assert!(detail.symbols.contains(&Symbol::new("ETHUSD")));
    }

    #[tokio::test]
    async fn test_create_rebuilds_from_existing_history() {
        let store = Arc::new(MemoryStore::new());
        seed_closed_trade(&store, "BTCUSD", "10", 1000).await;
        let registry = registry(&store);

        let detail = registry
            .create(NewBatch {
                name: "alpha".to_string(),
                symbols: vec!["BTCUSD".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        let log = store.entries(&detail.batch.id, None, 0).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].capital_after, d("110000"));
    }

    #[tokio::test]
    async fn test_capital_update_triggers_rebuild() {
        let store = Arc::new(MemoryStore::new());
        seed_closed_trade(&store, "BTCUSD", "10", 1000).await;
        let registry = registry(&store);

        let detail = registry
            .create(NewBatch {
                name: "alpha".to_string(),
                symbols: vec!["BTCUSD".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        registry
            .update(
                &detail.batch.id,
                BatchUpdate {
                    capital: Some(d("50000")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let log = store.entries(&detail.batch.id, None, 0).await.unwrap();
        assert_eq!(log[0].capital_before, d("50000"));
        assert_eq!(log[0].capital_after, d("55000"));
    }

    #[tokio::test]
    async fn test_remove_then_readd_symbol_reproduces_log() {
        let store = Arc::new(MemoryStore::new());
        seed_closed_trade(&store, "BTCUSD", "10", 1000).await;
        seed_closed_trade(&store, "ETHUSD", "-5", 2000).await;
        let registry = registry(&store);

        let detail = registry
            .create(NewBatch {
                name: "alpha".to_string(),
                symbols: vec!["BTCUSD".to_string(), "ETHUSD".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        let id = detail.batch.id.clone();

        let before = store.entries(&id, None, 0).await.unwrap();
        assert_eq!(before.len(), 2);

        registry.remove_symbol(&id, "ETHUSD").await.unwrap();
        assert_eq!(store.entries(&id, None, 0).await.unwrap().len(), 1);

        registry.add_symbol(&id, "ETHUSD").await.unwrap();
        let after = store.entries(&id, None, 0).await.unwrap();
        // Pure function of membership + trades, not of edit history.
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_start_time_window_excludes_earlier_entries() {
        let store = Arc::new(MemoryStore::new());
        seed_closed_trade(&store, "BTCUSD", "10", 1000).await;
        seed_closed_trade(&store, "BTCUSD", "20", 5000).await;
        let registry = registry(&store);

        let detail = registry
            .create(NewBatch {
                name: "alpha".to_string(),
                start_time: Some(TimeMs::new(2000)),
                symbols: vec!["BTCUSD".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        let log = store.entries(&detail.batch.id, None, 0).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].pnl_pct, d("20"));
        assert_eq!(log[0].trade_number, 1);
    }

    #[tokio::test]
    async fn test_unknown_batch_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(&store);

        assert!(matches!(
            registry.get("missing").await,
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.delete("missing").await,
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.add_symbol("missing", "BTCUSD").await,
            Err(RegistryError::NotFound(_))
        ));
    }
}
