//! In-memory store implementation for tests.
//!
//! Implements the same traits as the SQLite repository so the engines can
//! be exercised without a database file.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::{BatchLogStore, BatchStore, StoreError, TradeFilter, TradeStore};
use crate::domain::{Batch, BatchLogEntry, Symbol, TimeMs, Trade, TradeStatus};

#[derive(Default)]
pub struct MemoryStore {
    trades: Mutex<Vec<Trade>>,
    batches: Mutex<Vec<Batch>>,
    members: Mutex<HashMap<String, Vec<Symbol>>>,
    log: Mutex<Vec<BatchLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.lock().unwrap().push(trade.clone());
        Ok(())
    }

    async fn oldest_open_for_symbol(&self, symbol: &Symbol) -> Result<Option<Trade>, StoreError> {
        let trades = self.trades.lock().unwrap();
        Ok(trades
            .iter()
            .filter(|t| t.is_open() && &t.symbol == symbol)
            .min_by_key(|t| t.entry_time)
            .cloned())
    }

    async fn close_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        let mut trades = self.trades.lock().unwrap();
        if let Some(existing) = trades.iter_mut().find(|t| t.id == trade.id) {
            *existing = trade.clone();
        }
        Ok(())
    }

    async fn get_trade(&self, id: &str) -> Result<Option<Trade>, StoreError> {
        let trades = self.trades.lock().unwrap();
        Ok(trades.iter().find(|t| t.id == id).cloned())
    }

    async fn list_trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StoreError> {
        let trades = self.trades.lock().unwrap();
        let mut matched: Vec<Trade> = trades
            .iter()
            .filter(|t| filter.symbol.as_ref().map_or(true, |s| &t.symbol == s))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));

        let offset = filter.offset.max(0) as usize;
        let limited: Vec<Trade> = match filter.limit {
            Some(limit) => matched
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .collect(),
            None => matched.into_iter().skip(offset).collect(),
        };
        Ok(limited)
    }

    async fn closed_trades_for_symbols(
        &self,
        symbols: &[Symbol],
        since: Option<TimeMs>,
    ) -> Result<Vec<Trade>, StoreError> {
        let trades = self.trades.lock().unwrap();
        let mut matched: Vec<Trade> = trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed)
            .filter(|t| symbols.contains(&t.symbol))
            .filter(|t| since.map_or(true, |s| t.entry_time >= s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            (a.exit_time, a.entry_time, a.id.clone()).cmp(&(
                b.exit_time,
                b.entry_time,
                b.id.clone(),
            ))
        });
        Ok(matched)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn insert_batch(&self, batch: &Batch, symbols: &[Symbol]) -> Result<(), StoreError> {
        self.batches.lock().unwrap().push(batch.clone());
        let mut deduped: Vec<Symbol> = Vec::new();
        for s in symbols {
            if !deduped.contains(s) {
                deduped.push(s.clone());
            }
        }
        self.members.lock().unwrap().insert(batch.id.clone(), deduped);
        Ok(())
    }

    async fn get_batch(&self, id: &str) -> Result<Option<Batch>, StoreError> {
        let batches = self.batches.lock().unwrap();
        Ok(batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, StoreError> {
        Ok(self.batches.lock().unwrap().clone())
    }

    async fn update_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        let mut batches = self.batches.lock().unwrap();
        if let Some(existing) = batches.iter_mut().find(|b| b.id == batch.id) {
            *existing = batch.clone();
        }
        Ok(())
    }

    async fn delete_batch(&self, id: &str) -> Result<bool, StoreError> {
        let mut batches = self.batches.lock().unwrap();
        let before = batches.len();
        batches.retain(|b| b.id != id);
        self.members.lock().unwrap().remove(id);
        self.log.lock().unwrap().retain(|e| e.batch_id != id);
        Ok(batches.len() < before)
    }

    async fn members(&self, id: &str) -> Result<Vec<Symbol>, StoreError> {
        let members = self.members.lock().unwrap();
        let mut symbols = members.get(id).cloned().unwrap_or_default();
        symbols.sort();
        Ok(symbols)
    }

    async fn replace_members(&self, id: &str, symbols: &[Symbol]) -> Result<(), StoreError> {
        let mut deduped: Vec<Symbol> = Vec::new();
        for s in symbols {
            if !deduped.contains(s) {
                deduped.push(s.clone());
            }
        }
        self.members.lock().unwrap().insert(id.to_string(), deduped);
        Ok(())
    }

    async fn add_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError> {
        let mut members = self.members.lock().unwrap();
        let entry = members.entry(id.to_string()).or_default();
        if !entry.contains(symbol) {
            entry.push(symbol.clone());
        }
        Ok(())
    }

    async fn remove_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError> {
        let mut members = self.members.lock().unwrap();
        if let Some(entry) = members.get_mut(id) {
            entry.retain(|s| s != symbol);
        }
        Ok(())
    }

    async fn batches_containing(&self, symbol: &Symbol) -> Result<Vec<Batch>, StoreError> {
        let members = self.members.lock().unwrap();
        let batches = self.batches.lock().unwrap();
        Ok(batches
            .iter()
            .filter(|b| members.get(&b.id).is_some_and(|m| m.contains(symbol)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BatchLogStore for MemoryStore {
    async fn last_entry(&self, batch_id: &str) -> Result<Option<BatchLogEntry>, StoreError> {
        let log = self.log.lock().unwrap();
        Ok(log
            .iter()
            .filter(|e| e.batch_id == batch_id)
            .max_by_key(|e| e.trade_number)
            .cloned())
    }

    async fn upsert_entry(&self, entry: &BatchLogEntry) -> Result<(), StoreError> {
        let mut log = self.log.lock().unwrap();
        if let Some(existing) = log
            .iter_mut()
            .find(|e| e.batch_id == entry.batch_id && e.trade_id == entry.trade_id)
        {
            *existing = entry.clone();
        } else {
            log.push(entry.clone());
        }
        Ok(())
    }

    async fn replace_log(
        &self,
        batch_id: &str,
        entries: &[BatchLogEntry],
    ) -> Result<(), StoreError> {
        let mut log = self.log.lock().unwrap();
        log.retain(|e| e.batch_id != batch_id);
        log.extend_from_slice(entries);
        Ok(())
    }

    async fn entries(
        &self,
        batch_id: &str,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<BatchLogEntry>, StoreError> {
        let log = self.log.lock().unwrap();
        let mut matched: Vec<BatchLogEntry> = log
            .iter()
            .filter(|e| e.batch_id == batch_id)
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.trade_number);

        let offset = offset.max(0) as usize;
        Ok(match limit {
            Some(limit) => matched
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .collect(),
            None => matched.into_iter().skip(offset).collect(),
        })
    }
}
