//! Store abstraction and its implementations.
//!
//! The engines depend on these traits, never on SQL directly, so tests can
//! substitute the in-memory store without touching any matching or replay
//! logic. Multi-row mutations ([`BatchLogStore::replace_log`], batch
//! deletion) are atomic inside a single store call: readers never observe a
//! partially rebuilt log.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Batch, BatchLogEntry, Symbol, TimeMs, Trade, TradeStatus};

pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use migrations::init_db;
pub use sqlite::SqliteRepository;

/// Failure in the underlying persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Filters for listing trades.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub symbol: Option<Symbol>,
    pub status: Option<TradeStatus>,
    pub limit: Option<i64>,
    pub offset: i64,
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError>;

    /// The single open trade to match an exit against. If the store ever
    /// holds more than one open trade for a symbol, the earliest by entry
    /// time wins.
    async fn oldest_open_for_symbol(&self, symbol: &Symbol) -> Result<Option<Trade>, StoreError>;

    /// Persist the close of a trade: status, exit fields, pnl, exit payload.
    async fn close_trade(&self, trade: &Trade) -> Result<(), StoreError>;

    async fn get_trade(&self, id: &str) -> Result<Option<Trade>, StoreError>;

    /// List trades, newest entry first.
    async fn list_trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StoreError>;

    /// Closed trades for any of `symbols`, ascending by exit time, with
    /// entry time at or after `since` when given. This is the replay input
    /// for a batch rebuild.
    async fn closed_trades_for_symbols(
        &self,
        symbols: &[Symbol],
        since: Option<TimeMs>,
    ) -> Result<Vec<Trade>, StoreError>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn insert_batch(&self, batch: &Batch, symbols: &[Symbol]) -> Result<(), StoreError>;

    async fn get_batch(&self, id: &str) -> Result<Option<Batch>, StoreError>;

    async fn list_batches(&self) -> Result<Vec<Batch>, StoreError>;

    async fn update_batch(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Delete a batch, cascading to membership and log rows. Returns false
    /// if the batch did not exist. Trades are never touched.
    async fn delete_batch(&self, id: &str) -> Result<bool, StoreError>;

    async fn members(&self, id: &str) -> Result<Vec<Symbol>, StoreError>;

    async fn replace_members(&self, id: &str, symbols: &[Symbol]) -> Result<(), StoreError>;

    async fn add_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError>;

    async fn remove_member(&self, id: &str, symbol: &Symbol) -> Result<(), StoreError>;

    async fn batches_containing(&self, symbol: &Symbol) -> Result<Vec<Batch>, StoreError>;
}

#[async_trait]
pub trait BatchLogStore: Send + Sync {
    /// Latest log entry for a batch by trade number, the carry-forward seed
    /// for incremental appends.
    async fn last_entry(&self, batch_id: &str) -> Result<Option<BatchLogEntry>, StoreError>;

    /// Insert keyed by (batch_id, trade_id); reprocessing the same trade
    /// overwrites the derived fields in place.
    async fn upsert_entry(&self, entry: &BatchLogEntry) -> Result<(), StoreError>;

    /// Atomically replace a batch's whole log with `entries`.
    async fn replace_log(&self, batch_id: &str, entries: &[BatchLogEntry])
        -> Result<(), StoreError>;

    /// Log entries ascending by trade number.
    async fn entries(
        &self,
        batch_id: &str,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<BatchLogEntry>, StoreError>;
}
