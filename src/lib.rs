pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod parser;

pub use config::Config;
pub use db::{
    init_db, BatchLogStore, BatchStore, MemoryStore, SqliteRepository, StoreError, TradeFilter,
    TradeStore,
};
pub use domain::{
    Batch, BatchLogEntry, Decimal, Direction, Signal, SignalKind, Symbol, TimeMs, Trade,
    TradeStatus,
};
pub use engine::{BatchLogEngine, SignalAction, SignalOutcome, TradeLedger};
pub use error::AppError;
pub use orchestration::{BatchRegistry, SignalProcessor};
pub use parser::{parse_alert, AlertError};
