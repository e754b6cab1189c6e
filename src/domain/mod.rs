//! Domain types for the signal ledger and batch analytics engine.
//!
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: TimeMs, Symbol, Direction, SignalKind, TradeStatus
//! - Signal, Trade, Batch, and BatchLogEntry records

pub mod batch;
pub mod decimal;
pub mod primitives;
pub mod signal;
pub mod trade;

pub use batch::{Batch, BatchLogEntry};
pub use decimal::Decimal;
pub use primitives::{Direction, SignalKind, Symbol, TimeMs, TradeStatus};
pub use signal::Signal;
pub use trade::Trade;
