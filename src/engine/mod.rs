//! Pure computation engines for the deterministic ledger and batch logic.

pub mod batch_log;
pub mod ledger;
pub mod locks;

pub use batch_log::{apply_closed_trade, replay, BatchLogEngine, ClosedTrade, ReplayState};
pub use ledger::{decide, realized_pnl_pct, SignalAction, SignalOutcome, TradeLedger};
pub use locks::KeyedMutex;
