//! Trade type: one matched (or still-open) position in one instrument.

use serde::{Deserialize, Serialize};

use crate::domain::{Decimal, Direction, Symbol, TimeMs, TradeStatus};

/// A position opened by an entry signal and closed, at most once, by an
/// exit signal. Exit fields and `pnl_pct` are set together at close and
/// never change afterwards.
///
/// The raw entry and exit alerts are kept as two separate payloads so both
/// pieces of provenance survive losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: Symbol,
    pub timeframe: String,
    pub direction: Direction,
    pub status: TradeStatus,
    pub entry_px: Decimal,
    pub entry_time: TimeMs,
    pub exit_px: Option<Decimal>,
    pub exit_time: Option<TimeMs>,
    pub pnl_pct: Option<Decimal>,
    pub entry_payload: Option<serde_json::Value>,
    pub exit_payload: Option<serde_json::Value>,
}

impl Trade {
    /// Create a new open trade.
    pub fn open(
        symbol: Symbol,
        timeframe: String,
        direction: Direction,
        entry_px: Decimal,
        entry_time: TimeMs,
        entry_payload: Option<serde_json::Value>,
    ) -> Self {
        Trade {
            id: uuid::Uuid::new_v4().to_string(),
            symbol,
            timeframe,
            direction,
            status: TradeStatus::Open,
            entry_px,
            entry_time,
            exit_px: None,
            exit_time: None,
            pnl_pct: None,
            entry_payload,
            exit_payload: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }
}
