//! Batch (portfolio) definition and its derived running-totals log row.

use serde::{Deserialize, Serialize};

use crate::domain::{Decimal, Direction, Symbol, TimeMs};

/// A named portfolio: a set of member instruments, a starting capital, and
/// an optional start time. Absent start time means all history counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub capital: Decimal,
    pub start_time: Option<TimeMs>,
    pub created_at: TimeMs,
}

impl Batch {
    pub fn new(name: String, capital: Decimal, start_time: Option<TimeMs>) -> Self {
        Batch {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            capital,
            start_time,
            created_at: TimeMs::now(),
        }
    }

    /// Whether a trade with this entry time falls inside the batch window.
    pub fn covers_entry_time(&self, entry_time: TimeMs) -> bool {
        match self.start_time {
            Some(start) => start <= entry_time,
            None => true,
        }
    }
}

/// One row of a batch's running-totals history: the state of the batch
/// immediately after its Nth matched trade closed, in exit-time order.
///
/// Rows for a batch are totally ordered by `trade_number`;
/// `capital_before` of row n+1 equals `capital_after` of row n, and
/// `peak_capital` / `max_drawdown` never decrease along the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLogEntry {
    pub batch_id: String,
    pub trade_id: String,
    pub trade_number: i64,
    pub symbol: Symbol,
    pub direction: Direction,
    pub entry_px: Decimal,
    pub exit_px: Decimal,
    pub entry_time: TimeMs,
    pub exit_time: TimeMs,
    pub pnl_pct: Decimal,
    pub pnl_abs: Decimal,
    pub capital_before: Decimal,
    pub capital_after: Decimal,
    pub cumulative_pnl: Decimal,
    pub peak_capital: Decimal,
    pub drawdown: Decimal,
    pub max_drawdown: Decimal,
}
