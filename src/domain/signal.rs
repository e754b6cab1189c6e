//! Canonical signal record produced by the alert parser.

use serde::{Deserialize, Serialize};

use crate::domain::{Decimal, Direction, SignalKind, Symbol, TimeMs};

/// One normalized inbound alert, whichever shape it arrived in.
///
/// `raw` keeps the original payload verbatim for the trade audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: Symbol,
    pub direction: Option<Direction>,
    pub kind: Option<SignalKind>,
    pub timeframe: String,
    pub price: Decimal,
    pub time: Option<TimeMs>,
    pub close_on_flip: bool,
    pub raw: serde_json::Value,
}

impl Signal {
    /// Direction with the documented default applied.
    pub fn direction_or_default(&self) -> Direction {
        self.direction.unwrap_or(Direction::Bullish)
    }

    /// Signal timestamp, falling back to the current wall clock.
    pub fn time_or_now(&self) -> TimeMs {
        self.time.unwrap_or_else(TimeMs::now)
    }
}
