//! Batch log derivation: the running-totals analytics core.
//!
//! One per-trade formula, used by both entry points: incremental append
//! when a trade closes, and full replay when a batch's defining parameters
//! change. The log is a pure function of {capital, start time, membership,
//! matching closed trades in exit order}, which is what makes rebuilding
//! from scratch safe to run on every edit.
//!
//! Rounding happens only at the persisted row; the replay state carries
//! full precision forward so a long history does not compound rounding
//! error.

use std::sync::Arc;

use crate::db::{BatchLogStore, StoreError, TradeStore};
use crate::domain::{Batch, BatchLogEntry, Decimal, Direction, Symbol, TimeMs, Trade};
use crate::engine::locks::KeyedMutex;

/// Carry-forward state between consecutive log rows. Values are unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayState {
    pub capital: Decimal,
    pub peak: Decimal,
    pub max_drawdown: Decimal,
    pub next_number: i64,
}

impl ReplayState {
    /// State before any trade: capital and peak sit at the batch's
    /// starting capital.
    pub fn seed(capital: Decimal) -> Self {
        ReplayState {
            capital,
            peak: capital,
            max_drawdown: Decimal::zero(),
            next_number: 1,
        }
    }

    /// Resume from the batch's last persisted row.
    pub fn from_last(entry: &BatchLogEntry) -> Self {
        ReplayState {
            capital: entry.capital_after,
            peak: entry.peak_capital,
            max_drawdown: entry.max_drawdown,
            next_number: entry.trade_number + 1,
        }
    }
}

/// The closed-trade facts a log row copies forward.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub id: String,
    pub symbol: Symbol,
    pub direction: Direction,
    pub entry_px: Decimal,
    pub exit_px: Decimal,
    pub entry_time: TimeMs,
    pub exit_time: TimeMs,
    pub pnl_pct: Decimal,
}

impl ClosedTrade {
    /// None while the trade is still open.
    pub fn from_trade(trade: &Trade) -> Option<Self> {
        Some(ClosedTrade {
            id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            direction: trade.direction,
            entry_px: trade.entry_px,
            exit_px: trade.exit_px?,
            entry_time: trade.entry_time,
            exit_time: trade.exit_time?,
            pnl_pct: trade.pnl_pct?,
        })
    }
}

/// Apply one closed trade to the running state, producing the persisted
/// row (rounded: money 2dp, percentages 4dp) and the next unrounded state.
pub fn apply_closed_trade(
    batch: &Batch,
    state: &ReplayState,
    trade: &ClosedTrade,
) -> (BatchLogEntry, ReplayState) {
    let capital_before = state.capital;
    let pnl_abs = capital_before * trade.pnl_pct / Decimal::hundred();
    let capital_after = capital_before + pnl_abs;
    let peak = state.peak.max(capital_after);
    let drawdown = if peak.is_positive() {
        (peak - capital_after) / peak * Decimal::hundred()
    } else {
        Decimal::zero()
    };
    let max_drawdown = state.max_drawdown.max(drawdown);
    let cumulative_pnl = capital_after - batch.capital;

    let entry = BatchLogEntry {
        batch_id: batch.id.clone(),
        trade_id: trade.id.clone(),
        trade_number: state.next_number,
        symbol: trade.symbol.clone(),
        direction: trade.direction,
        entry_px: trade.entry_px,
        exit_px: trade.exit_px,
        entry_time: trade.entry_time,
        exit_time: trade.exit_time,
        pnl_pct: trade.pnl_pct,
        pnl_abs: pnl_abs.round_money(),
        capital_before: capital_before.round_money(),
        capital_after: capital_after.round_money(),
        cumulative_pnl: cumulative_pnl.round_money(),
        peak_capital: peak.round_money(),
        drawdown: drawdown.round_pct(),
        max_drawdown: max_drawdown.round_pct(),
    };

    let next = ReplayState {
        capital: capital_after,
        peak,
        max_drawdown,
        next_number: state.next_number + 1,
    };

    (entry, next)
}

/// Replay a closed-trade history from scratch into a full log.
pub fn replay(batch: &Batch, trades: &[ClosedTrade]) -> Vec<BatchLogEntry> {
    let mut state = ReplayState::seed(batch.capital);
    let mut rows = Vec::with_capacity(trades.len());
    for trade in trades {
        let (entry, next) = apply_closed_trade(batch, &state, trade);
        rows.push(entry);
        state = next;
    }
    rows
}

pub struct BatchLogEngine {
    trades: Arc<dyn TradeStore>,
    log: Arc<dyn BatchLogStore>,
    batch_locks: KeyedMutex,
}

impl BatchLogEngine {
    pub fn new(trades: Arc<dyn TradeStore>, log: Arc<dyn BatchLogStore>) -> Self {
        BatchLogEngine {
            trades,
            log,
            batch_locks: KeyedMutex::new(),
        }
    }

    /// Append one just-closed trade to a batch's log, carrying the running
    /// totals forward from the batch's last row.
    ///
    /// Keyed by (batch, trade): reprocessing the same close overwrites the
    /// derived fields instead of duplicating the row. Returns None if the
    /// trade is not actually closed.
    pub async fn append_closed(
        &self,
        batch: &Batch,
        trade: &Trade,
    ) -> Result<Option<BatchLogEntry>, StoreError> {
        let Some(closed) = ClosedTrade::from_trade(trade) else {
            tracing::warn!(trade_id = %trade.id, "skipping append of non-closed trade");
            return Ok(None);
        };

        let _guard = self.batch_locks.acquire(&batch.id).await;

        let state = match self.log.last_entry(&batch.id).await? {
            Some(last) => ReplayState::from_last(&last),
            None => ReplayState::seed(batch.capital),
        };
        let (entry, _) = apply_closed_trade(batch, &state, &closed);
        self.log.upsert_entry(&entry).await?;

        tracing::info!(
            batch_id = %batch.id,
            trade_id = %trade.id,
            trade_number = entry.trade_number,
            capital = %entry.capital_after,
            "appended batch log entry"
        );
        Ok(Some(entry))
    }

    /// Rebuild a batch's entire log from its defining parameters and the
    /// global trade history. Deterministic and idempotent; run on every
    /// capital, start-time, or membership change.
    pub async fn rebuild(&self, batch: &Batch, members: &[Symbol]) -> Result<usize, StoreError> {
        let _guard = self.batch_locks.acquire(&batch.id).await;

        if members.is_empty() {
            self.log.replace_log(&batch.id, &[]).await?;
            tracing::info!(batch_id = %batch.id, "rebuilt batch log (no members)");
            return Ok(0);
        }

        let history = self
            .trades
            .closed_trades_for_symbols(members, batch.start_time)
            .await?;
        let closed: Vec<ClosedTrade> = history.iter().filter_map(ClosedTrade::from_trade).collect();
        let rows = replay(batch, &closed);
        self.log.replace_log(&batch.id, &rows).await?;

        tracing::info!(batch_id = %batch.id, rows = rows.len(), "rebuilt batch log");
        Ok(rows.len())
    }
}
