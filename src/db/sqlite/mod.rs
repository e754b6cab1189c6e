//! SQLite-backed implementation of the store traits.

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::domain::{
    Batch, BatchLogEntry, Decimal, Direction, Symbol, TimeMs, Trade, TradeStatus,
};

mod analytics;
mod batch_log;
mod batches;
mod trades;

pub use analytics::{
    BatchSummary, CapitalPoint, CumulativePoint, DailyPoint, DayCount, DrawdownPoint,
    LatestSnapshot, SymbolStat,
};

/// Repository over a SQLite pool, implementing all three store traits.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteRepository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decimal_col(row: &SqliteRow, col: &str) -> Decimal {
    let s: String = row.get(col);
    Decimal::from_str_canonical(&s).unwrap_or_default()
}

fn opt_decimal_col(row: &SqliteRow, col: &str) -> Option<Decimal> {
    let s: Option<String> = row.get(col);
    s.and_then(|s| Decimal::from_str_canonical(&s).ok())
}

fn payload_col(row: &SqliteRow, col: &str) -> Option<serde_json::Value> {
    let s: Option<String> = row.get(col);
    s.and_then(|s| serde_json::from_str(&s).ok())
}

pub(crate) fn map_trade(row: &SqliteRow) -> Trade {
    let direction: String = row.get("direction");
    let status: String = row.get("status");
    let exit_time: Option<i64> = row.get("exit_time_ms");

    Trade {
        id: row.get("id"),
        symbol: Symbol::new(row.get::<String, _>("symbol").as_str()),
        timeframe: row.get("timeframe"),
        direction: Direction::parse(&direction).unwrap_or(Direction::Bullish),
        status: TradeStatus::parse(&status).unwrap_or(TradeStatus::Open),
        entry_px: decimal_col(row, "entry_px"),
        entry_time: TimeMs::new(row.get("entry_time_ms")),
        exit_px: opt_decimal_col(row, "exit_px"),
        exit_time: exit_time.map(TimeMs::new),
        pnl_pct: opt_decimal_col(row, "pnl_pct"),
        entry_payload: payload_col(row, "entry_payload"),
        exit_payload: payload_col(row, "exit_payload"),
    }
}

pub(crate) fn map_batch(row: &SqliteRow) -> Batch {
    let start_time: Option<i64> = row.get("start_time_ms");

    Batch {
        id: row.get("id"),
        name: row.get("name"),
        capital: decimal_col(row, "capital"),
        start_time: start_time.map(TimeMs::new),
        created_at: TimeMs::new(row.get("created_at")),
    }
}

pub(crate) fn map_entry(row: &SqliteRow) -> BatchLogEntry {
    let direction: String = row.get("direction");

    BatchLogEntry {
        batch_id: row.get("batch_id"),
        trade_id: row.get("trade_id"),
        trade_number: row.get("trade_number"),
        symbol: Symbol::new(row.get::<String, _>("symbol").as_str()),
        direction: Direction::parse(&direction).unwrap_or(Direction::Bullish),
        entry_px: decimal_col(row, "entry_px"),
        exit_px: decimal_col(row, "exit_px"),
        entry_time: TimeMs::new(row.get("entry_time_ms")),
        exit_time: TimeMs::new(row.get("exit_time_ms")),
        pnl_pct: decimal_col(row, "pnl_pct"),
        pnl_abs: decimal_col(row, "pnl_abs"),
        capital_before: decimal_col(row, "capital_before"),
        capital_after: decimal_col(row, "capital_after"),
        cumulative_pnl: decimal_col(row, "cumulative_pnl"),
        peak_capital: decimal_col(row, "peak_capital"),
        drawdown: decimal_col(row, "drawdown"),
        max_drawdown: decimal_col(row, "max_drawdown"),
    }
}
