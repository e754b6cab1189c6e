//! Read-only analytics endpoints, all scoped to one batch and derived
//! purely from its log rows.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::sqlite::{
    BatchSummary, CapitalPoint, CumulativePoint, DailyPoint, DayCount, DrawdownPoint, SymbolStat,
};
use crate::db::BatchLogStore;
use crate::domain::BatchLogEntry;
use crate::error::AppError;

use super::AppState;

const DEFAULT_LOG_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub entries: Vec<LogEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryDto {
    pub trade_number: i64,
    pub trade_id: String,
    pub symbol: String,
    pub direction: String,
    pub entry_px: String,
    pub exit_px: String,
    pub entry_time_ms: i64,
    pub exit_time_ms: i64,
    pub pnl_pct: String,
    pub pnl_abs: String,
    pub capital_before: String,
    pub capital_after: String,
    pub cumulative_pnl: String,
    pub peak_capital: String,
    pub drawdown: String,
    pub max_drawdown: String,
}

impl From<&BatchLogEntry> for LogEntryDto {
    fn from(e: &BatchLogEntry) -> Self {
        LogEntryDto {
            trade_number: e.trade_number,
            trade_id: e.trade_id.clone(),
            symbol: e.symbol.as_str().to_string(),
            direction: e.direction.to_string(),
            entry_px: e.entry_px.to_canonical_string(),
            exit_px: e.exit_px.to_canonical_string(),
            entry_time_ms: e.entry_time.as_ms(),
            exit_time_ms: e.exit_time.as_ms(),
            pnl_pct: e.pnl_pct.to_canonical_string(),
            pnl_abs: e.pnl_abs.to_canonical_string(),
            capital_before: e.capital_before.to_canonical_string(),
            capital_after: e.capital_after.to_canonical_string(),
            cumulative_pnl: e.cumulative_pnl.to_canonical_string(),
            peak_capital: e.peak_capital.to_canonical_string(),
            drawdown: e.drawdown.to_canonical_string(),
            max_drawdown: e.max_drawdown.to_canonical_string(),
        }
    }
}

/// 404 for an unknown batch before any aggregation runs.
async fn require_batch(state: &AppState, id: &str) -> Result<(), AppError> {
    state.registry.get(id).await?;
    Ok(())
}

pub async fn get_summary(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BatchSummary>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.batch_summary(&id).await?))
}

pub async fn get_log(
    Path(id): Path<String>,
    Query(params): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Json<LogResponse>, AppError> {
    require_batch(&state, &id).await?;

    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);
    let entries = state.repo.entries(&id, Some(limit), offset).await?;

    Ok(Json(LogResponse {
        entries: entries.iter().map(LogEntryDto::from).collect(),
    }))
}

pub async fn get_capital(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CapitalPoint>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.capital_series(&id).await?))
}

pub async fn get_capital_daily(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyPoint>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.daily_capital_series(&id).await?))
}

pub async fn get_trades_per_day(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DayCount>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.trades_per_day(&id).await?))
}

pub async fn get_trade_count(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CumulativePoint>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.cumulative_trades(&id).await?))
}

pub async fn get_symbol_breakdown(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SymbolStat>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.symbol_breakdown(&id).await?))
}

pub async fn get_drawdown(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DrawdownPoint>>, AppError> {
    require_batch(&state, &id).await?;
    Ok(Json(state.repo.drawdown_series(&id).await?))
}

pub async fn export_csv(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    require_batch(&state, &id).await?;
    let entries = state.repo.entries(&id, None, 0).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "trade_number",
            "trade_id",
            "symbol",
            "direction",
            "entry_px",
            "exit_px",
            "entry_time_ms",
            "exit_time_ms",
            "pnl_pct",
            "pnl_abs",
            "capital_before",
            "capital_after",
            "cumulative_pnl",
            "peak_capital",
            "drawdown",
            "max_drawdown",
        ])
        .map_err(csv_error)?;

    for e in &entries {
        writer
            .write_record([
                e.trade_number.to_string(),
                e.trade_id.clone(),
                e.symbol.as_str().to_string(),
                e.direction.to_string(),
                e.entry_px.to_canonical_string(),
                e.exit_px.to_canonical_string(),
                e.entry_time.as_ms().to_string(),
                e.exit_time.as_ms().to_string(),
                e.pnl_pct.to_canonical_string(),
                e.pnl_abs.to_canonical_string(),
                e.capital_before.to_canonical_string(),
                e.capital_after.to_canonical_string(),
                e.cumulative_pnl.to_canonical_string(),
                e.peak_capital.to_canonical_string(),
                e.drawdown.to_canonical_string(),
                e.max_drawdown.to_canonical_string(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Storage(format!("failed to encode csv: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"batch-{}.csv\"", id),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Storage(format!("failed to encode csv: {}", e))
}
