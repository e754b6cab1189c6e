use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{TradeFilter, TradeStore};
use crate::domain::{Symbol, Trade, TradeStatus};
use crate::error::AppError;

use super::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub symbol: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub id: String,
    pub symbol: String,
    pub timeframe: String,
    pub direction: String,
    pub status: String,
    pub entry_px: String,
    pub entry_time_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_px: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_pct: Option<String>,
}

impl From<&Trade> for TradeDto {
    fn from(trade: &Trade) -> Self {
        TradeDto {
            id: trade.id.clone(),
            symbol: trade.symbol.as_str().to_string(),
            timeframe: trade.timeframe.clone(),
            direction: trade.direction.to_string(),
            status: trade.status.to_string(),
            entry_px: trade.entry_px.to_canonical_string(),
            entry_time_ms: trade.entry_time.as_ms(),
            exit_px: trade.exit_px.map(|d| d.to_canonical_string()),
            exit_time_ms: trade.exit_time.map(|t| t.as_ms()),
            pnl_pct: trade.pnl_pct.map(|d| d.to_canonical_string()),
        }
    }
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(
            TradeStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("invalid status: {}", s)))?,
        ),
        None => None,
    };

    let filter = TradeFilter {
        symbol: params
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Symbol::new),
        status,
        limit: Some(params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000)),
        offset: params.offset.unwrap_or(0).max(0),
    };

    let trades = state.repo.list_trades(&filter).await?;
    Ok(Json(TradesResponse {
        trades: trades.iter().map(TradeDto::from).collect(),
    }))
}
