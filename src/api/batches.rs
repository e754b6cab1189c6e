use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::BatchLogStore;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::orchestration::{BatchDetail, BatchUpdate, NewBatch};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub name: String,
    pub capital: Option<Value>,
    pub start_time: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// `startTime` distinguishes absent (leave alone) from explicit null
/// (clear); capital arrives as a JSON number or string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchRequest {
    pub name: Option<String>,
    pub capital: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub start_time: Option<Option<String>>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolsRequest {
    pub symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDto {
    pub id: String,
    pub name: String,
    pub capital: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<i64>,
    pub created_at_ms: i64,
    pub symbols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Value>,
}

impl BatchDto {
    fn from_detail(detail: &BatchDetail) -> Self {
        BatchDto {
            id: detail.batch.id.clone(),
            name: detail.batch.name.clone(),
            capital: detail.batch.capital.to_canonical_string(),
            start_time_ms: detail.batch.start_time.map(|t| t.as_ms()),
            created_at_ms: detail.batch.created_at.as_ms(),
            symbols: detail
                .symbols
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            latest: None,
        }
    }
}

fn parse_capital(value: Option<&Value>) -> Result<Option<crate::domain::Decimal>, AppError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let parsed = match value {
        Value::String(s) => crate::domain::Decimal::from_str_canonical(s.trim()).ok(),
        Value::Number(n) => crate::domain::Decimal::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("invalid capital: {}", value)))
}

fn parse_start_time(value: Option<&str>) -> Result<Option<TimeMs>, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => TimeMs::from_rfc3339(s)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("invalid startTime: {}", s))),
    }
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchDto>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let input = NewBatch {
        name: req.name.trim().to_string(),
        capital: parse_capital(req.capital.as_ref())?,
        start_time: parse_start_time(req.start_time.as_deref())?,
        symbols: req.symbols,
    };

    let detail = state.registry.create(input).await?;
    Ok((StatusCode::CREATED, Json(BatchDto::from_detail(&detail))))
}

pub async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<Vec<BatchDto>>, AppError> {
    let details = state.registry.list().await?;

    let mut dtos = Vec::with_capacity(details.len());
    for detail in &details {
        let mut dto = BatchDto::from_detail(detail);
        if let Some(last) = state.repo.last_entry(&detail.batch.id).await? {
            dto.latest = Some(serde_json::json!({
                "tradeNumber": last.trade_number,
                "capital": last.capital_after.to_canonical_string(),
                "cumulativePnl": last.cumulative_pnl.to_canonical_string(),
                "maxDrawdown": last.max_drawdown.to_canonical_string(),
            }));
        }
        dtos.push(dto);
    }
    Ok(Json(dtos))
}

pub async fn get_batch(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BatchDto>, AppError> {
    let detail = state.registry.get(&id).await?;
    Ok(Json(BatchDto::from_detail(&detail)))
}

pub async fn update_batch(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateBatchRequest>,
) -> Result<Json<BatchDto>, AppError> {
    let start_time = match req.start_time {
        None => None,
        Some(None) => Some(None),
        Some(Some(s)) => Some(parse_start_time(Some(s.as_str()))?),
    };

    let update = BatchUpdate {
        name: req.name,
        capital: parse_capital(req.capital.as_ref())?,
        start_time,
    };

    let detail = state.registry.update(&id, update).await?;
    Ok(Json(BatchDto::from_detail(&detail)))
}

pub async fn delete_batch(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.registry.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_symbols(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SymbolsRequest>,
) -> Result<Json<BatchDto>, AppError> {
    let detail = state.registry.replace_symbols(&id, req.symbols).await?;
    Ok(Json(BatchDto::from_detail(&detail)))
}

pub async fn add_symbol(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SymbolRequest>,
) -> Result<Json<BatchDto>, AppError> {
    if req.symbol.trim().is_empty() {
        return Err(AppError::Validation("symbol must not be empty".to_string()));
    }
    let detail = state.registry.add_symbol(&id, &req.symbol).await?;
    Ok(Json(BatchDto::from_detail(&detail)))
}

pub async fn remove_symbol(
    Path((id, symbol)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<BatchDto>, AppError> {
    let detail = state.registry.remove_symbol(&id, &symbol).await?;
    Ok(Json(BatchDto::from_detail(&detail)))
}
