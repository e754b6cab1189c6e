use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::engine::SignalAction;
use crate::error::AppError;
use crate::parser::parse_alert;

use super::trades::TradeDto;
use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResponse {
    pub action: SignalAction,
    pub trade: TradeDto,
}

/// Signal ingestion. The body is either a structured JSON alert or the
/// fixed text sentence; the parser sniffs which.
pub async fn post_webhook(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SignalResponse>, AppError> {
    let signal = parse_alert(&body)?;
    let outcome = state.processor.process(&signal).await?;

    Ok(Json(SignalResponse {
        action: outcome.action,
        trade: TradeDto::from(&outcome.trade),
    }))
}
