//! Alert parsing: normalizes inbound alerts into canonical [`Signal`]s.
//!
//! Two shapes are accepted and sniffed by their leading character: a JSON
//! object (structured alert) and the fixed order-notification sentence
//! handled by [`text`]. Parsing is pure; nothing here touches the store.

use serde_json::Value;
use thiserror::Error;

use crate::domain::{Decimal, Direction, Signal, SignalKind, Symbol, TimeMs};

pub mod text;

pub use text::parse_text_alert;

/// Failure to turn an inbound alert into a canonical signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// Free-text alert does not match the expected sentence template.
    #[error("unrecognized alert text: {0}")]
    Parse(String),
    /// Structured alert is malformed or missing a required field.
    #[error("invalid alert: {0}")]
    Validation(String),
}

/// Parse a raw alert body of either accepted shape.
///
/// # Errors
/// [`AlertError::Validation`] for malformed structured alerts,
/// [`AlertError::Parse`] for text that does not match the template.
pub fn parse_alert(body: &str) -> Result<Signal, AlertError> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| AlertError::Validation(format!("invalid JSON alert: {}", e)))?;
        parse_structured(&value)
    } else {
        parse_text_alert(trimmed)
    }
}

/// Parse a structured JSON alert. Symbol and price are required; side,
/// type, timeframe, and timestamp are optional hints.
pub fn parse_structured(value: &Value) -> Result<Signal, AlertError> {
    let obj = value
        .as_object()
        .ok_or_else(|| AlertError::Validation("alert body must be a JSON object".to_string()))?;

    let symbol = obj
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AlertError::Validation("missing required field: symbol".to_string()))?;

    let price = obj
        .get("price")
        .filter(|v| !v.is_null())
        .ok_or_else(|| AlertError::Validation("missing required field: price".to_string()))
        .and_then(coerce_decimal)?;

    let direction = match optional_str(obj, "side") {
        Some(s) => Some(
            Direction::parse(s)
                .ok_or_else(|| AlertError::Validation(format!("invalid side: {}", s)))?,
        ),
        None => None,
    };

    let kind = match optional_str(obj, "type") {
        Some(s) => Some(
            SignalKind::parse(s)
                .ok_or_else(|| AlertError::Validation(format!("invalid type: {}", s)))?,
        ),
        None => None,
    };

    let time = match optional_str(obj, "timestamp") {
        Some(s) => Some(
            TimeMs::from_rfc3339(s)
                .map_err(|_| AlertError::Validation(format!("invalid timestamp: {}", s)))?,
        ),
        None => None,
    };

    let timeframe = optional_str(obj, "timeframe").unwrap_or("").to_string();
    let close_on_flip = match obj.get("closeonflip") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    Ok(Signal {
        symbol: Symbol::new(symbol),
        direction,
        kind,
        timeframe,
        price,
        time,
        close_on_flip,
        raw: value.clone(),
    })
}

fn optional_str<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn coerce_decimal(value: &Value) -> Result<Decimal, AlertError> {
    let parsed = match value {
        Value::String(s) => Decimal::from_str_canonical(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AlertError::Validation(format!("invalid price: {}", value)))
}
