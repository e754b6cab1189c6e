//! Parser for the fixed order-notification sentence:
//!
//! `{buy|sell} {qty} @ {price} on {symbol} ({timestamp}). Position:
//! {posQty} @ avg {avgPrice}. Order ID: {orderId}`
//!
//! The grammar is matched structurally, marker by marker; anything that
//! deviates is rejected rather than guessed at. Entry/exit and direction
//! are derived from the reported position after the order: a zero position
//! means the order flattened it (exit), otherwise the order opened or
//! holds a position whose sign gives the direction.

use serde_json::json;

use crate::domain::{Decimal, Direction, Signal, SignalKind, Symbol, TimeMs};
use crate::parser::AlertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Buy,
    Sell,
}

/// Parse one text alert into a canonical signal.
///
/// # Errors
/// Returns [`AlertError::Parse`] when the sentence does not match the
/// template.
pub fn parse_text_alert(text: &str) -> Result<Signal, AlertError> {
    let fail = |reason: &str| AlertError::Parse(format!("{}: {:?}", reason, text));

    let (head, tail) = text
        .split_once(" on ")
        .ok_or_else(|| fail("missing 'on' clause"))?;

    // head: "{buy|sell} {qty} @ {price}"
    let head_tokens: Vec<&str> = head.split_whitespace().collect();
    let &[action_str, qty_str, at, price_str] = head_tokens.as_slice() else {
        return Err(fail("malformed order clause"));
    };
    if at != "@" {
        return Err(fail("malformed order clause"));
    }
    let action = match action_str.to_lowercase().as_str() {
        "buy" => Action::Buy,
        "sell" => Action::Sell,
        _ => return Err(fail("expected buy or sell")),
    };
    parse_decimal(qty_str).ok_or_else(|| fail("invalid quantity"))?;
    let price = parse_decimal(price_str).ok_or_else(|| fail("invalid price"))?;

    // tail: "{symbol} ({timestamp}). Position: {posQty} @ avg {avgPrice}. Order ID: {orderId}"
    let (symbol_str, rest) = tail
        .split_once(" (")
        .ok_or_else(|| fail("missing timestamp clause"))?;
    if symbol_str.trim().is_empty() || symbol_str.contains(char::is_whitespace) {
        return Err(fail("malformed symbol"));
    }
    let (timestamp_str, rest) = rest
        .split_once(')')
        .ok_or_else(|| fail("unterminated timestamp clause"))?;
    let time = TimeMs::from_rfc3339(timestamp_str.trim())
        .map_err(|_| fail("invalid timestamp"))?;

    let rest = rest
        .strip_prefix(". Position: ")
        .ok_or_else(|| fail("missing 'Position:' clause"))?;
    let (position_part, order_id) = rest
        .split_once(". Order ID: ")
        .ok_or_else(|| fail("missing 'Order ID:' clause"))?;
    if order_id.trim().is_empty() {
        return Err(fail("empty order id"));
    }

    // position_part: "{posQty} @ avg {avgPrice}"
    let pos_tokens: Vec<&str> = position_part.split_whitespace().collect();
    let &[pos_qty_str, at, avg, avg_price_str] = pos_tokens.as_slice() else {
        return Err(fail("malformed position clause"));
    };
    if at != "@" || avg != "avg" {
        return Err(fail("malformed position clause"));
    }
    let pos_qty = parse_decimal(pos_qty_str).ok_or_else(|| fail("invalid position quantity"))?;
    parse_decimal(avg_price_str).ok_or_else(|| fail("invalid average price"))?;

    let (kind, direction) = derive_kind_and_direction(action, pos_qty);

    Ok(Signal {
        symbol: Symbol::new(symbol_str),
        direction: Some(direction),
        kind: Some(kind),
        timeframe: String::new(),
        price,
        time: Some(time),
        close_on_flip: false,
        raw: json!({ "text": text }),
    })
}

/// Zero position after the order means it flattened an existing position.
fn derive_kind_and_direction(action: Action, pos_qty: Decimal) -> (SignalKind, Direction) {
    if pos_qty.is_zero() {
        let direction = match action {
            Action::Buy => Direction::Bullish,
            Action::Sell => Direction::Bearish,
        };
        (SignalKind::Exit, direction)
    } else if pos_qty.is_positive() {
        (SignalKind::Entry, Direction::Bullish)
    } else {
        (SignalKind::Entry, Direction::Bearish)
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str_canonical(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_short_entry_alert() {
        let signal = parse_text_alert(
            "sell 2000 @ 68050.0 on BTCUSD.P (2026-02-26T13:51:00Z). \
             Position: -2000 @ avg 68050.0. Order ID: Short",
        )
        .unwrap();

        assert_eq!(signal.symbol.as_str(), "BTCUSD.P");
        assert_eq!(signal.direction, Some(Direction::Bearish));
        assert_eq!(signal.kind, Some(SignalKind::Entry));
        assert_eq!(signal.price, d("68050.0"));
        assert_eq!(signal.timeframe, "");
        assert_eq!(signal.time, Some(TimeMs::new(1772113860000)));
    }

    #[test]
    fn test_long_entry_alert() {
        let signal = parse_text_alert(
            "buy 1.5 @ 50000 on BTCUSD (2026-02-26T13:51:00Z). \
             Position: 1.5 @ avg 50000. Order ID: Long",
        )
        .unwrap();
        assert_eq!(signal.kind, Some(SignalKind::Entry));
        assert_eq!(signal.direction, Some(Direction::Bullish));
        assert_eq!(signal.price, d("50000"));
    }

    #[test]
    fn test_flat_position_is_exit() {
        let signal = parse_text_alert(
            "buy 2000 @ 67000 on BTCUSD.P (2026-02-26T14:10:00Z). \
             Position: 0 @ avg 0. Order ID: Close short",
        )
        .unwrap();
        assert_eq!(signal.kind, Some(SignalKind::Exit));
        // Closing by buying means the position being closed was short.
        assert_eq!(signal.direction, Some(Direction::Bullish));

        let signal = parse_text_alert(
            "sell 1 @ 52000 on BTCUSD (2026-02-26T15:00:00Z). \
             Position: 0 @ avg 0. Order ID: Close long",
        )
        .unwrap();
        assert_eq!(signal.kind, Some(SignalKind::Exit));
        assert_eq!(signal.direction, Some(Direction::Bearish));
    }

    #[test]
    fn test_action_case_insensitive() {
        let signal = parse_text_alert(
            "BUY 1 @ 100 on AAPL (2026-02-26T13:51:00Z). \
             Position: 1 @ avg 100. Order ID: L1",
        )
        .unwrap();
        assert_eq!(signal.direction, Some(Direction::Bullish));
    }

    #[test]
    fn test_missing_order_id_clause_fails() {
        let err = parse_text_alert(
            "sell 2000 @ 68050.0 on BTCUSD.P (2026-02-26T13:51:00Z). \
             Position: -2000 @ avg 68050.0.",
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Parse(_)));
    }

    #[test]
    fn test_invalid_action_fails() {
        let err = parse_text_alert(
            "hold 2000 @ 68050.0 on BTCUSD.P (2026-02-26T13:51:00Z). \
             Position: -2000 @ avg 68050.0. Order ID: X",
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Parse(_)));
    }

    #[test]
    fn test_invalid_timestamp_fails() {
        let err = parse_text_alert(
            "sell 1 @ 100 on BTCUSD (yesterday). Position: -1 @ avg 100. Order ID: X",
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Parse(_)));
    }

    #[test]
    fn test_non_numeric_price_fails() {
        let err = parse_text_alert(
            "sell one @ dear on BTCUSD (2026-02-26T13:51:00Z). \
             Position: -1 @ avg 100. Order ID: X",
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Parse(_)));
    }

    #[test]
    fn test_free_prose_fails() {
        assert!(parse_text_alert("the market looks great today").is_err());
        assert!(parse_text_alert("").is_err());
    }
}
