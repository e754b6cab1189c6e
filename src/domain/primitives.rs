//! Domain primitives: TimeMs, Symbol, Direction, SignalKind, TradeStatus.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Parse an ISO-8601 / RFC 3339 timestamp.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid RFC 3339 timestamp.
    pub fn from_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        chrono::DateTime::parse_from_rfc3339(s).map(|dt| TimeMs(dt.timestamp_millis()))
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// Instrument symbol (e.g., "BTCUSD.P", "AAPL").
///
/// Canonically upper-cased at construction so ledger matching and batch
/// membership agree regardless of how the sender cased the alert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        Symbol(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Symbol::new(&raw)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared trade direction: bullish = long, bearish = short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Some(Direction::Bullish),
            "bearish" => Some(Direction::Bearish),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

/// Declared signal kind. Absent on legacy alerts; the ledger then decides
/// entry vs exit from the presence of an open trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Entry,
    Exit,
}

impl SignalKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Some(SignalKind::Entry),
            "exit" => Some(SignalKind::Exit),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Entry => write!(f, "entry"),
            SignalKind::Exit => write!(f, "exit"),
        }
    }
}

/// Trade lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(TradeStatus::Open),
            "closed" => Some(TradeStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "open"),
            TradeStatus::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_case_and_whitespace() {
        assert_eq!(Symbol::new(" btcusd.p ").as_str(), "BTCUSD.P");
        assert_eq!(Symbol::new("AAPL").as_str(), "AAPL");
    }

    #[test]
    fn test_symbol_deserialize_normalizes() {
        let s: Symbol = serde_json::from_str("\"ethusd\"").unwrap();
        assert_eq!(s.as_str(), "ETHUSD");
    }

    #[test]
    fn test_timems_from_rfc3339() {
        let t = TimeMs::from_rfc3339("2026-02-26T13:51:00Z").unwrap();
        assert_eq!(t.as_ms(), 1772113860000);
        assert!(TimeMs::from_rfc3339("yesterday").is_err());
    }

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }

    #[test]
    fn test_direction_parse_and_display() {
        assert_eq!(Direction::parse("Bullish"), Some(Direction::Bullish));
        assert_eq!(Direction::parse("bearish"), Some(Direction::Bearish));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::Bullish.to_string(), "bullish");
    }

    #[test]
    fn test_signal_kind_parse() {
        assert_eq!(SignalKind::parse("entry"), Some(SignalKind::Entry));
        assert_eq!(SignalKind::parse("EXIT"), Some(SignalKind::Exit));
        assert_eq!(SignalKind::parse("hold"), None);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TradeStatus::Open).unwrap(),
            "\"open\""
        );
        assert_eq!(
            serde_json::to_string(&TradeStatus::Closed).unwrap(),
            "\"closed\""
        );
    }
}
