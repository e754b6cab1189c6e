//! Entry/exit matching state machine.
//!
//! Per instrument: NoOpenTrade -> (entry) -> OpenTrade -> (exit) ->
//! NoOpenTrade, with the trade left permanently closed. The matching
//! decision and the PnL formula are pure functions; `TradeLedger` wires
//! them to the trade store under a per-symbol lock.

use serde::Serialize;
use std::sync::Arc;

use crate::db::{StoreError, TradeStore};
use crate::domain::{Decimal, Direction, Signal, SignalKind, Trade, TradeStatus};
use crate::engine::locks::KeyedMutex;

/// What a signal turned out to be once matched against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Entry,
    Exit,
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Entry => write!(f, "entry"),
            SignalAction::Exit => write!(f, "exit"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalOutcome {
    pub action: SignalAction,
    pub trade: Trade,
}

/// Decide entry vs exit.
///
/// An open trade is closed by anything that is not explicitly an entry:
/// an explicit exit, or a legacy signal with no declared kind. An explicit
/// entry always opens a new trade, and an exit with nothing to close falls
/// through to entry.
pub fn decide(open_exists: bool, kind: Option<SignalKind>) -> SignalAction {
    if open_exists && kind != Some(SignalKind::Entry) {
        SignalAction::Exit
    } else {
        SignalAction::Entry
    }
}

/// Realized PnL percent for a close, measured against the open trade's
/// stored direction, rounded to 4 decimal places.
pub fn realized_pnl_pct(direction: Direction, entry_px: Decimal, exit_px: Decimal) -> Decimal {
    if entry_px.is_zero() {
        return Decimal::zero();
    }
    let moved = match direction {
        Direction::Bullish => exit_px - entry_px,
        Direction::Bearish => entry_px - exit_px,
    };
    (moved / entry_px * Decimal::hundred()).round_pct()
}

pub struct TradeLedger {
    trades: Arc<dyn TradeStore>,
    symbol_locks: KeyedMutex,
}

impl TradeLedger {
    pub fn new(trades: Arc<dyn TradeStore>) -> Self {
        TradeLedger {
            trades,
            symbol_locks: KeyedMutex::new(),
        }
    }

    /// Match a canonical signal against the ledger and apply the result.
    ///
    /// # Errors
    /// Store failures propagate; nothing else fails.
    pub async fn apply(&self, signal: &Signal) -> Result<SignalOutcome, StoreError> {
        let _guard = self.symbol_locks.acquire(signal.symbol.as_str()).await;

        let open = self.trades.oldest_open_for_symbol(&signal.symbol).await?;
        let action = decide(open.is_some(), signal.kind);

        match (action, open) {
            (SignalAction::Exit, Some(trade)) => {
                let closed = self.close(trade, signal).await?;
                Ok(SignalOutcome {
                    action: SignalAction::Exit,
                    trade: closed,
                })
            }
            _ => {
                let trade = self.open(signal).await?;
                Ok(SignalOutcome {
                    action: SignalAction::Entry,
                    trade,
                })
            }
        }
    }

    async fn open(&self, signal: &Signal) -> Result<Trade, StoreError> {
        let trade = Trade::open(
            signal.symbol.clone(),
            signal.timeframe.clone(),
            signal.direction_or_default(),
            signal.price,
            signal.time_or_now(),
            Some(signal.raw.clone()),
        );
        self.trades.insert_trade(&trade).await?;

        tracing::info!(
            symbol = %trade.symbol,
            direction = %trade.direction,
            price = %trade.entry_px,
            "opened trade"
        );
        Ok(trade)
    }

    async fn close(&self, mut trade: Trade, signal: &Signal) -> Result<Trade, StoreError> {
        let pnl = realized_pnl_pct(trade.direction, trade.entry_px, signal.price);

        trade.status = TradeStatus::Closed;
        trade.exit_px = Some(signal.price);
        trade.exit_time = Some(signal.time_or_now());
        trade.pnl_pct = Some(pnl);
        trade.exit_payload = Some(signal.raw.clone());
        self.trades.close_trade(&trade).await?;

        tracing::info!(
            symbol = %trade.symbol,
            direction = %trade.direction,
            pnl_pct = %pnl,
            "closed trade"
        );
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::{Symbol, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn signal(symbol: &str, price: &str, kind: Option<SignalKind>) -> Signal {
        Signal {
            symbol: Symbol::new(symbol),
            direction: None,
            kind,
            timeframe: String::new(),
            price: d(price),
            time: Some(TimeMs::new(1000)),
            close_on_flip: false,
            raw: serde_json::json!({"price": price}),
        }
    }

    #[test]
    fn test_decide_matrix() {
        use SignalAction::*;
        assert_eq!(decide(false, None), Entry);
        assert_eq!(decide(false, Some(SignalKind::Entry)), Entry);
        // Exit with nothing to close is still an entry.
        assert_eq!(decide(false, Some(SignalKind::Exit)), Entry);
        assert_eq!(decide(true, None), Exit);
        assert_eq!(decide(true, Some(SignalKind::Exit)), Exit);
        // Explicit entry opens a second trade even with one already open.
        assert_eq!(decide(true, Some(SignalKind::Entry)), Entry);
    }

    #[test]
    fn test_pnl_bullish_up_move() {
        assert_eq!(
            realized_pnl_pct(Direction::Bullish, d("100"), d("110")),
            d("10")
        );
    }

    #[test]
    fn test_pnl_bearish_down_move_is_profit() {
        assert_eq!(
            realized_pnl_pct(Direction::Bearish, d("100"), d("90")),
            d("10")
        );
    }

    #[test]
    fn test_pnl_flat_is_zero_either_direction() {
        assert_eq!(
            realized_pnl_pct(Direction::Bullish, d("100"), d("100")),
            d("0")
        );
        assert_eq!(
            realized_pnl_pct(Direction::Bearish, d("100"), d("100")),
            d("0")
        );
    }

    #[test]
    fn test_pnl_rounds_to_four_places() {
        // (1/3) * 100 = 33.3333...
        assert_eq!(
            realized_pnl_pct(Direction::Bullish, d("3"), d("4")),
            d("33.3333")
        );
        assert_eq!(realized_pnl_pct(Direction::Bullish, d("0"), d("4")), d("0"));
    }

    #[tokio::test]
    async fn test_entry_then_exit_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let ledger = TradeLedger::new(store.clone());

        let opened = ledger
            .apply(&signal("btcusd", "100", Some(SignalKind::Entry)))
            .await
            .unwrap();
        assert_eq!(opened.action, SignalAction::Entry);
        assert!(opened.trade.is_open());
        assert_eq!(opened.trade.direction, Direction::Bullish);

        let closed = ledger
            .apply(&signal("BTCUSD", "110", Some(SignalKind::Exit)))
            .await
            .unwrap();
        assert_eq!(closed.action, SignalAction::Exit);
        assert_eq!(closed.trade.id, opened.trade.id);
        assert!(closed.trade.is_closed());
        assert_eq!(closed.trade.pnl_pct, Some(d("10")));
        assert_eq!(closed.trade.exit_px, Some(d("110")));
        assert!(closed.trade.entry_payload.is_some());
        assert!(closed.trade.exit_payload.is_some());

        assert!(store
            .oldest_open_for_symbol(&Symbol::new("BTCUSD"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_legacy_signal_closes_open_trade() {
        let store = Arc::new(MemoryStore::new());
        let ledger = TradeLedger::new(store);

        ledger.apply(&signal("ETHUSD", "2000", None)).await.unwrap();
        let second = ledger.apply(&signal("ETHUSD", "2100", None)).await.unwrap();
        assert_eq!(second.action, SignalAction::Exit);
        assert_eq!(second.trade.pnl_pct, Some(d("5")));
    }

    #[tokio::test]
    async fn test_exit_without_open_trade_opens_one() {
        let store = Arc::new(MemoryStore::new());
        let ledger = TradeLedger::new(store);

        let outcome = ledger
            .apply(&signal("SOLUSD", "150", Some(SignalKind::Exit)))
            .await
            .unwrap();
        assert_eq!(outcome.action, SignalAction::Entry);
        assert!(outcome.trade.is_open());
    }

    #[tokio::test]
    async fn test_exit_uses_open_trades_direction() {
        let store = Arc::new(MemoryStore::new());
        let ledger = TradeLedger::new(store);

        let mut entry = signal("BTCUSD", "100", Some(SignalKind::Entry));
        entry.direction = Some(Direction::Bearish);
        ledger.apply(&entry).await.unwrap();

        // The exit declares bullish, but PnL follows the stored short.
        let mut exit = signal("BTCUSD", "90", Some(SignalKind::Exit));
        exit.direction = Some(Direction::Bullish);
        let closed = ledger.apply(&exit).await.unwrap();
        assert_eq!(closed.trade.pnl_pct, Some(d("10")));
    }

    #[tokio::test]
    async fn test_explicit_entry_stacks_and_exits_close_oldest_first() {
        let store = Arc::new(MemoryStore::new());
        let ledger = TradeLedger::new(store);

        let mut first = signal("BTCUSD", "100", Some(SignalKind::Entry));
        first.time = Some(TimeMs::new(1000));
        let first = ledger.apply(&first).await.unwrap();

        let mut second = signal("BTCUSD", "105", Some(SignalKind::Entry));
        second.time = Some(TimeMs::new(2000));
        let second = ledger.apply(&second).await.unwrap();
        assert_eq!(second.action, SignalAction::Entry);
        assert_ne!(second.trade.id, first.trade.id);

        let closed = ledger
            .apply(&signal("BTCUSD", "110", Some(SignalKind::Exit)))
            .await
            .unwrap();
        assert_eq!(closed.trade.id, first.trade.id);
    }
}
