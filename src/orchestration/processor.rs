//! Signal processor: the orchestrator between parser, ledger, and batch
//! log engine.

use futures::future::try_join_all;
use std::sync::Arc;

use crate::db::{BatchStore, StoreError};
use crate::domain::{Batch, Signal};
use crate::engine::{BatchLogEngine, SignalAction, SignalOutcome, TradeLedger};

pub struct SignalProcessor {
    ledger: TradeLedger,
    engine: Arc<BatchLogEngine>,
    batches: Arc<dyn BatchStore>,
}

impl SignalProcessor {
    pub fn new(
        ledger: TradeLedger,
        engine: Arc<BatchLogEngine>,
        batches: Arc<dyn BatchStore>,
    ) -> Self {
        SignalProcessor {
            ledger,
            engine,
            batches,
        }
    }

    /// Run one canonical signal through the ledger and, on a close, append
    /// to the log of every batch whose membership and window cover the
    /// trade. Batch logs are independent; the order across batches is
    /// unspecified.
    ///
    /// # Errors
    /// Store failures propagate; a failed append surfaces rather than
    /// leaving a log silently stale.
    pub async fn process(&self, signal: &Signal) -> Result<SignalOutcome, StoreError> {
        let outcome = self.ledger.apply(signal).await?;

        if outcome.action == SignalAction::Exit {
            let affected: Vec<Batch> = self
                .batches
                .batches_containing(&signal.symbol)
                .await?
                .into_iter()
                .filter(|b| b.covers_entry_time(outcome.trade.entry_time))
                .collect();

            let trade = &outcome.trade;
            try_join_all(
                affected
                    .iter()
                    .map(|batch| self.engine.append_closed(batch, trade)),
            )
            .await?;

            tracing::info!(
                symbol = %signal.symbol,
                trade_id = %trade.id,
                batches = affected.len(),
                "processed exit signal"
            );
        } else {
            tracing::info!(symbol = %signal.symbol, "processed entry signal");
        }

        Ok(outcome)
    }
}
