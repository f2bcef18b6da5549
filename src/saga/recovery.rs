//! Saga recovery scanner.
//!
//! The orchestrator leaves a saga in `SOURCE_DEBITED` if the process crashes
//! between the debit and the credit, and in `COMPENSATING` if a refund
//! attempt itself fails. Neither case self-heals: this scanner periodically
//! looks for sagas stuck in a non-terminal status past a staleness threshold
//! and reports them, so an operator (or, for `SOURCE_DEBITED`, a future
//! automated resumption) can act. It never completes or compensates a saga
//! itself — the source wallet's true state must be re-derived from the event
//! log before any resumption is attempted, which this scanner does not do.

use std::time::Duration;

use tokio::time::interval;

use super::state::{SagaStore, SagaStoreError, TransferSaga};

/// How far behind `updated_at` a non-terminal saga must be before it's
/// reported as stale.
pub const DEFAULT_STALE_THRESHOLD: chrono::Duration = chrono::Duration::minutes(5);

/// One pass over the saga table, returning every saga found stale.
pub async fn scan_stale(
    sagas: &SagaStore,
    threshold: chrono::Duration,
) -> Result<Vec<TransferSaga>, SagaStoreError> {
    let stale = sagas.find_stale(threshold).await?;
    for saga in &stale {
        tracing::warn!(
            saga_id = %saga.saga_id,
            from_wallet_id = %saga.from_wallet_id,
            to_wallet_id = %saga.to_wallet_id,
            status = saga.status.as_str(),
            updated_at = %saga.updated_at,
            "stale saga detected, needs operator attention"
        );
    }
    Ok(stale)
}

/// Runs `scan_stale` on a fixed interval until the process exits. Intended
/// for both the standalone `saga_recovery` binary and as an in-process
/// background task started alongside the API server.
pub struct SagaRecoveryScanner {
    sagas: SagaStore,
    scan_interval: Duration,
    stale_threshold: chrono::Duration,
}

impl SagaRecoveryScanner {
    pub fn new(sagas: SagaStore) -> Self {
        Self {
            sagas,
            scan_interval: Duration::from_secs(60),
            stale_threshold: DEFAULT_STALE_THRESHOLD,
        }
    }

    pub fn with_intervals(mut self, scan_interval: Duration, stale_threshold: chrono::Duration) -> Self {
        self.scan_interval = scan_interval;
        self.stale_threshold = stale_threshold;
        self
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!("saga recovery scanner started");
        let mut ticker = interval(self.scan_interval);

        loop {
            ticker.tick().await;
            match scan_stale(&self.sagas, self.stale_threshold).await {
                Ok(stale) if !stale.is_empty() => {
                    tracing::warn!(count = stale.len(), "stale sagas found in this scan");
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "saga recovery scan failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_five_minutes() {
        assert_eq!(DEFAULT_STALE_THRESHOLD, chrono::Duration::minutes(5));
    }
}
