//! Transfer Saga
//!
//! Coordinates a debit-then-credit across two wallet aggregates with
//! explicit compensation, persisting its own progress so a crash mid-transfer
//! is observable and (eventually) recoverable rather than silently lost.

mod orchestrator;
mod recovery;
mod state;

pub use orchestrator::{TransferOutcome, TransferSagaOrchestrator};
pub use recovery::{scan_stale, SagaRecoveryScanner, DEFAULT_STALE_THRESHOLD};
pub use state::{SagaStatus, SagaStore, SagaStoreError, TransferSaga};
