//! Event Store Errors
//!
//! Error types for event log store operations.

use uuid::Uuid;

/// Errors that can occur in the event log store.
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: the (aggregate_id, version) uniqueness
    /// constraint was violated. The caller should reload and retry.
    #[error("concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// Database error, surfaced to the caller as `TransientInfrastructure`.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error when encoding/decoding an event payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }

    /// Failures other than a concurrency conflict are retryable by the caller
    /// and leave no partial state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventStoreError::Database(_))
    }
}
