//! Aggregate Repository Errors

use uuid::Uuid;

/// Errors surfaced by the aggregate repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The command's validation rejected the operation (e.g. insufficient funds).
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    /// Optimistic concurrency conflict after exhausting configured retries.
    #[error("concurrency conflict on wallet {wallet_id}")]
    ConcurrencyConflict { wallet_id: Uuid },

    /// Database/broker failure; safe to retry the whole command.
    #[error("transient infrastructure failure: {0}")]
    TransientInfrastructure(String),
}

impl From<crate::event_store::EventStoreError> for RepositoryError {
    fn from(err: crate::event_store::EventStoreError) -> Self {
        match err {
            crate::event_store::EventStoreError::ConcurrencyConflict { aggregate_id, .. } => {
                RepositoryError::ConcurrencyConflict {
                    wallet_id: aggregate_id,
                }
            }
            other => RepositoryError::TransientInfrastructure(other.to_string()),
        }
    }
}
