//! Transfer saga orchestrator.
//!
//! Two wallets cannot be committed atomically under optimistic concurrency,
//! so a transfer is a coordinated sequence of single-aggregate operations
//! with explicit compensation on partial failure. The source debit always happens before the
//! destination credit, and no credit is ever applied without a committed
//! debit — a transfer can never produce a negative balance on either side.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::bus::EventBusPublisher;
use crate::domain::{Amount, DomainError, TransferEvent, TransferFailureReason};
use crate::repository::{AggregateRepository, RepositoryError};

use super::state::SagaStore;

/// Outcome of a transfer, shaped for the HTTP response.
pub struct TransferOutcome {
    pub success: bool,
    pub message: String,
    pub from_balance: Option<Decimal>,
    pub to_balance: Option<Decimal>,
    /// Set when the saga is stuck in `COMPENSATING` and needs operator
    /// attention.
    pub critical: bool,
}

pub struct TransferSagaOrchestrator {
    repository: AggregateRepository,
    sagas: SagaStore,
    publisher: EventBusPublisher,
}

impl TransferSagaOrchestrator {
    pub fn new(repository: AggregateRepository, sagas: SagaStore, publisher: EventBusPublisher) -> Self {
        Self {
            repository,
            sagas,
            publisher,
        }
    }

    /// Run the full transfer protocol. `from == to` is accepted
    /// as a degenerate self-transfer: two events are recorded and the net
    /// balance is unchanged.
    pub async fn transfer(
        &self,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Amount,
    ) -> TransferOutcome {
        let saga_id = Uuid::new_v4();

        if let Err(err) = self
            .sagas
            .create(saga_id, from_wallet_id, to_wallet_id, amount.value())
            .await
        {
            return TransferOutcome {
                success: false,
                message: format!("failed to persist saga: {err}"),
                from_balance: None,
                to_balance: None,
                critical: false,
            };
        }
        self.publish(TransferEvent::TransferInitiated {
            saga_id,
            from_wallet_id,
            to_wallet_id,
            amount: amount.value(),
            timestamp: chrono::Utc::now(),
        })
        .await;

        // Step 1: debit the source wallet. No compensation is needed on
        // failure because no state changed yet.
        let debit = self
            .repository
            .execute_without_publish(from_wallet_id, |wallet| wallet.withdraw(amount, Uuid::new_v4()))
            .await;

        let (debit_tx_id, from_balance_after) = match debit {
            Ok(committed) => (committed.event.transaction_id(), committed.event.balance_after()),
            Err(err) => {
                let reason = failure_reason(&err);
                let _ = self.sagas.mark_failed(saga_id, &reason.to_string()).await;
                self.publish(TransferEvent::TransferFailed {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    reason: reason.clone(),
                    timestamp: chrono::Utc::now(),
                })
                .await;
                return TransferOutcome {
                    success: false,
                    message: reason.to_string(),
                    from_balance: None,
                    to_balance: None,
                    critical: false,
                };
            }
        };

        if let Err(err) = self.sagas.mark_source_debited(saga_id, debit_tx_id).await {
            tracing::error!(%saga_id, error = %err, "failed to persist SOURCE_DEBITED; continuing with in-memory state");
        }
        self.publish(TransferEvent::SourceWalletDebited {
            saga_id,
            from_wallet_id,
            to_wallet_id,
            transaction_id: debit_tx_id,
            amount: amount.value(),
            balance_after: from_balance_after,
            timestamp: chrono::Utc::now(),
        })
        .await;

        // Step 2: credit the destination wallet.
        let credit = self
            .repository
            .execute_without_publish(to_wallet_id, |wallet| Ok(wallet.deposit(amount, Uuid::new_v4())))
            .await;

        match credit {
            Ok(committed) => {
                let credit_tx_id = committed.event.transaction_id();
                let to_balance_after = committed.event.balance_after();

                if let Err(err) = self.sagas.mark_completed(saga_id, credit_tx_id).await {
                    tracing::error!(%saga_id, error = %err, "failed to persist COMPLETED");
                }
                self.publish(TransferEvent::DestinationWalletCredited {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    transaction_id: credit_tx_id,
                    amount: amount.value(),
                    balance_after: to_balance_after,
                    timestamp: chrono::Utc::now(),
                })
                .await;
                self.publish(TransferEvent::MoneyTransferred {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    amount: amount.value(),
                    timestamp: chrono::Utc::now(),
                })
                .await;
                self.publish(TransferEvent::TransferCompleted {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    timestamp: chrono::Utc::now(),
                })
                .await;

                TransferOutcome {
                    success: true,
                    message: "transfer completed".to_string(),
                    from_balance: Some(from_balance_after),
                    to_balance: Some(to_balance_after),
                    critical: false,
                }
            }
            Err(err) => self.compensate(saga_id, from_wallet_id, to_wallet_id, amount, &err).await,
        }
    }

    /// Credit failed after the debit committed: refund the source wallet.
    /// This is a logical compensation, not a rollback of the already-committed
    /// debit event.
    async fn compensate(
        &self,
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Amount,
        credit_err: &RepositoryError,
    ) -> TransferOutcome {
        let reason = credit_err.to_string();
        if let Err(err) = self.sagas.mark_compensating(saga_id, &reason).await {
            tracing::error!(%saga_id, error = %err, "failed to persist COMPENSATING");
        }
        self.publish(TransferEvent::CompensationInitiated {
            saga_id,
            from_wallet_id,
            reason: reason.clone(),
            timestamp: chrono::Utc::now(),
        })
        .await;

        let refund = self
            .repository
            .execute_without_publish(from_wallet_id, |wallet| Ok(wallet.deposit(amount, Uuid::new_v4())))
            .await;

        match refund {
            Ok(committed) => {
                let compensation_tx_id = committed.event.transaction_id();
                let from_balance_after = committed.event.balance_after();

                if let Err(err) = self
                    .sagas
                    .mark_failed_after_compensation(saga_id, compensation_tx_id)
                    .await
                {
                    tracing::error!(%saga_id, error = %err, "failed to persist FAILED after compensation");
                }
                self.publish(TransferEvent::SourceWalletRefunded {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    transaction_id: compensation_tx_id,
                    amount: amount.value(),
                    balance_after: from_balance_after,
                    timestamp: chrono::Utc::now(),
                })
                .await;
                self.publish(TransferEvent::TransferFailed {
                    saga_id,
                    from_wallet_id,
                    to_wallet_id,
                    reason: TransferFailureReason::InternalError,
                    timestamp: chrono::Utc::now(),
                })
                .await;

                TransferOutcome {
                    success: false,
                    message: format!("transfer failed, source wallet refunded: {reason}"),
                    from_balance: Some(from_balance_after),
                    to_balance: None,
                    critical: false,
                }
            }
            Err(refund_err) => {
                // Saga is left in COMPENSATING: the compensation itself
                // failed. This requires human attention — we do not retry here.
                tracing::error!(
                    %saga_id,
                    %from_wallet_id,
                    error = %refund_err,
                    "compensation failed; saga stuck in COMPENSATING, operator attention required"
                );
                TransferOutcome {
                    success: false,
                    message: format!(
                        "critical: compensation failed for saga {saga_id}, manual refund of wallet {from_wallet_id} required"
                    ),
                    from_balance: None,
                    to_balance: None,
                    critical: true,
                }
            }
        }
    }

    async fn publish(&self, event: TransferEvent) {
        if let Err(err) = self
            .publisher
            .publish(event.routing_key(), event.event_type(), &event)
            .await
        {
            tracing::error!(saga_id = %event.saga_id(), error = %err, "best-effort saga event publish failed");
        }
    }
}

fn failure_reason(err: &RepositoryError) -> TransferFailureReason {
    match err {
        RepositoryError::Domain(DomainError::InsufficientFunds { .. }) => {
            TransferFailureReason::InsufficientFunds
        }
        RepositoryError::Domain(DomainError::WalletNotFound(_)) => TransferFailureReason::WalletNotFound,
        RepositoryError::Domain(DomainError::VersionConflict { .. }) => {
            TransferFailureReason::ConcurrencyConflict
        }
        RepositoryError::ConcurrencyConflict { .. } => TransferFailureReason::ConcurrencyConflict,
        _ => TransferFailureReason::InternalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_maps_insufficient_funds() {
        let err = RepositoryError::Domain(DomainError::InsufficientFunds {
            required: Decimal::new(100, 0),
            available: Decimal::new(50, 0),
        });
        assert_eq!(failure_reason(&err), TransferFailureReason::InsufficientFunds);
    }

    #[test]
    fn test_failure_reason_maps_concurrency_conflict() {
        let err = RepositoryError::ConcurrencyConflict {
            wallet_id: Uuid::new_v4(),
        };
        assert_eq!(failure_reason(&err), TransferFailureReason::ConcurrencyConflict);
    }
}
