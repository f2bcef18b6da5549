//! Command Mediator
//!
//! Entry point for the three mutating wallet commands. Each command runs
//! inside the idempotency envelope: check-and-lock before the work, complete
//! on success, release on failure so the client can retry with the same key.
//! `deposit`/`withdraw` dispatch straight to the Aggregate Repository;
//! `transfer` dispatches to the transfer saga orchestrator.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{Amount, DomainError};
use crate::idempotency::{IdempotencyError, IdempotencyStore, LockOutcome};
use crate::repository::{AggregateRepository, RepositoryError};
use crate::saga::{TransferOutcome, TransferSagaOrchestrator};

/// What the mediator decided, before the caller maps it to an HTTP response.
pub enum CommandOutcome {
    /// Freshly computed; `response` is the JSON body to return, `status` the
    /// HTTP status the caller should use on first execution.
    Fresh { response: Value, status: u16 },
    /// A cached response from a previous execution of the same key. The
    /// original status is not remembered by the idempotency store (only the
    /// body is), so callers treat a replay as 201.
    Cached { response: Value },
    /// Another worker currently holds the lock for this key.
    InProgress,
}

#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    #[error("idempotency store error: {0}")]
    Idempotency(#[from] IdempotencyError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Serialize)]
struct DepositResponse {
    success: bool,
    message: String,
    balance: Decimal,
}

#[derive(Serialize)]
struct TransferResponse {
    success: bool,
    message: String,
    #[serde(rename = "fromBalance", skip_serializing_if = "Option::is_none")]
    from_balance: Option<Decimal>,
    #[serde(rename = "toBalance", skip_serializing_if = "Option::is_none")]
    to_balance: Option<Decimal>,
}

pub struct CommandMediator {
    repository: AggregateRepository,
    saga: TransferSagaOrchestrator,
    idempotency: IdempotencyStore,
}

impl CommandMediator {
    pub fn new(
        repository: AggregateRepository,
        saga: TransferSagaOrchestrator,
        idempotency: IdempotencyStore,
    ) -> Self {
        Self {
            repository,
            saga,
            idempotency,
        }
    }

    /// `deposit(wallet_id, amount)` — single-aggregate, always succeeds
    /// validation-wise once `amount` is a valid `Amount`.
    pub async fn deposit(
        &self,
        idempotency_key: &str,
        wallet_id: Uuid,
        amount: Amount,
    ) -> Result<CommandOutcome, MediatorError> {
        self.run_idempotent(idempotency_key, || async {
            let committed = self
                .repository
                .execute(wallet_id, |wallet| Ok(wallet.deposit(amount, Uuid::new_v4())))
                .await?;

            let body = serde_json::to_value(DepositResponse {
                success: true,
                message: "deposit completed".to_string(),
                balance: committed.event.balance_after(),
            })
            .expect("response serializes");

            Ok((body, 201))
        })
        .await
    }

    /// `withdraw(wallet_id, amount)` — single-aggregate; insufficient funds
    /// is returned as 201 `{success:false,…}` rather than a 4xx, kept
    /// consistent with `transfer`'s response shape.
    pub async fn withdraw(
        &self,
        idempotency_key: &str,
        wallet_id: Uuid,
        amount: Amount,
    ) -> Result<CommandOutcome, MediatorError> {
        self.run_idempotent(idempotency_key, || async {
            match self
                .repository
                .execute(wallet_id, |wallet| wallet.withdraw(amount, Uuid::new_v4()))
                .await
            {
                Ok(committed) => {
                    let body = serde_json::to_value(DepositResponse {
                        success: true,
                        message: "withdrawal completed".to_string(),
                        balance: committed.event.balance_after(),
                    })
                    .expect("response serializes");
                    Ok((body, 201))
                }
                Err(RepositoryError::Domain(domain_err @ DomainError::InsufficientFunds { .. })) => {
                    let body = serde_json::json!({
                        "success": false,
                        "error": domain_err.to_string(),
                    });
                    Ok((body, 201))
                }
                Err(other) => Err(MediatorError::Repository(other)),
            }
        })
        .await
    }

    /// `transfer(from, to, amount)` — dispatches to the saga orchestrator.
    /// Domain-level failure (insufficient funds, etc.) is still a "fresh"
    /// 201 response with `success:false`.
    pub async fn transfer(
        &self,
        idempotency_key: &str,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Amount,
    ) -> Result<CommandOutcome, MediatorError> {
        self.run_idempotent(idempotency_key, || async {
            let outcome: TransferOutcome =
                self.saga.transfer(from_wallet_id, to_wallet_id, amount).await;

            let body = serde_json::to_value(TransferResponse {
                success: outcome.success,
                message: outcome.message,
                from_balance: outcome.from_balance,
                to_balance: outcome.to_balance,
            })
            .expect("response serializes");

            Ok((body, 201))
        })
        .await
    }

    /// Runs `work` under the idempotency envelope: check-and-lock
    /// first, `complete` on success, `release` on failure so the client can
    /// retry with the same key.
    async fn run_idempotent<F, Fut>(
        &self,
        idempotency_key: &str,
        work: F,
    ) -> Result<CommandOutcome, MediatorError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(Value, u16), MediatorError>>,
    {
        match self.idempotency.check_and_lock(idempotency_key).await? {
            LockOutcome::InProgress => Ok(CommandOutcome::InProgress),
            LockOutcome::Completed(response) => Ok(CommandOutcome::Cached { response }),
            LockOutcome::NewLock => match work().await {
                Ok((response, status)) => {
                    self.idempotency.complete(idempotency_key, response.clone()).await?;
                    Ok(CommandOutcome::Fresh { response, status })
                }
                Err(err) => {
                    self.idempotency.release(idempotency_key).await?;
                    Err(err)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_outcome_carries_body_through() {
        let body = serde_json::json!({"success": true, "balance": "10.00"});
        let outcome = CommandOutcome::Cached {
            response: body.clone(),
        };
        match outcome {
            CommandOutcome::Cached { response } => assert_eq!(response, body),
            _ => panic!("expected Cached"),
        }
    }
}
