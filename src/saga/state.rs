//! Transfer saga persistent state.
//!
//! Status transitions are one-way along the saga's state machine; a
//! terminal status (`Completed`, `Failed`) is never rewritten by this store —
//! callers are expected to respect that invariant by only calling
//! `transition` while the saga is still in flight.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Saga lifecycle status, stored as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStatus {
    Initiated,
    SourceDebited,
    Completed,
    Compensating,
    Failed,
}

impl SagaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SagaStatus::Initiated => "INITIATED",
            SagaStatus::SourceDebited => "SOURCE_DEBITED",
            SagaStatus::Completed => "COMPLETED",
            SagaStatus::Compensating => "COMPENSATING",
            SagaStatus::Failed => "FAILED",
        }
    }

    /// `Completed`/`Failed` are terminal; `Compensating` is terminal from the
    /// automation's perspective but requires operator action.
    pub fn is_terminal(self) -> bool {
        matches!(self, SagaStatus::Completed | SagaStatus::Failed)
    }

    pub fn needs_operator_attention(self) -> bool {
        matches!(self, SagaStatus::Compensating)
    }
}

impl std::str::FromStr for SagaStatus {
    type Err = SagaStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIATED" => Ok(SagaStatus::Initiated),
            "SOURCE_DEBITED" => Ok(SagaStatus::SourceDebited),
            "COMPLETED" => Ok(SagaStatus::Completed),
            "COMPENSATING" => Ok(SagaStatus::Compensating),
            "FAILED" => Ok(SagaStatus::Failed),
            other => Err(SagaStoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// A transfer saga's persistent row.
#[derive(Debug, Clone)]
pub struct TransferSaga {
    pub saga_id: Uuid,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount: Decimal,
    pub status: SagaStatus,
    pub debit_tx_id: Option<Uuid>,
    pub credit_tx_id: Option<Uuid>,
    pub compensation_tx_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row shape. sqlx's built-in tuple `FromRow` impls stop at 9 columns, so
/// this saga row (11 columns) needs a dedicated struct rather than a tuple.
#[derive(sqlx::FromRow)]
struct SagaRow {
    saga_id: Uuid,
    from_wallet_id: Uuid,
    to_wallet_id: Uuid,
    amount: Decimal,
    status: String,
    debit_tx_id: Option<Uuid>,
    credit_tx_id: Option<Uuid>,
    compensation_tx_id: Option<Uuid>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransferSaga {
    fn from_row(row: SagaRow) -> Result<Self, SagaStoreError> {
        Ok(TransferSaga {
            saga_id: row.saga_id,
            from_wallet_id: row.from_wallet_id,
            to_wallet_id: row.to_wallet_id,
            amount: row.amount,
            status: row.status.parse()?,
            debit_tx_id: row.debit_tx_id,
            credit_tx_id: row.credit_tx_id,
            compensation_tx_id: row.compensation_tx_id,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SagaStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown saga status in database: {0}")]
    UnknownStatus(String),
}

/// Persistence for transfer sagas. Only the command that created a saga ever
/// writes its row again — `saga_id`s are unique, so no contention is
/// possible across requests.
#[derive(Clone)]
pub struct SagaStore {
    pool: PgPool,
}

const SAGA_COLUMNS: &str = "saga_id, from_wallet_id, to_wallet_id, amount, status, \
    debit_tx_id, credit_tx_id, compensation_tx_id, error_message, created_at, updated_at";

impl SagaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            INSERT INTO transfer_sagas
                (saga_id, from_wallet_id, to_wallet_id, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'INITIATED', NOW(), NOW())
            "#,
        )
        .bind(saga_id)
        .bind(from_wallet_id)
        .bind(to_wallet_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_source_debited(
        &self,
        saga_id: Uuid,
        debit_tx_id: Uuid,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            UPDATE transfer_sagas
            SET status = 'SOURCE_DEBITED', debit_tx_id = $2, updated_at = NOW()
            WHERE saga_id = $1
            "#,
        )
        .bind(saga_id)
        .bind(debit_tx_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_completed(
        &self,
        saga_id: Uuid,
        credit_tx_id: Uuid,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            UPDATE transfer_sagas
            SET status = 'COMPLETED', credit_tx_id = $2, updated_at = NOW()
            WHERE saga_id = $1
            "#,
        )
        .bind(saga_id)
        .bind(credit_tx_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        saga_id: Uuid,
        error_message: &str,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            UPDATE transfer_sagas
            SET status = 'FAILED', error_message = $2, updated_at = NOW()
            WHERE saga_id = $1
            "#,
        )
        .bind(saga_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_compensating(
        &self,
        saga_id: Uuid,
        error_message: &str,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            UPDATE transfer_sagas
            SET status = 'COMPENSATING', error_message = $2, updated_at = NOW()
            WHERE saga_id = $1
            "#,
        )
        .bind(saga_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed_after_compensation(
        &self,
        saga_id: Uuid,
        compensation_tx_id: Uuid,
    ) -> Result<(), SagaStoreError> {
        sqlx::query(
            r#"
            UPDATE transfer_sagas
            SET status = 'FAILED', compensation_tx_id = $2, updated_at = NOW()
            WHERE saga_id = $1
            "#,
        )
        .bind(saga_id)
        .bind(compensation_tx_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, saga_id: Uuid) -> Result<Option<TransferSaga>, SagaStoreError> {
        let row = sqlx::query_as::<_, SagaRow>(&format!(
            "SELECT {SAGA_COLUMNS} FROM transfer_sagas WHERE saga_id = $1"
        ))
        .bind(saga_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TransferSaga::from_row).transpose()
    }

    /// Sagas in a non-terminal status whose last update is older than
    /// `older_than`, for the recovery scanner.
    pub async fn find_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<TransferSaga>, SagaStoreError> {
        let cutoff = Utc::now() - older_than;
        let rows = sqlx::query_as::<_, SagaRow>(&format!(
            r#"
            SELECT {SAGA_COLUMNS} FROM transfer_sagas
            WHERE status IN ('INITIATED', 'SOURCE_DEBITED', 'COMPENSATING')
              AND updated_at < $1
            ORDER BY updated_at ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TransferSaga::from_row).collect()
    }
}
