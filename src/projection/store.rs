//! Read-model persistence.
//!
//! Both tables are owned exclusively by the projection consumer; the command
//! side never reads or writes them directly — it reads
//! its own truth by replaying the event log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ProjectionStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A wallet's denormalized balance row.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct WalletProjection {
    pub id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    Refund,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::Refund => "REFUND",
        }
    }
}

/// A row in the transaction history read model.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub wallet_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub related_wallet_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// Persistence for both read models. A single Postgres pool suffices; the
/// read role is modeled by handing this store a pool constructed from that
/// role's connection settings (see `config`/`db`).
#[derive(Clone)]
pub struct ProjectionStore {
    pool: PgPool,
}

impl ProjectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the wallet's balance. `balance_after` is ground truth and is
    /// set, never incremented, so a duplicate delivery idempotently
    /// re-applies the same value.
    pub async fn upsert_wallet_balance(
        &self,
        wallet_id: Uuid,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ProjectionStoreError> {
        sqlx::query(
            r#"
            INSERT INTO wallet_projections (id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET
                balance = EXCLUDED.balance,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(wallet_id)
        .bind(balance_after)
        .bind(occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a transaction row. Primary-key (`id`) conflict is treated as
    /// "already applied" and is a no-op, which is what makes replaying the
    /// same event idempotent.
    ///
    /// Returns `true` if a new row was inserted, `false` if it already existed.
    pub async fn insert_transaction_if_new(
        &self,
        id: &str,
        wallet_id: Uuid,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        related_wallet_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, ProjectionStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transaction_projections
                (id, wallet_id, type, amount, balance_after, related_wallet_id, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(wallet_id)
        .bind(transaction_type.as_str())
        .bind(amount)
        .bind(balance_after)
        .bind(related_wallet_id)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_wallet(&self, wallet_id: Uuid) -> Result<Option<WalletProjection>, ProjectionStoreError> {
        let row = sqlx::query_as::<_, WalletProjection>(
            "SELECT id, balance, created_at, updated_at FROM wallet_projections WHERE id = $1",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_transactions(&self, wallet_id: Uuid) -> Result<Vec<TransactionRow>, ProjectionStoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, wallet_id, type, amount, balance_after, related_wallet_id, "timestamp"
            FROM transaction_projections
            WHERE wallet_id = $1
            ORDER BY "timestamp" DESC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_strings() {
        assert_eq!(TransactionType::Deposit.as_str(), "DEPOSIT");
        assert_eq!(TransactionType::TransferIn.as_str(), "TRANSFER_IN");
        assert_eq!(TransactionType::TransferOut.as_str(), "TRANSFER_OUT");
        assert_eq!(TransactionType::Refund.as_str(), "REFUND");
    }
}
