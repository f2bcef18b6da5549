//! Fraud Consumer persistence.
//!
//! Three tables, each owned exclusively by the fraud consumer: a sliding
//! window of recent events per wallet, deduplicated alerts, and a risk
//! profile per wallet. None of these are read by the command side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::rules::{RiskLevel, Severity};

#[derive(Debug, thiserror::Error)]
pub enum FraudStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A row in the recent-events sliding window.
#[derive(Debug, Clone)]
pub struct RecentEvent {
    pub wallet_id: Uuid,
    pub event_type: String,
    pub amount: Decimal,
    pub transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FraudStore {
    pool: PgPool,
}

impl FraudStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an event into the sliding window. Idempotent on replay only in
    /// the sense that the rules that read this window are themselves
    /// alert-deduplicated — a duplicate row here would double-count velocity,
    /// so callers must only record an event once its handler has committed to
    /// processing it (it is not re-recorded on retry after an ack failure,
    /// since the handler only acks after this call succeeds).
    pub async fn record_event(
        &self,
        wallet_id: Uuid,
        event_type: &str,
        amount: Decimal,
        transaction_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), FraudStoreError> {
        sqlx::query(
            r#"
            INSERT INTO fraud_recent_events (wallet_id, event_type, amount, transaction_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(wallet_id)
        .bind(event_type)
        .bind(amount)
        .bind(transaction_id)
        .bind(occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All events for `wallet_id` in the last `window`, newest first.
    pub async fn recent_events(
        &self,
        wallet_id: Uuid,
        window: chrono::Duration,
    ) -> Result<Vec<RecentEvent>, FraudStoreError> {
        let cutoff = Utc::now() - window;
        let rows: Vec<(Uuid, String, Decimal, Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT wallet_id, event_type, amount, transaction_id, created_at
            FROM fraud_recent_events
            WHERE wallet_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(wallet_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(wallet_id, event_type, amount, transaction_id, created_at)| RecentEvent {
                wallet_id,
                event_type,
                amount,
                transaction_id,
                created_at,
            })
            .collect())
    }

    /// Prune rows older than `older_than`. Correctness of past alerts is
    /// unaffected by pruning.
    pub async fn prune_older_than(&self, older_than: chrono::Duration) -> Result<u64, FraudStoreError> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query("DELETE FROM fraud_recent_events WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert an alert. Returns `false` without error if `(transaction_id,
    /// rule_id)` already has an alert — the unique constraint on that pair is
    /// the dedup mechanism.
    pub async fn insert_alert_if_new(
        &self,
        wallet_id: Uuid,
        rule_id: &str,
        rule_name: &str,
        severity: Severity,
        transaction_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<bool, FraudStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO fraud_alerts
                (wallet_id, rule_id, rule_name, severity, transaction_id, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (transaction_id, rule_id) DO NOTHING
            "#,
        )
        .bind(wallet_id)
        .bind(rule_id)
        .bind(rule_name)
        .bind(severity.as_str())
        .bind(transaction_id)
        .bind(event_type)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Raise `wallet_id`'s risk score by `delta`, clamped to 100, and
    /// recompute its level bucket.
    /// Scores only move upward, so this is a plain upsert-and-add.
    pub async fn raise_risk_score(&self, wallet_id: Uuid, delta: i32) -> Result<(), FraudStoreError> {
        sqlx::query(
            r#"
            INSERT INTO fraud_risk_profiles (wallet_id, risk_score, risk_level, alert_count, last_updated)
            VALUES ($1, LEAST($2, 100), $3, 1, NOW())
            ON CONFLICT (wallet_id) DO UPDATE SET
                risk_score = LEAST(fraud_risk_profiles.risk_score + $2, 100),
                risk_level = $3,
                alert_count = fraud_risk_profiles.alert_count + 1,
                last_updated = NOW()
            "#,
        )
        .bind(wallet_id)
        .bind(delta)
        .bind(RiskLevel::from_score(delta.min(100).max(0)).as_str())
        .execute(&self.pool)
        .await?;

        // The level bucket above is computed from `delta` alone as a seed value
        // for a brand-new row; existing rows need it recomputed from the new
        // total, which the first statement cannot express in one pass cleanly.
        self.recompute_risk_level(wallet_id).await
    }

    async fn recompute_risk_level(&self, wallet_id: Uuid) -> Result<(), FraudStoreError> {
        let score: Option<i32> = sqlx::query_scalar(
            "SELECT risk_score FROM fraud_risk_profiles WHERE wallet_id = $1",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(score) = score {
            sqlx::query("UPDATE fraud_risk_profiles SET risk_level = $2 WHERE wallet_id = $1")
                .bind(wallet_id)
                .bind(RiskLevel::from_score(score).as_str())
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    pub async fn risk_score(&self, wallet_id: Uuid) -> Result<i32, FraudStoreError> {
        let score: Option<i32> = sqlx::query_scalar(
            "SELECT risk_score FROM fraud_risk_profiles WHERE wallet_id = $1",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(score.unwrap_or(0))
    }
}
