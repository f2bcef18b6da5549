//! Event Log Store
//!
//! Append-only durable log of aggregate events with a per-aggregate monotonic
//! version and a uniqueness constraint on (aggregate_id, version). Payload is
//! an opaque structured blob as far as the store is concerned; it does not
//! interpret it.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{StoredEvent, WalletEvent};

use super::EventStoreError;

/// A single event to append, already tagged with its type and payload.
pub struct NewEvent {
    pub event_type: &'static str,
    pub payload: serde_json::Value,
    pub transaction_id: Uuid,
}

impl NewEvent {
    pub fn from_wallet_event(event: &WalletEvent) -> Result<Self, EventStoreError> {
        Ok(Self {
            event_type: event.event_type(),
            payload: serde_json::to_value(event)?,
            transaction_id: event.transaction_id(),
        })
    }
}

/// Durable event log backed by a single Postgres table with a unique
/// constraint on `(aggregate_id, version)`. Provides linearizable writes per
/// aggregate id.
#[derive(Debug, Clone)]
pub struct EventLogStore {
    pool: PgPool,
}

impl EventLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically append `events` for `aggregate_id`, succeeding only if the
    /// aggregate's current version still equals `expected_version`. On
    /// success the new events occupy versions
    /// `expected_version+1 .. expected_version+N`. On conflict, no row is
    /// written — the caller reloads and retries.
    pub async fn append(
        &self,
        aggregate_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
        expected_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        // Lock the aggregate's version row set with a SELECT ... FOR UPDATE-less
        // check: the unique constraint on (aggregate_id, version) is the source
        // of truth for conflict detection, so a plain read-then-insert inside a
        // single serializable-enough transaction is race-free at the database
        // level — two concurrent transactions inserting the same
        // (aggregate_id, expected_version+1) row will have one fail the unique
        // constraint, which we surface as ConcurrencyConflict.
        let current_version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await?;

        if current_version != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current_version,
            });
        }

        let mut stored = Vec::with_capacity(events.len());
        let now = Utc::now();

        for (offset, event) in events.into_iter().enumerate() {
            let version = expected_version + offset as i64 + 1;

            let insert_result = sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO events (aggregate_id, aggregate_type, version, event_type, payload, "timestamp", transaction_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(aggregate_id)
            .bind(aggregate_type)
            .bind(version)
            .bind(event.event_type)
            .bind(&event.payload)
            .bind(now)
            .bind(event.transaction_id)
            .fetch_one(&mut *tx)
            .await;

            let id = match insert_result {
                Ok((id,)) => id,
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: version - 1,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            stored.push(StoredEvent {
                id,
                aggregate_type: aggregate_type.to_string(),
                aggregate_id,
                version,
                event_type: event.event_type.to_string(),
                payload: event.payload,
                timestamp: now,
                transaction_id: event.transaction_id,
            });
        }

        tx.commit().await?;

        Ok(stored)
    }

    /// Load all events for an aggregate, ordered by version ascending.
    pub async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows: Vec<(i64, String, Uuid, i64, String, serde_json::Value, chrono::DateTime<Utc>, Uuid)> =
            sqlx::query_as(
                r#"
                SELECT id, aggregate_type, aggregate_id, version, event_type, payload, "timestamp", transaction_id
                FROM events
                WHERE aggregate_id = $1
                ORDER BY version ASC
                "#,
            )
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, aggregate_type, aggregate_id, version, event_type, payload, timestamp, transaction_id)| {
                    StoredEvent {
                        id,
                        aggregate_type,
                        aggregate_id,
                        version,
                        event_type,
                        payload,
                        timestamp,
                        transaction_id,
                    }
                },
            )
            .collect())
    }

    /// Decode a loaded event log into its typed `WalletEvent`s, in version order.
    pub fn as_wallet_events(events: &[StoredEvent]) -> Result<Vec<WalletEvent>, EventStoreError> {
        events
            .iter()
            .map(|e| serde_json::from_value(e.payload.clone()).map_err(EventStoreError::from))
            .collect()
    }

    /// The aggregate's current version, or 0 if it has no events.
    pub async fn latest_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_from_wallet_event() {
        use crate::domain::Amount;
        use rust_decimal::Decimal;

        let event = WalletEvent::MoneyDeposited {
            wallet_id: Uuid::new_v4(),
            amount: Amount::new(Decimal::new(100, 0)).unwrap().value(),
            balance_after: Decimal::new(10000, 2),
            transaction_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        let new_event = NewEvent::from_wallet_event(&event).unwrap();
        assert_eq!(new_event.event_type, "MoneyDeposited");
        assert_eq!(new_event.transaction_id, event.transaction_id());
    }
}
