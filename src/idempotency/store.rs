//! Idempotency Store
//!
//! Short-lived keyed store mapping a client-supplied request key to
//! `{status, cached response}`, with an atomic check-and-lock. Backed by
//! Redis: a single key holds a JSON record, and `SET ... NX EX` gives the
//! atomic claim while `SET ... KEEPTTL` lets `complete` rewrite the record
//! without resetting the TTL clock, so a record's expiry is always measured
//! from its original `created_at`.
//!
//! The key namespace is intentionally global, not partitioned by endpoint:
//! reusing a key across `/deposit` and
//! `/withdraw` returns the first endpoint's cached response. This is
//! preserved as a deliberate contract, not an accident: clients that retry a
//! command with the same key are expected to get that command's result back
//! regardless of which route they retry it against.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Status of an idempotency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdempotencyRecord {
    status: IdempotencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

/// Outcome of `check_and_lock`.
#[derive(Debug)]
pub enum LockOutcome {
    /// The caller now owns this key and must eventually `complete` or `release` it.
    NewLock,
    /// Another worker holds the lock; the caller should respond 409.
    InProgress,
    /// The request already completed; return this cached payload verbatim.
    Completed(serde_json::Value),
}

#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Redis-backed idempotency store.
#[derive(Clone)]
pub struct IdempotencyStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

fn redis_key(key: &str) -> String {
    format!("idempotency:{key}")
}

impl IdempotencyStore {
    pub fn new(conn: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { conn, ttl_seconds }
    }

    /// Atomic set-if-not-exists with TTL. Returns `NewLock` if this call won
    /// the race, `InProgress`/`Completed` if a record already existed.
    pub async fn check_and_lock(&self, key: &str) -> Result<LockOutcome, IdempotencyError> {
        let redis_key = redis_key(key);
        let record = IdempotencyRecord {
            status: IdempotencyStatus::InProgress,
            response: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let value = serde_json::to_string(&record)?;

        let mut conn = self.conn.clone();
        let claimed: bool = redis::cmd("SET")
            .arg(&redis_key)
            .arg(&value)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async::<_, Option<String>>(&mut conn)
            .await?
            .is_some();

        if claimed {
            return Ok(LockOutcome::NewLock);
        }

        // Someone else's record already exists — inspect it.
        let existing: Option<String> = conn.get(&redis_key).await?;
        match existing {
            None => {
                // Raced: the key expired between our failed SET NX and the GET.
                // Treat this as if we'd won the lock on retry.
                Ok(LockOutcome::NewLock)
            }
            Some(raw) => {
                let record: IdempotencyRecord = serde_json::from_str(&raw)?;
                match record.status {
                    IdempotencyStatus::InProgress => Ok(LockOutcome::InProgress),
                    IdempotencyStatus::Completed => {
                        Ok(LockOutcome::Completed(record.response.unwrap_or(serde_json::Value::Null)))
                    }
                }
            }
        }
    }

    /// Mark `key` completed with `response`, keeping the original TTL clock.
    pub async fn complete(&self, key: &str, response: serde_json::Value) -> Result<(), IdempotencyError> {
        let redis_key = redis_key(key);
        let mut conn = self.conn.clone();

        let created_at = self.original_created_at(key).await?.unwrap_or_else(Utc::now);

        let record = IdempotencyRecord {
            status: IdempotencyStatus::Completed,
            response: Some(response),
            created_at,
            completed_at: Some(Utc::now()),
        };
        let value = serde_json::to_string(&record)?;

        redis::cmd("SET")
            .arg(&redis_key)
            .arg(&value)
            .arg("KEEPTTL")
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    /// Delete the lock so the client may retry (used when processing fails).
    pub async fn release(&self, key: &str) -> Result<(), IdempotencyError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(redis_key(key)).await?;
        Ok(())
    }

    async fn original_created_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, IdempotencyError> {
        let mut conn = self.conn.clone();
        let existing: Option<String> = conn.get(redis_key(key)).await?;
        Ok(match existing {
            Some(raw) => Some(serde_json::from_str::<IdempotencyRecord>(&raw)?.created_at),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = IdempotencyRecord {
            status: IdempotencyStatus::Completed,
            response: Some(serde_json::json!({"balance": "100.00"})),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: IdempotencyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, IdempotencyStatus::Completed);
    }
}
