//! Database module
//!
//! Connection verification and schema presence checks. There is no
//! migrations tooling here: schema is applied externally, and this module
//! only verifies the tables each role's pool expects are already there
//! before the process starts serving traffic.

use sqlx::PgPool;

pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

async fn tables_exist(pool: &PgPool, tables: &[&str]) -> Result<bool, sqlx::Error> {
    for table in tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!(table = *table, "required table does not exist");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Checks the write-role pool owns the event log and saga tables.
pub async fn check_write_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    tables_exist(pool, &["events", "transfer_sagas"]).await
}

/// Checks the read-role pool owns the projection tables.
pub async fn check_read_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    tables_exist(pool, &["wallet_projections", "transaction_projections"]).await
}

/// Checks the fraud-role pool owns the fraud tables.
pub async fn check_fraud_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    tables_exist(
        pool,
        &["fraud_recent_events", "fraud_alerts", "fraud_risk_profiles"],
    )
    .await
}
