//! Saga recovery scanner binary
//!
//! Operationally-scheduled counterpart to the in-process scanner the HTTP
//! server starts alongside itself: runs on a fixed interval and reports any
//! transfer saga stuck in a non-terminal status past the staleness
//! threshold, for an operator to act on.

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::db;
use wallet_ledger::saga::SagaRecoveryScanner;
use wallet_ledger::saga::SagaStore;
use wallet_ledger::Config;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saga_recovery=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.db_write_url)
        .await?;

    if !db::check_write_schema(&pool).await? {
        anyhow::bail!("write-role database schema incomplete");
    }

    let sagas = SagaStore::new(pool);

    tracing::info!("saga recovery scanner starting as standalone process");
    SagaRecoveryScanner::new(sagas).start().await?;

    Ok(())
}
