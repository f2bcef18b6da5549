//! Common test utilities
//!
//! Schema is applied externally (no in-process migrations tooling): these
//! helpers assume the `events`, `transfer_sagas`,
//! `wallet_projections`, `transaction_projections`, `fraud_recent_events`,
//! `fraud_alerts` and `fraud_risk_profiles` tables already exist and only
//! truncate them between tests.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use wallet_ledger::bus::run_consumer;
use wallet_ledger::projection::{ProjectionConsumer, ProjectionStore};
use wallet_ledger::Config;

/// Connects to the write-role database and truncates every wallet table.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DB_WRITE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DB_WRITE_URL or DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to DB");

    sqlx::query(
        "TRUNCATE TABLE events, transfer_sagas, wallet_projections, transaction_projections, \
         fraud_recent_events, fraud_alerts, fraud_risk_profiles CASCADE",
    )
    .execute(&pool)
    .await
    .expect("failed to clean up DB");

    pool
}

/// Starts a `ProjectionConsumer` against the real bus for the duration of the
/// test process, on a queue unique to this test run. Projections are only
/// ever updated asynchronously off the event bus; tests that read
/// `/balance` or `/transactions` right after a mutating command must give
/// this consumer a chance to catch up, via [`wait_for`] below, rather than
/// assuming the read model is already settled.
pub async fn spawn_projection_consumer(read_pool: PgPool) -> tokio::task::JoinHandle<()> {
    let config = Config::from_env().expect("test environment must provide RabbitMQ config");
    let amqp = lapin::Connection::connect(&config.rabbitmq_url(), lapin::ConnectionProperties::default())
        .await
        .expect("failed to connect to rabbitmq for test projection consumer");
    let channel = amqp.create_channel().await.expect("failed to open amqp channel");

    let queue_name = format!("test-projection-consumer-{}", uuid::Uuid::new_v4());
    let consumer = ProjectionConsumer::new(ProjectionStore::new(read_pool));

    tokio::spawn(async move {
        // Test-only: leaked on purpose so the queue/connection outlive this task.
        let _amqp = amqp;
        if let Err(err) = run_consumer(channel, &queue_name, &["wallet.#"], consumer).await {
            eprintln!("test projection consumer exited: {err}");
        }
    })
}

/// Polls `check` until it returns `Some`, or panics after `timeout` — used to
/// observe the eventual effects of the projection consumer without a fixed
/// sleep.
pub async fn wait_for<F, Fut, T>(timeout: Duration, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return value;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition did not become true within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
