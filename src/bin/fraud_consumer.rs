//! Fraud consumer binary
//!
//! Standalone process: consumes the full wallet event stream on its own
//! durable queue, independent of the projection consumer, and maintains the
//! fraud tables nothing else writes to.

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::bus::run_consumer;
use wallet_ledger::db;
use wallet_ledger::fraud::FraudConsumer;
use wallet_ledger::Config;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_consumer=debug".into()),
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
        .connect(&config.db_fraud_url)
        .await?;

    if !db::check_fraud_schema(&pool).await? {
        anyhow::bail!("fraud-role database schema incomplete");
    }

    let amqp = lapin::Connection::connect(
        &config.rabbitmq_url(),
        lapin::ConnectionProperties::default(),
    )
    .await?;
    let channel = amqp.create_channel().await?;

    let consumer = FraudConsumer::new(wallet_ledger::fraud::FraudStore::new(pool));

    tracing::info!("fraud consumer starting");
    run_consumer(channel, "fraud-consumer", &["wallet.#"], consumer).await?;

    Ok(())
}
