//! Projection consumer binary
//!
//! Standalone process: consumes the full wallet event stream on its own
//! durable queue and maintains the wallet/transaction read models. Runs
//! independently of the command-side HTTP server and the fraud consumer.

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::bus::run_consumer;
use wallet_ledger::db;
use wallet_ledger::projection::{ProjectionConsumer, ProjectionStore};
use wallet_ledger::Config;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "projection_consumer=debug".into()),
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
        .connect(&config.db_read_url)
        .await?;

    if !db::check_read_schema(&pool).await? {
        anyhow::bail!("read-role database schema incomplete");
    }

    let amqp = lapin::Connection::connect(
        &config.rabbitmq_url(),
        lapin::ConnectionProperties::default(),
    )
    .await?;
    let channel = amqp.create_channel().await?;

    let store = ProjectionStore::new(pool);
    let consumer = ProjectionConsumer::new(store);

    tracing::info!("projection consumer starting");
    run_consumer(channel, "projection-consumer", &["wallet.#"], consumer).await?;

    Ok(())
}
