//! Wallet Ledger — command-side HTTP server
//!
//! Serves the mutating wallet commands (deposit/withdraw/transfer) and the
//! read endpoints backed by the projection consumer's read models. The
//! projection and fraud consumers run as their own binaries; this process
//! additionally runs the saga recovery scanner in-process as a best-effort
//! safety net alongside the standalone `saga_recovery` binary.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{middleware, Router};
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::api::{self, AppState};
use wallet_ledger::bus::EventBusPublisher;
use wallet_ledger::event_store::EventLogStore;
use wallet_ledger::idempotency::IdempotencyStore;
use wallet_ledger::mediator::CommandMediator;
use wallet_ledger::projection::ProjectionStore;
use wallet_ledger::repository::AggregateRepository;
use wallet_ledger::saga::{SagaRecoveryScanner, SagaStore, TransferSagaOrchestrator};
use wallet_ledger::{db, Config};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn connect_pool(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::create_router())
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(256))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("starting wallet ledger command service");

    let db_write = connect_pool(&config.db_write_url, config.database_max_connections).await?;
    let db_read = connect_pool(&config.db_read_url, config.database_max_connections).await?;
    let db_fraud = connect_pool(&config.db_fraud_url, config.database_max_connections).await?;

    if !db::check_write_schema(&db_write).await? {
        anyhow::bail!("write-role database schema incomplete");
    }
    if !db::check_read_schema(&db_read).await? {
        anyhow::bail!("read-role database schema incomplete");
    }
    if !db::check_fraud_schema(&db_fraud).await? {
        anyhow::bail!("fraud-role database schema incomplete");
    }
    tracing::info!("database schema verified across write/read/fraud roles");

    let redis_client = redis::Client::open(config.redis_url())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;

    let amqp = lapin::Connection::connect(
        &config.rabbitmq_url(),
        lapin::ConnectionProperties::default(),
    )
    .await?;
    let channel = amqp.create_channel().await?;
    let publisher = EventBusPublisher::new(channel).await?;
    tracing::info!("connected to rabbitmq, topic exchange declared");

    let event_log = EventLogStore::new(db_write.clone());
    let repository = AggregateRepository::new(event_log, publisher.clone());

    let sagas = SagaStore::new(db_write.clone());
    let saga_orchestrator = TransferSagaOrchestrator::new(
        AggregateRepository::new(EventLogStore::new(db_write.clone()), publisher.clone()),
        sagas.clone(),
        publisher,
    );

    let idempotency = IdempotencyStore::new(redis_conn, config.idempotency_ttl_seconds);
    let mediator = CommandMediator::new(repository, saga_orchestrator, idempotency);

    let projection_store = ProjectionStore::new(db_read);

    // Best-effort safety net; the standalone
    // `saga_recovery` binary is the operationally-scheduled counterpart.
    SagaRecoveryScanner::new(sagas).start();

    let state = AppState {
        mediator: std::sync::Arc::new(mediator),
        projections: projection_store,
    };

    let app = build_router(state);

    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutting down");
    db_fraud.close().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracing::info!("goodbye");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        },
    }
}
