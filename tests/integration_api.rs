//! HTTP API integration tests
//!
//! Exercises the axum router in-process against real Postgres/Redis/RabbitMQ
//! connections — the same infrastructure the production binaries expect.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use redis::aio::ConnectionManager;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use wallet_ledger::api::{self, AppState};
use wallet_ledger::bus::EventBusPublisher;
use wallet_ledger::event_store::EventLogStore;
use wallet_ledger::idempotency::IdempotencyStore;
use wallet_ledger::mediator::CommandMediator;
use wallet_ledger::projection::ProjectionStore;
use wallet_ledger::repository::AggregateRepository;
use wallet_ledger::saga::{SagaStore, TransferSagaOrchestrator};
use wallet_ledger::Config;

mod common;

async fn build_app() -> axum::Router {
    let pool = common::setup_test_db().await;
    let config = Config::from_env().expect("test environment must provide RabbitMQ/Redis config");

    let redis_client = redis::Client::open(config.redis_url()).unwrap();
    let redis_conn = ConnectionManager::new(redis_client).await.unwrap();

    let amqp = lapin::Connection::connect(&config.rabbitmq_url(), lapin::ConnectionProperties::default())
        .await
        .unwrap();
    let channel = amqp.create_channel().await.unwrap();
    let publisher = EventBusPublisher::new(channel).await.unwrap();

    let repository = AggregateRepository::new(EventLogStore::new(pool.clone()), publisher.clone());
    let sagas = SagaStore::new(pool.clone());
    let orchestrator = TransferSagaOrchestrator::new(
        AggregateRepository::new(EventLogStore::new(pool.clone()), publisher.clone()),
        sagas,
        publisher,
    );
    let idempotency = IdempotencyStore::new(redis_conn, config.idempotency_ttl_seconds);
    let mediator = CommandMediator::new(repository, orchestrator, idempotency);

    // Projections are only ever updated off the event bus; start
    // the real consumer so the read endpoints below have something to settle
    // into, and poll for it via `common::wait_for` rather than assuming it
    // has already happened by the time the mutating request returns.
    let _projection_consumer = common::spawn_projection_consumer(pool.clone()).await;

    let state = AppState {
        mediator: std::sync::Arc::new(mediator),
        projections: ProjectionStore::new(pool),
    };

    api::create_router().with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// GETs `/balance/{wallet_id}`, returning `None` on a 404 (projection not
/// caught up yet) instead of panicking, so callers can drive it through
/// [`common::wait_for`].
async fn try_get_balance(app: &axum::Router, wallet_id: Uuid) -> Option<Value> {
    let req = Request::builder()
        .method("GET")
        .uri(format!("/balance/{wallet_id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    if response.status() != StatusCode::OK {
        return None;
    }
    Some(body_json(response).await)
}

/// Polls `/balance/{wallet_id}` until the projection consumer has caught up
/// to `expected_balance` or panics after 5s.
async fn wait_for_balance(app: &axum::Router, wallet_id: Uuid, expected_balance: &str) -> Value {
    common::wait_for(Duration::from_secs(5), || async {
        let body = try_get_balance(app, wallet_id).await?;
        (body["balance"] == expected_balance).then_some(body)
    })
    .await
}

/// Polls `/transactions/{wallet_id}` until `predicate` holds over the
/// returned rows, or panics after 5s.
async fn wait_for_transactions(
    app: &axum::Router,
    wallet_id: Uuid,
    predicate: impl Fn(&[Value]) -> bool,
) -> Vec<Value> {
    common::wait_for(Duration::from_secs(5), || async {
        let req = Request::builder()
            .method("GET")
            .uri(format!("/transactions/{wallet_id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        if response.status() != StatusCode::OK {
            return None;
        }
        let rows = body_json(response).await.as_array().cloned().unwrap_or_default();
        predicate(&rows).then_some(rows)
    })
    .await
}

#[tokio::test]
async fn test_deposit_creates_wallet() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", "k1")
        .body(Body::from(
            json!({"walletId": wallet_id, "amount": 100}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["balance"], "100.00");

    wait_for_balance(&app, wallet_id, "100.00").await;
}

#[tokio::test]
async fn test_idempotent_replay_ignores_new_body() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();
    let key = format!("replay-{wallet_id}");

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", key.clone())
        .body(Body::from(json!({"walletId": wallet_id, "amount": 100}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same key, different body — must replay the first response verbatim.
    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", key)
        .body(Body::from(json!({"walletId": wallet_id, "amount": 999}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["balance"], "100.00");
    assert_eq!(body["_cached"], true);

    wait_for_balance(&app, wallet_id, "100.00").await;
}

#[tokio::test]
async fn test_missing_idempotency_key_is_rejected() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .body(Body::from(json!({"walletId": wallet_id, "amount": 100}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("x-idempotency-key"));
}

#[tokio::test]
async fn test_withdraw_insufficient_funds_returns_success_false() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();

    let req = Request::builder()
        .method("POST")
        .uri("/withdraw")
        .header("content-type", "application/json")
        .header("x-idempotency-key", "w1")
        .body(Body::from(json!({"walletId": wallet_id, "amount": 50}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_transfer_moves_balance_between_wallets() {
    let app = build_app().await;
    let from_id = Uuid::new_v4();
    let to_id = Uuid::new_v4();

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", format!("seed-{from_id}"))
        .body(Body::from(json!({"walletId": from_id, "amount": 500}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let req = Request::builder()
        .method("POST")
        .uri("/transfer")
        .header("content-type", "application/json")
        .header("x-idempotency-key", format!("transfer-{from_id}"))
        .body(Body::from(
            json!({"fromWalletId": from_id, "toWalletId": to_id, "amount": 200}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["fromBalance"], "300.00");
    assert_eq!(body["toBalance"], "200.00");

    wait_for_balance(&app, from_id, "300.00").await;
    wait_for_balance(&app, to_id, "200.00").await;
}

#[tokio::test]
async fn test_transactions_endpoint_lists_history() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", format!("hist-{wallet_id}"))
        .body(Body::from(json!({"walletId": wallet_id, "amount": 75}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let rows = wait_for_transactions(&app, wallet_id, |rows| {
        rows.iter().any(|row| row["type"] == "DEPOSIT")
    })
    .await;
    assert!(rows.iter().any(|row| row["type"] == "DEPOSIT"));
}

/// A key used on `/deposit` shadows a later `/withdraw` with the same key —
/// the idempotency namespace is global, not per-route. Surprising, but
/// asserted deliberately: it is the contract the store gives.
#[tokio::test]
async fn test_idempotency_key_shadows_across_endpoints() {
    let app = build_app().await;
    let wallet_id = Uuid::new_v4();
    let key = format!("shadow-{wallet_id}");

    let req = Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .header("x-idempotency-key", key.clone())
        .body(Body::from(json!({"walletId": wallet_id, "amount": 100}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let deposit_body = body_json(response).await;
    assert_eq!(deposit_body["success"], true);

    // Same key, different route and body — must replay the deposit's
    // response verbatim rather than executing a withdrawal.
    let req = Request::builder()
        .method("POST")
        .uri("/withdraw")
        .header("content-type", "application/json")
        .header("x-idempotency-key", key)
        .body(Body::from(json!({"walletId": wallet_id, "amount": 50}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], deposit_body["success"]);
    assert_eq!(body["balance"], "100.00");
    assert_eq!(body["_cached"], true);

    wait_for_balance(&app, wallet_id, "100.00").await;
}
