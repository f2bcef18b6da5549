//! API Routes
//!
//! Three mutating commands behind the idempotency envelope, and two read
//! endpoints served directly from the projection read models.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Amount;
use crate::error::{AppError, AppResult};
use crate::mediator::CommandOutcome;
use crate::projection::TransactionRow;

use super::AppState;

const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/transfer", post(transfer))
        .route("/balance/:wallet_id", get(get_balance))
        .route("/transactions/:wallet_id", get(list_transactions))
}

#[derive(Debug, Serialize)]
struct PingResponse {
    #[serde(rename = "commandService")]
    command_service: &'static str,
    #[serde(rename = "queryService")]
    query_service: &'static str,
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        command_service: "ok",
        query_service: "ok",
    })
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingIdempotencyKey(IDEMPOTENCY_KEY_HEADER))
}

/// Accepts either a JSON number or a numeric string for `amount` (clients
/// commonly send a bare number; the wire format the event log stores is a
/// decimal string). Either way, it is parsed into a validated `Amount`.
fn parse_amount(value: &serde_json::Value) -> Result<Amount, AppError> {
    let raw = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(AppError::Validation("amount must be a number or numeric string".to_string())),
    };
    raw.parse::<Amount>().map_err(|e| AppError::Validation(e.to_string()))
}

/// Turns a mediator outcome into an HTTP response: a fresh outcome returns
/// as-is, a replay is annotated with `_cached`/`_idempotencyKey` but still
/// 201, and an in-progress lock is a 409.
fn outcome_into_response(outcome: CommandOutcome, key: &str) -> Response {
    match outcome {
        CommandOutcome::Fresh { response, status } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::CREATED);
            (status, Json(response)).into_response()
        }
        CommandOutcome::Cached { mut response } => {
            if let Some(obj) = response.as_object_mut() {
                obj.insert("_cached".to_string(), serde_json::Value::Bool(true));
                obj.insert(
                    "_idempotencyKey".to_string(),
                    serde_json::Value::String(key.to_string()),
                );
            }
            (StatusCode::CREATED, Json(response)).into_response()
        }
        CommandOutcome::InProgress => AppError::IdempotencyInProgress.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct DepositRequest {
    #[serde(rename = "walletId")]
    wallet_id: Uuid,
    amount: serde_json::Value,
}

async fn deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DepositRequest>,
) -> Response {
    let key = match idempotency_key(&headers) {
        Ok(key) => key,
        Err(err) => return err.into_response(),
    };
    let amount = match parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(err) => return err.into_response(),
    };

    match state.mediator.deposit(&key, body.wallet_id, amount).await {
        Ok(outcome) => outcome_into_response(outcome, &key),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct WithdrawRequest {
    #[serde(rename = "walletId")]
    wallet_id: Uuid,
    amount: serde_json::Value,
}

async fn withdraw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<WithdrawRequest>,
) -> Response {
    let key = match idempotency_key(&headers) {
        Ok(key) => key,
        Err(err) => return err.into_response(),
    };
    let amount = match parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(err) => return err.into_response(),
    };

    match state.mediator.withdraw(&key, body.wallet_id, amount).await {
        Ok(outcome) => outcome_into_response(outcome, &key),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    #[serde(rename = "fromWalletId")]
    from_wallet_id: Uuid,
    #[serde(rename = "toWalletId")]
    to_wallet_id: Uuid,
    amount: serde_json::Value,
}

async fn transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TransferRequest>,
) -> Response {
    let key = match idempotency_key(&headers) {
        Ok(key) => key,
        Err(err) => return err.into_response(),
    };
    let amount = match parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(err) => return err.into_response(),
    };

    match state
        .mediator
        .transfer(&key, body.from_wallet_id, body.to_wallet_id, amount)
        .await
    {
        Ok(outcome) => outcome_into_response(outcome, &key),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    id: Uuid,
    balance: Decimal,
    #[serde(rename = "createdAt")]
    created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: chrono::DateTime<chrono::Utc>,
}

async fn get_balance(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> AppResult<Json<BalanceResponse>> {
    let projection = state
        .projections
        .get_wallet(wallet_id)
        .await?
        .ok_or(AppError::WalletNotFound(wallet_id))?;

    Ok(Json(BalanceResponse {
        id: projection.id,
        balance: projection.balance,
        created_at: projection.created_at,
        updated_at: projection.updated_at,
    }))
}

#[derive(Debug, Serialize)]
struct TransactionResponse {
    id: String,
    #[serde(rename = "walletId")]
    wallet_id: Uuid,
    #[serde(rename = "type")]
    transaction_type: String,
    amount: Decimal,
    #[serde(rename = "balanceAfter")]
    balance_after: Decimal,
    #[serde(rename = "relatedWalletId", skip_serializing_if = "Option::is_none")]
    related_wallet_id: Option<Uuid>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<TransactionRow> for TransactionResponse {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id,
            wallet_id: row.wallet_id,
            transaction_type: row.transaction_type,
            amount: row.amount,
            balance_after: row.balance_after,
            related_wallet_id: row.related_wallet_id,
            timestamp: row.timestamp,
        }
    }
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> AppResult<Json<Vec<TransactionResponse>>> {
    let rows = state.projections.list_transactions(wallet_id).await?;
    Ok(Json(rows.into_iter().map(TransactionResponse::from).collect()))
}
