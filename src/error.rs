//! HTTP-edge error mapping.
//!
//! Domain/repository/mediator errors are typed at their own layer; this is
//! where they get translated into HTTP status codes. `Validation` covers the
//! "bad input" bucket (non-positive amount, missing field, malformed JSON,
//! missing idempotency key, wallet not found on read) — none of these are
//! retryable without the client changing something.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::idempotency::IdempotencyError;
use crate::mediator::MediatorError;
use crate::repository::RepositoryError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A mutating endpoint was called without the required header.
    #[error("missing required header: {0}")]
    MissingIdempotencyKey(&'static str),

    /// Malformed JSON, unknown fields, or a value that fails domain
    /// validation (e.g. non-positive amount) before it ever reaches a
    /// command.
    #[error("validation error: {0}")]
    Validation(String),

    /// A wallet read found nothing — treated as a validation failure, not a
    /// domain error, since no aggregate has ever existed.
    #[error("wallet not found: {0}")]
    WalletNotFound(uuid::Uuid),

    /// Another worker currently holds the idempotency lock for this key;
    /// respond 409.
    #[error("a request with this idempotency key is already in progress")]
    IdempotencyInProgress,

    /// Infrastructure failure (DB/broker/redis); safe to retry.
    #[error("transient infrastructure failure: {0}")]
    TransientInfrastructure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MediatorError> for AppError {
    fn from(err: MediatorError) -> Self {
        match err {
            MediatorError::Idempotency(e) => e.into(),
            MediatorError::Domain(e) => AppError::Validation(e.to_string()),
            MediatorError::Repository(e) => e.into(),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Domain(e) => AppError::Validation(e.to_string()),
            RepositoryError::ConcurrencyConflict { wallet_id } => {
                AppError::TransientInfrastructure(format!("concurrency conflict on wallet {wallet_id}"))
            }
            RepositoryError::TransientInfrastructure(msg) => AppError::TransientInfrastructure(msg),
        }
    }
}

impl From<IdempotencyError> for AppError {
    fn from(err: IdempotencyError) -> Self {
        AppError::TransientInfrastructure(err.to_string())
    }
}

impl From<crate::projection::ProjectionStoreError> for AppError {
    fn from(err: crate::projection::ProjectionStoreError) -> Self {
        AppError::TransientInfrastructure(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingIdempotencyKey(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::WalletNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IdempotencyInProgress => StatusCode::CONFLICT,
            AppError::TransientInfrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
