use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Transport-independent error taxonomy for both facades.
///
/// Deterministic rejections (`InvalidRequest`, `AccountNotFound`, `InsufficientFunds`,
/// `IdempotencyConflict`) are never retried by callers and propagate verbatim with their
/// reason. `Transient` is retried internally, bounded, by whoever emits it. `Unavailable`
/// never reaches an HTTP client as a 5xx; the coordinator folds it into a FAILED transfer
/// record instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("account not found: {0}")]
    AccountNotFound(i64),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("idempotency key already used with different parameters")]
    IdempotencyConflict,

    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("downstream ledger unavailable")]
    Unavailable,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    /// Transport-independent error code, matching the taxonomy in the design notes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            AppError::Transient(_) => "TRANSIENT",
            AppError::Unavailable => "UNAVAILABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors a caller must not retry.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            AppError::InvalidRequest(_)
                | AppError::AccountNotFound(_)
                | AppError::InsufficientFunds { .. }
                | AppError::IdempotencyConflict
        )
    }

    /// Classifies a raw sqlx error as transient (retryable) vs. an opaque database failure.
    /// Serialization failures and deadlock victims carry SQLSTATE 40001 / 40P01 in Postgres.
    pub fn from_sqlx_transient(err: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(code) = db_err.code() {
                if code == "40001" || code == "40P01" {
                    return AppError::Transient(db_err.message().to_string());
                }
            }
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            AppError::IdempotencyConflict => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !self.is_deterministic() {
            tracing::error!(error = %self, "internal error");
        }

        let message = if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
            "an internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                code: self.code(),
                message,
            }),
        )
            .into_response()
    }
}
