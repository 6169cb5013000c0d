use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::requests::{ApplyTransferRequest, CreateAccountRequest};
use crate::api::responses::{
    AccountResponse, ApiResponse, ApplyTransferResponse, ErrorResponse, HealthResponse, ValidationErrorDetail,
};
use crate::error::AppError;
use crate::ledger::{ApplyOutcome, LedgerEngine};
use crate::observability::{get_metrics, HealthChecker};

/// Shared state for the Ledger HTTP Facade (§4.2): one-to-one mapping of engine
/// operations to request/response pairs, plus the observability endpoints every
/// process carries regardless of business scope.
#[derive(Clone)]
pub struct LedgerAppState {
    pub engine: Arc<LedgerEngine>,
    pub pool: PgPool,
    pub metrics_handle: Option<PrometheusHandle>,
    pub health_checker: Arc<HealthChecker>,
}

impl LedgerAppState {
    pub fn new(pool: PgPool, metrics_handle: Option<PrometheusHandle>) -> Self {
        Self {
            engine: Arc::new(LedgerEngine::new(pool.clone())),
            health_checker: Arc::new(HealthChecker::new(pool.clone())),
            pool,
            metrics_handle,
        }
    }
}

pub fn create_router(state: LedgerAppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/ledger/transfer", post(apply_transfer))
        .with_state(state)
}

async fn health_check(State(state): State<LedgerAppState>) -> Json<ApiResponse<HealthResponse>> {
    let aggregated = state.health_checker.check_all().await;
    let status = if aggregated.status.is_unhealthy() { "unhealthy" } else { "healthy" };
    Json(ApiResponse::success(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    }))
}

async fn readiness_check(State(state): State<LedgerAppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn metrics_endpoint(State(state): State<LedgerAppState>) -> String {
    state.metrics_handle.as_ref().map(|h| h.render()).unwrap_or_default()
}

/// `POST /accounts` (§6). `initialBalance` must be strictly positive; violations map to
/// 400 via `CreateAccountRequest::validate`, the same validation-error envelope the
/// 4xx/5xx split in §4.2 calls for.
async fn create_account(
    State(state): State<LedgerAppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    if let Err(errors) = request.validate() {
        return Err(validation_error_response(errors));
    }

    let account = state
        .engine
        .create_account(request.initial_balance)
        .await
        .map_err(app_error_response)?;

    get_metrics().record_account_created();
    Ok((StatusCode::OK, Json(ApiResponse::success(account.into()))))
}

async fn get_account(
    State(state): State<LedgerAppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<AccountResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.engine.get_account(id).await.map_err(app_error_response)? {
        Some(account) => Ok(Json(ApiResponse::success(account.into()))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(ErrorResponse::new("ACCOUNT_NOT_FOUND", format!("account {id} not found")))),
        )),
    }
}

/// `POST /ledger/transfer` (§6). Deterministic rejections map to 400 with a structured
/// reason; transient storage failures surface as 500. `alreadyApplied` is reported as
/// `success: true` — the caller cannot distinguish first application from replay.
async fn apply_transfer(
    State(state): State<LedgerAppState>,
    Json(request): Json<ApplyTransferRequest>,
) -> Result<Json<ApiResponse<ApplyTransferResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    if let Err(errors) = request.validate() {
        return Err(validation_error_response(errors));
    }

    let outcome = state
        .engine
        .apply_transfer(&request.transfer_id, request.from_account_id, request.to_account_id, request.amount)
        .await
        .map_err(app_error_response)?;

    let (message, already_applied) = match outcome {
        ApplyOutcome::Applied { .. } => ("transfer applied".to_string(), false),
        ApplyOutcome::AlreadyApplied => ("transfer already applied".to_string(), true),
    };
    get_metrics().record_transfer_applied(already_applied);

    Ok(Json(ApiResponse::success(ApplyTransferResponse { success: true, message })))
}

fn validation_error_response(errors: Vec<crate::api::requests::ValidationError>) -> (StatusCode, Json<ApiResponse<()>>) {
    let details: Vec<ValidationErrorDetail> =
        errors.into_iter().map(|e| ValidationErrorDetail { field: e.field, message: e.message }).collect();
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(ErrorResponse::new("INVALID_REQUEST", "request validation failed").with_details(details))),
    )
}

/// Maps the transport-independent taxonomy (§7) onto the status classes §4.2 specifies:
/// deterministic rejections are 4xx, transient failures are 5xx.
fn app_error_response(err: AppError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &err {
        AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        AppError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        AppError::IdempotencyConflict => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(ErrorResponse::new(err.code(), err.to_string()))))
}
