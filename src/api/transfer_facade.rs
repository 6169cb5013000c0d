use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::requests::{CreateTransferRequest, ProcessBatchRequest};
use crate::api::responses::{ApiResponse, BatchResponse, ErrorResponse, HealthResponse, TransferResponse};
use crate::context::RequestContext;
use crate::coordinator::batch::TransferIntent;
use crate::coordinator::{BatchDispatcher, CreateTransferOutcome, TransferCoordinator};
use crate::error::AppError;
use crate::observability::{get_metrics, HealthChecker};

/// Shared state for the Transfer HTTP Facade (§4.6): request framing, idempotency-key
/// header enforcement, correlation-id propagation, over the coordinator and batch
/// dispatcher.
#[derive(Clone)]
pub struct TransferAppState {
    pub coordinator: TransferCoordinator,
    pub batch_dispatcher: BatchDispatcher,
    pub pool: PgPool,
    pub metrics_handle: Option<PrometheusHandle>,
    pub health_checker: Arc<HealthChecker>,
}

impl TransferAppState {
    pub fn new(
        pool: PgPool,
        coordinator: TransferCoordinator,
        batch_dispatcher: BatchDispatcher,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            health_checker: Arc::new(HealthChecker::new(pool.clone())),
            pool,
            coordinator,
            batch_dispatcher,
            metrics_handle,
        }
    }
}

pub fn create_router(state: TransferAppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/transfers", post(create_transfer))
        .route("/transfers/:id", get(get_transfer))
        .route("/transfers/batch", post(process_batch))
        .with_state(state)
}

async fn health_check(State(state): State<TransferAppState>) -> Json<ApiResponse<HealthResponse>> {
    let aggregated = state.health_checker.check_all().await;
    let status = if aggregated.status.is_unhealthy() { "unhealthy" } else { "healthy" };
    Json(ApiResponse::success(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    }))
}

async fn readiness_check(State(state): State<TransferAppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn metrics_endpoint(State(state): State<TransferAppState>) -> String {
    state.metrics_handle.as_ref().map(|h| h.render()).unwrap_or_default()
}

/// Pulls the correlation id out of `X-Request-ID`, synthesizing one when absent, per
/// §4.6 / §5's "every external request carries a deadline propagated end-to-end via the
/// correlation context."
fn request_context(headers: &HeaderMap) -> RequestContext {
    match headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        Some(id) if !id.trim().is_empty() => RequestContext::new(id.to_string()),
        _ => RequestContext::generate(),
    }
}

/// `POST /transfers` (§6). Requires a non-empty `Idempotency-Key` header; missing or
/// empty maps to 400 before the body is even parsed for validation purposes.
async fn create_transfer(
    State(state): State<TransferAppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<ApiResponse<TransferResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let ctx = request_context(&headers);

    let idempotency_key = match headers.get("idempotency-key").and_then(|v| v.to_str().ok()) {
        Some(key) if !key.trim().is_empty() => key.to_string(),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(ErrorResponse::new(
                    "INVALID_REQUEST",
                    "Idempotency-Key header is required and must not be empty",
                ))),
            ))
        }
    };

    if let Err(errors) = request.validate() {
        let details = errors
            .into_iter()
            .map(|e| crate::api::responses::ValidationErrorDetail { field: e.field, message: e.message })
            .collect();
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(ErrorResponse::new("INVALID_REQUEST", "request validation failed").with_details(details))),
        ));
    }

    tracing::info!(correlation_id = %ctx.correlation_id, "create_transfer request accepted");

    let outcome = state
        .coordinator
        .create_transfer(&ctx, &idempotency_key, request.from_account_id, request.to_account_id, request.amount)
        .await
        .map_err(app_error_response)?;

    match &outcome {
        CreateTransferOutcome::Dispatched(_) => get_metrics().record_transfer_created(),
        CreateTransferOutcome::Existing(_) => get_metrics().record_idempotency_replay(),
    }

    Ok(Json(ApiResponse::success(outcome.into_record().into())))
}

/// `GET /transfers/{id}` (§6). Pure read by `transfer_id`.
async fn get_transfer(
    State(state): State<TransferAppState>,
    Path(transfer_id): Path<String>,
) -> Result<Json<ApiResponse<TransferResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.coordinator.get_transfer(&transfer_id).await.map_err(app_error_response)? {
        Some(record) => Ok(Json(ApiResponse::success(record.into()))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(ErrorResponse::new("NOT_FOUND", format!("transfer {transfer_id} not found")))),
        )),
    }
}

/// `POST /transfers/batch` (§6 / §4.5). Size is validated by `BatchDispatcher` itself
/// (1..=batch_cap); per-intent failures surface as FAILED records in their slot rather
/// than failing the whole batch.
async fn process_batch(
    State(state): State<TransferAppState>,
    headers: HeaderMap,
    Json(request): Json<ProcessBatchRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let ctx = request_context(&headers);
    tracing::info!(correlation_id = %ctx.correlation_id, count = request.transfers.len(), "batch request accepted");

    let intents: Vec<TransferIntent> = request
        .transfers
        .into_iter()
        .map(|t| TransferIntent {
            idempotency_key: t.idempotency_key,
            from_account_id: t.from_account_id,
            to_account_id: t.to_account_id,
            amount: t.amount,
        })
        .collect();

    let count = intents.len() as u64;
    let records = state.batch_dispatcher.process_batch(&ctx, intents).await.map_err(app_error_response)?;
    get_metrics().record_batch_processed(count);

    Ok(Json(ApiResponse::success(BatchResponse {
        transfers: records.into_iter().map(Into::into).collect(),
    })))
}

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
