//! HTTP controllers for admission checks and bucket status

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tollgate_core::AdmissionService;

use crate::presentation::models::{
    CheckRequest, DecisionResponse, ErrorResponse, HealthResponse, StatsResponse, StatusResponse,
};

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionService>,
}

impl AppState {
    pub fn new(admission: Arc<AdmissionService>) -> Self {
        Self { admission }
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u64) {
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
}

/// Check and consume tokens for a key
#[utoipa::path(
    post,
    path = "/api/v1/admission/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Request admitted", body = DecisionResponse),
        (status = 400, description = "Invalid cost", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    ),
    tag = "admission"
)]
pub async fn check_admission(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Response {
    let cost = request.cost.unwrap_or(1.0);

    let decision = match state.admission.check(&request.key, cost) {
        Ok(decision) => decision,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    e.code(),
                    e.to_string(),
                    Some(serde_json::json!({ "key": request.key, "cost": cost })),
                )),
            )
                .into_response();
        }
    };

    let body = DecisionResponse::new(&request.key, &decision);
    let limit = body.limit;
    let remaining = body.remaining;

    if decision.allowed {
        let mut response = (StatusCode::OK, Json(body)).into_response();
        insert_rate_limit_headers(response.headers_mut(), limit, remaining);
        return response;
    }

    let retry_after = body.retry_after_seconds;
    tracing::warn!(
        key = %request.key,
        cost,
        retry_after,
        "Rate limit exceeded"
    );

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse::new(
            "RATE_LIMIT_EXCEEDED",
            format!("Rate limit exceeded. Please retry after {retry_after} seconds."),
            serde_json::to_value(&body).ok(),
        )),
    )
        .into_response();

    let headers = response.headers_mut();
    insert_rate_limit_headers(headers, limit, remaining);
    headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Current bucket state for a key, without consuming tokens
#[utoipa::path(
    get,
    path = "/api/v1/admission/status/{key}",
    params(
        ("key" = String, Path, description = "Rate limit key")
    ),
    responses(
        (status = 200, description = "Bucket status", body = StatusResponse)
    ),
    tag = "admission"
)]
pub async fn get_status(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let status = state.admission.status(&key);
    let body = StatusResponse::new(&key, &status);

    let (limit, remaining) = (body.limit, body.remaining);
    let mut response = Json(body).into_response();
    insert_rate_limit_headers(response.headers_mut(), limit, remaining);
    response
}

/// Admission totals
#[utoipa::path(
    get,
    path = "/api/v1/admission/stats",
    responses(
        (status = 200, description = "Admission statistics", body = StatsResponse)
    ),
    tag = "admission"
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.admission.stats().into())
}

/// Refill a key's bucket to capacity
#[utoipa::path(
    post,
    path = "/api/v1/admin/reset/{key}",
    params(
        ("key" = String, Path, description = "Rate limit key")
    ),
    responses(
        (status = 204, description = "Bucket refilled"),
        (status = 401, description = "Missing or invalid admin token", body = ErrorResponse)
    ),
    tag = "admin",
    security(
        ("admin_token" = [])
    )
)]
pub async fn reset_bucket(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    state.admission.reset(&key);
    StatusCode::NO_CONTENT
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
