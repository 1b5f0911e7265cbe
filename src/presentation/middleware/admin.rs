use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::presentation::models::ErrorResponse;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Token guarding the administrative routes
#[derive(Clone)]
pub struct AdminAuthState {
    token: Arc<str>,
}

impl AdminAuthState {
    pub fn new(token: &str) -> Self {
        Self {
            token: Arc::from(token),
        }
    }

    fn accepts(&self, provided: &str) -> bool {
        provided.as_bytes().ct_eq(self.token.as_bytes()).into()
    }
}

/// Reject requests whose `x-admin-token` header does not match the configured token
pub async fn admin_auth_middleware(
    State(state): State<AdminAuthState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());
    let header_present = provided.is_some();

    if provided.is_some_and(|token| state.accepts(token)) {
        return next.run(request).await;
    }

    tracing::warn!(
        uri = %request.uri(),
        header_present,
        "Rejected admin request"
    );
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(
            "UNAUTHORIZED",
            "Missing or invalid admin token",
            None,
        )),
    )
        .into_response()
}
