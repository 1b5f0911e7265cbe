//! Route definitions and server setup

use std::time::Duration;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use tollgate_core::config::ServerConfig;

use crate::presentation::{
    controllers::{AppState, check_admission, get_stats, get_status, health_check, reset_bucket},
    middleware::{ADMIN_TOKEN_HEADER, AdminAuthState, admin_auth_middleware},
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::check_admission,
        crate::presentation::controllers::get_status,
        crate::presentation::controllers::get_stats,
        crate::presentation::controllers::reset_bucket,
        crate::presentation::controllers::health_check
    ),
    components(
        schemas(
            CheckRequest,
            DecisionResponse,
            StatusResponse,
            StatsResponse,
            ErrorResponse,
            HealthResponse
        )
    ),
    modifiers(&AdminTokenAddon),
    tags(
        (name = "admission", description = "Per-key token bucket admission checks"),
        (name = "admin", description = "Administrative bucket operations"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Tollgate API",
        description = "Per-key token bucket admission control. Each key gets a bucket that refills at a steady rate and admits bursts up to its capacity.",
        license(
            name = "AGPL-3.0",
            url = "https://www.gnu.org/licenses/agpl-3.0.html"
        )
    )
)]
pub struct ApiDoc;

struct AdminTokenAddon;

impl utoipa::Modify for AdminTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_TOKEN_HEADER))),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the application router
///
/// The admin routes are only mounted when `config.admin_token` is set.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut api_routes = Router::new()
        .route("/admission/check", post(check_admission))
        .route("/admission/status/{key}", get(get_status))
        .route("/admission/stats", get(get_stats));

    match &config.admin_token {
        Some(token) => {
            let admin_routes = Router::new()
                .route("/admin/reset/{key}", post(reset_bucket))
                .layer(middleware::from_fn_with_state(
                    AdminAuthState::new(token),
                    admin_auth_middleware,
                ));
            api_routes = api_routes.merge(admin_routes);
        }
        None => {
            tracing::info!("No admin token configured; admin routes disabled");
        }
    }

    let service_builder = ServiceBuilder::new()
        // HTTP tracing
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds),
        ));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(service_builder)
        .with_state(state)
}
