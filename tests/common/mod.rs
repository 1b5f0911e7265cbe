//! Common test utilities for the tollgate integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use tollgate::Config;
use tollgate::presentation::middleware::ADMIN_TOKEN_HEADER;
use tollgate_core::config::LimitConfig;

pub const ADMIN_TOKEN: &str = "integration-admin";

/// Default config with a small, slow bucket and the admin routes enabled
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.admin_token = Some(ADMIN_TOKEN.to_string());
    config.admission.default = LimitConfig {
        capacity: 2,
        refill_rate_per_second: 0.001,
    };
    config
}

pub fn check_request(key: &str, cost: Option<f64>) -> Request<Body> {
    let body = match cost {
        Some(cost) => serde_json::json!({ "key": key, "cost": cost }),
        None => serde_json::json!({ "key": key }),
    };
    Request::builder()
        .method("POST")
        .uri("/api/v1/admission/check")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `POST /api/v1/admin/reset/{key}`, with the admin header when a token is given
pub fn reset_request(key: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/admin/reset/{key}"));
    if let Some(token) = token {
        builder = builder.header(ADMIN_TOKEN_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
