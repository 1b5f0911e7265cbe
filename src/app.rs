//! Application setup and wiring

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_core::{AdmissionService, Config};

use crate::presentation::{AppState, create_router};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub admission: Arc<AdmissionService>,
    pub shutdown_token: CancellationToken,
    /// Idle sweeper task, absent when eviction is disabled
    pub sweeper: Option<JoinHandle<()>>,
}

/// Build the admission service, start its idle sweeper and create the router
///
/// Must be called from within a Tokio runtime.
pub fn create_app(config: Config) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let shutdown_token = CancellationToken::new();

    let admission = Arc::new(AdmissionService::new(config.admission.clone())?);
    let sweeper = Arc::clone(&admission).start_sweeper(shutdown_token.clone());
    if sweeper.is_none() {
        tracing::info!("Idle bucket eviction disabled");
    }

    let router = create_router(AppState::new(Arc::clone(&admission)), &config.server);

    Ok(AppHandle {
        router,
        admission,
        shutdown_token,
        sweeper,
    })
}
