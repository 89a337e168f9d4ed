//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::BridgeError;
use crate::server::handlers::{
    acme_challenge_handler, analytics_handler, build_handler, monitor_handler, root_handler,
    run_handler, trigger_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Liveness and metadata
        .route("/", get(root_handler))
        .route("/version", get(version_handler))
        .route("/.well-known/acme-challenge/{token}", get(acme_challenge_handler))
        // Jobs
        .route("/trigger_jenkins_job", post(trigger_handler))
        .route("/run_jenkins_job", post(run_handler))
        .route("/monitor_jenkins_job", get(monitor_handler))
        .route("/build", post(build_handler))
        // Analytics
        .route("/analytics", post(analytics_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), BridgeError>>, BridgeError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgeError::Server(format!("Unable to bind {}: {}", addr, e)))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| BridgeError::Server(e.to_string()))
    });

    Ok(handle)
}
