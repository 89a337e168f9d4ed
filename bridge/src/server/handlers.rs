//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::errors::BridgeError;
use crate::jobs::request::TriggerRequest;
use crate::server::state::ServerState;
use crate::utils::version_info;

pub const LIVENESS_TEXT: &str = "Hello I'm alive! Please make requests to /build";

/// Liveness handler
pub async fn root_handler() -> &'static str {
    LIVENESS_TEXT
}

/// Domain-validation passthrough
pub async fn acme_challenge_handler(Path(token): Path<String>) -> String {
    info!("ACME challenge accepted: {}", token);
    token
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Start a build and answer with its id
pub async fn trigger_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match parse_body(&state, body, false) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let span = request_span("trigger", &request);
    state.jobs.trigger(&request).instrument(span).await.into_response()
}

/// Start a build and hold the connection until it finishes
pub async fn run_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match parse_body(&state, body, false) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let span = request_span("run", &request);
    state.jobs.run(&request).instrument(span).await.into_response()
}

/// Single status check of a known build
pub async fn monitor_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match parse_body(&state, body, true) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let span = request_span("monitor", &request);
    if let Some(job_id) = &request.job_id {
        span.record("job_id", job_id.as_str());
    }
    state.jobs.status(&request).instrument(span).await.into_response()
}

/// Legacy build form
#[derive(Debug, Deserialize)]
pub struct BuildForm {
    pub job_id: Option<String>,
    pub auth_key: Option<String>,
}

/// Legacy plain build trigger, passes the remote answer through
pub async fn build_handler(
    State(state): State<Arc<ServerState>>,
    form: Result<Form<BuildForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => return BridgeError::Validation(e.body_text()).into_response(),
    };

    let span = info_span!("build", request_id = %Uuid::new_v4());
    let result = state
        .jobs
        .trigger_plain(
            form.job_id.as_deref().unwrap_or_default(),
            form.auth_key.as_deref().unwrap_or_default(),
        )
        .instrument(span)
        .await;

    match result {
        Ok(response) => (response.status, response.body).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Forward the fixed analytics event
pub async fn analytics_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.analytics.forward().await {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => e.into_response(),
    }
}

fn parse_body(
    state: &ServerState,
    body: Result<Json<Value>, JsonRejection>,
    require_job_id: bool,
) -> Result<TriggerRequest, BridgeError> {
    let Json(value) = body.map_err(|e| BridgeError::Validation(e.body_text()))?;
    let fields: Map<String, Value> = match value {
        Value::Object(fields) => fields,
        _ => {
            return Err(BridgeError::Validation(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };
    state.jobs.parse_request(fields, require_job_id)
}

fn request_span(operation: &'static str, request: &TriggerRequest) -> Span {
    info_span!(
        "job_request",
        operation,
        request_id = %Uuid::new_v4(),
        job_type = %request.job_type,
        services = %request.services,
        job_id = tracing::field::Empty,
    )
}
