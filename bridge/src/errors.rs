//! Error types for the job bridge

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::jenkins::diagnose::HostDiagnostics;

/// Main error type for the job bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Remote job server unreachable: {0}")]
    UnreachableRemote(String),

    #[error("Remote job server host unreachable: {0}")]
    HostUnreachable(Box<HostDiagnostics>),

    #[error("Remote job server rejected request with status {status}: {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Build was not observed starting: {0}")]
    DiscoveryTimeout(String),

    #[error("Build did not finish in time: {0}")]
    CompletionTimeout(String),

    #[error("Unexpected response from remote job server: {0}")]
    RemoteProtocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnknownJobType(_) => "unknown_job_type",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::UnreachableRemote(_) => "unreachable_remote",
            Self::HostUnreachable(_) => "host_unreachable",
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::JobNotFound(_) => "job_not_found",
            Self::DiscoveryTimeout(_) => "discovery_timeout",
            Self::CompletionTimeout(_) => "completion_timeout",
            Self::RemoteProtocol(_) => "remote_protocol_error",
            Self::Http(_) => "http_error",
            Self::Json(_) => "json_error",
            Self::Config(_) => "config_error",
            Self::Server(_) => "server_error",
            Self::Shutdown(_) => "shutdown_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnknownJobType(_) | Self::InvalidCredential(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::UnreachableRemote(_)
            | Self::HostUnreachable(_)
            | Self::RemoteRejected { .. }
            | Self::DiscoveryTimeout(_)
            | Self::CompletionTimeout(_)
            | Self::RemoteProtocol(_)
            | Self::Http(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Server(_)
            | Self::Shutdown(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Host diagnostics and transport details are kept in the server log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(_)
            | Self::UnknownJobType(_)
            | Self::InvalidCredential(_)
            | Self::JobNotFound(_)
            | Self::DiscoveryTimeout(_)
            | Self::CompletionTimeout(_)
            | Self::RemoteRejected { .. } => self.to_string(),
            Self::UnreachableRemote(_) | Self::HostUnreachable(_) => {
                "Remote job server is unreachable, see server logs for diagnostics".to_string()
            }
            Self::RemoteProtocol(_) => {
                "Unexpected response from remote job server".to_string()
            }
            Self::Config(_) => "Service is not configured for this operation".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error_type = self.error_type(), "{}", self);
        }
        (status, self.public_message()).into_response()
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Internal(err.to_string())
    }
}
