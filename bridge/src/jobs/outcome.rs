//! Mapping poll results to caller-facing responses

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing::error;

use crate::errors::BridgeError;
use crate::poll::completion::{Completion, CompletionReport};
use crate::poll::discovery::Discovery;

/// Final answer to one trigger or status request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: Option<String>,
    pub status: StatusCode,
    pub body: String,
}

impl JobOutcome {
    pub fn from_error(err: BridgeError) -> Self {
        if err.status_code().is_server_error() {
            error!(error_type = err.error_type(), "{}", err);
        }
        Self {
            job_id: None,
            status: err.status_code(),
            body: err.public_message(),
        }
    }

    /// Found → 200 with the job id; timeout → 500 without one
    pub fn from_discovery(discovery: Discovery) -> Self {
        match discovery {
            Discovery::Found(id) => Self {
                job_id: Some(id.clone()),
                status: StatusCode::OK,
                body: id,
            },
            Discovery::TimedOut { note, .. } => {
                Self::from_error(BridgeError::DiscoveryTimeout(note))
            }
            Discovery::Failed(err) => Self::from_error(err),
        }
    }

    /// Success → 200, failure or timeout → 500; console text attached to all three
    pub fn from_completion(report: CompletionReport) -> Self {
        let CompletionReport {
            job_id,
            completion,
            console,
        } = report;

        let (status, body) = match completion {
            Completion::Succeeded => (StatusCode::OK, console),
            Completion::Failed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, console),
            Completion::TimedOut { note, .. } => {
                let timeout = BridgeError::CompletionTimeout(format!("build {}: {}", job_id, note));
                let body = if console.is_empty() {
                    timeout.to_string()
                } else {
                    format!("{}\n\n{}", console.trim_end(), timeout)
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            Completion::Aborted(err) => (err.status_code(), err.public_message()),
        };

        Self {
            job_id: Some(job_id),
            status,
            body,
        }
    }

    /// Build still running, for the single-check status mode
    pub fn in_progress(job_id: &str) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            status: StatusCode::ACCEPTED,
            body: format!("Build {} in progress", job_id),
        }
    }
}

impl IntoResponse for JobOutcome {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}
