//! Trigger, wait and status flows

use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::errors::BridgeError;
use crate::jenkins::client::{JenkinsApi, StartResponse};
use crate::jenkins::health;
use crate::jenkins::models::RemoteStep;
use crate::jenkins::url::{Credentials, JobUrl, JobUrlBuilder};
use crate::jobs::outcome::JobOutcome;
use crate::jobs::request::TriggerRequest;
use crate::poll::completion::{await_completion, CompletionReport};
use crate::poll::discovery::{discover, Discovery};
use crate::poll::PollOptions;
use crate::sanitize::{sanitize_fields, sanitize_str, ShortKeyPolicy};
use crate::utils::truncate;

/// CI user the legacy `/build` trigger authenticates as
pub const LEGACY_BUILD_USER: &str = "github_actions_bmt";

/// Turns validated requests into remote builds
pub struct JobService {
    api: Arc<dyn JenkinsApi>,
    urls: JobUrlBuilder,
    poll: PollOptions,
    key_policy: ShortKeyPolicy,
}

impl JobService {
    pub fn new(
        api: Arc<dyn JenkinsApi>,
        urls: JobUrlBuilder,
        poll: PollOptions,
        key_policy: ShortKeyPolicy,
    ) -> Self {
        Self {
            api,
            urls,
            poll,
            key_policy,
        }
    }

    /// Sanitize and validate a raw request body
    pub fn parse_request(
        &self,
        body: Map<String, Value>,
        require_job_id: bool,
    ) -> Result<TriggerRequest, BridgeError> {
        let sanitized = sanitize_fields(body, self.key_policy);
        TriggerRequest::from_fields(&sanitized, self.key_policy, require_job_id)
    }

    /// Start a build and return its id as soon as it is seen running
    pub async fn trigger(&self, request: &TriggerRequest) -> JobOutcome {
        match self.start(request).await {
            Ok((_, discovery)) => JobOutcome::from_discovery(discovery),
            Err(e) => JobOutcome::from_error(e),
        }
    }

    /// Start a build and block until it finishes
    pub async fn run(&self, request: &TriggerRequest) -> JobOutcome {
        let (job, job_id) = match self.start(request).await {
            Ok((job, Discovery::Found(job_id))) => (job, job_id),
            Ok((_, discovery)) => return JobOutcome::from_discovery(discovery),
            Err(e) => return JobOutcome::from_error(e),
        };

        let report = self.wait(&job, &job_id).await;
        JobOutcome::from_completion(report)
    }

    /// One status check of a known build, no polling
    pub async fn status(&self, request: &TriggerRequest) -> JobOutcome {
        let job_id = match request.job_id.as_deref() {
            Some(id) => id,
            None => {
                return JobOutcome::from_error(BridgeError::Validation(
                    "Missing required fields: job_id".to_string(),
                ))
            }
        };

        let job = match self.job_url(request) {
            Ok(job) => job,
            Err(e) => return JobOutcome::from_error(e),
        };

        match self.api.build_info(&job, job_id).await {
            RemoteStep::Ready(build) if build.building => JobOutcome::in_progress(job_id),
            RemoteStep::Ready(build) => {
                let console = match self.api.console_text(&job, job_id).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Console text for build {} unavailable: {}", job_id, e);
                        String::new()
                    }
                };
                let status = if build.succeeded() {
                    StatusCode::OK
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                JobOutcome {
                    job_id: Some(job_id.to_string()),
                    status,
                    body: console,
                }
            }
            RemoteStep::Retryable(reason) => {
                JobOutcome::from_error(BridgeError::RemoteProtocol(reason))
            }
            RemoteStep::Fatal(e) => JobOutcome::from_error(e),
        }
    }

    /// Legacy plain trigger of `/job/{job}/build`; the remote answer is passed through
    pub async fn trigger_plain(
        &self,
        job: &str,
        auth_key: &str,
    ) -> Result<StartResponse, BridgeError> {
        let job = sanitize_str(job);
        let auth_key = sanitize_str(auth_key);
        if job.is_empty() || auth_key.is_empty() {
            return Err(BridgeError::Validation(
                "Missing required fields: job_id, auth_key".to_string(),
            ));
        }

        let url = self
            .urls
            .build_plain(&job, &Credentials::new(LEGACY_BUILD_USER, auth_key))?;
        info!("Triggering {}", url);
        match self.api.start_build(&url).await {
            Err(BridgeError::UnreachableRemote(reason)) => {
                Err(self.unreachable(&url, &reason).await)
            }
            other => other,
        }
    }

    fn job_url(&self, request: &TriggerRequest) -> Result<JobUrl, BridgeError> {
        self.urls.build(
            request.job_type.as_str(),
            &request.services,
            &request.credentials(),
        )
    }

    async fn start(&self, request: &TriggerRequest) -> Result<(JobUrl, Discovery), BridgeError> {
        let job = self.dispatch(request).await?;
        let discovery = discover(self.api.as_ref(), &job, &self.poll, tokio::time::sleep).await;
        Ok((job, discovery))
    }

    /// Health check, then fire the start request
    async fn dispatch(&self, request: &TriggerRequest) -> Result<JobUrl, BridgeError> {
        if !health::is_reachable(self.api.as_ref()).await {
            return Err(BridgeError::UnreachableRemote(format!(
                "{} did not answer the liveness probe with 403",
                self.urls.root()
            )));
        }

        let job = self.job_url(request)?;
        info!("Dispatching {}", job);

        match self.api.start_build(&job).await {
            Ok(response) if response.status.is_success() => Ok(job),
            Ok(response) => {
                warn!(
                    "Start request for {} refused with {}: {}",
                    job,
                    response.status,
                    job.redact(&truncate(&response.body, 200))
                );
                Err(BridgeError::RemoteRejected {
                    status: response.status.as_u16(),
                    message: "start request was refused".to_string(),
                })
            }
            Err(BridgeError::UnreachableRemote(reason)) => {
                Err(self.unreachable(&job, &reason).await)
            }
            Err(e) => Err(e),
        }
    }

    async fn unreachable(&self, job: &JobUrl, reason: &str) -> BridgeError {
        let diagnostics = self.api.diagnose_host().await;
        error!("Dispatch to {} failed: {}; {}", job, reason, diagnostics);
        BridgeError::HostUnreachable(Box::new(diagnostics))
    }

    async fn wait(&self, job: &JobUrl, job_id: &str) -> CompletionReport {
        await_completion(self.api.as_ref(), job, job_id, &self.poll, tokio::time::sleep).await
    }
}
