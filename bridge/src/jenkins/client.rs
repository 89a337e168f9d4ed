//! Job server HTTP client

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

use crate::errors::BridgeError;
use crate::jenkins::diagnose::{self, HostDiagnostics};
use crate::jenkins::models::{BuildInfo, RemoteStep};
use crate::jenkins::url::{parse_server, JobUrl};

/// Answer to a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Remote job server capability.
///
/// Poll loops only ever talk to the job server through this trait, so they
/// can be driven by a scripted fake in tests.
#[async_trait]
pub trait JenkinsApi: Send + Sync {
    /// Plain unauthenticated GET of the server root
    async fn probe_root(&self) -> Result<StatusCode, BridgeError>;

    /// POST the start request. Connection failures come back as
    /// [`BridgeError::UnreachableRemote`].
    async fn start_build(&self, job: &JobUrl) -> Result<StartResponse, BridgeError>;

    /// Query `{base}/lastBuild/api/json`
    async fn last_build(&self, job: &JobUrl) -> RemoteStep<BuildInfo>;

    /// Query `{base}/{job_id}/api/json`
    async fn build_info(&self, job: &JobUrl, job_id: &str) -> RemoteStep<BuildInfo>;

    /// Fetch `{base}/{job_id}/consoleText`
    async fn console_text(&self, job: &JobUrl, job_id: &str) -> Result<String, BridgeError>;

    /// Gather host diagnostics after a failed dispatch
    async fn diagnose_host(&self) -> HostDiagnostics;
}

/// reqwest-backed [`JenkinsApi`]
pub struct JenkinsClient {
    client: Client,
    root: Url,
}

impl JenkinsClient {
    /// Create a new client for the given job server
    pub fn new(server: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            root: parse_server(server)?,
        })
    }

    fn host(&self) -> &str {
        self.root.host_str().unwrap_or_default()
    }

    /// Describe the root probe result for diagnostics
    async fn probe_text(&self) -> String {
        match self.probe_root().await {
            Ok(status) => format!("HTTP {}", status),
            Err(e) => e.to_string(),
        }
    }

    async fn fetch_build(&self, job: &JobUrl, url: Url) -> RemoteStep<BuildInfo> {
        let shown = job.display_url(&url);
        let path = url.path().to_string();
        debug!("GET {}", shown);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = job.redact(&e.without_url().to_string());
                warn!("Query of {} failed: {}", shown, reason);
                return RemoteStep::Retryable(reason);
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return RemoteStep::Fatal(BridgeError::JobNotFound(path));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return RemoteStep::Fatal(BridgeError::RemoteRejected {
                status: status.as_u16(),
                message: "credentials were not accepted".to_string(),
            });
        }
        if !status.is_success() {
            return RemoteStep::Retryable(format!("HTTP {} from {}", status, path));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RemoteStep::Retryable(job.redact(&e.without_url().to_string())),
        };

        match serde_json::from_str::<BuildInfo>(&body) {
            Ok(info) => RemoteStep::Ready(info),
            Err(e) => RemoteStep::Retryable(format!("malformed build document: {}", e)),
        }
    }

    /// Whether `{base}/api/json` exists, i.e. the job path is real
    async fn job_exists(&self, job: &JobUrl) -> Option<bool> {
        let response = self.client.get(job.job_info_url()).send().await.ok()?;
        match response.status() {
            StatusCode::NOT_FOUND => Some(false),
            status if status.is_success() => Some(true),
            _ => None,
        }
    }
}

#[async_trait]
impl JenkinsApi for JenkinsClient {
    async fn probe_root(&self) -> Result<StatusCode, BridgeError> {
        debug!("GET {}", self.root);
        let response = self
            .client
            .get(self.root.clone())
            .send()
            .await
            .map_err(|e| BridgeError::UnreachableRemote(e.without_url().to_string()))?;
        Ok(response.status())
    }

    async fn start_build(&self, job: &JobUrl) -> Result<StartResponse, BridgeError> {
        debug!("POST {}", job);

        let response = self
            .client
            .post(job.expose_url().clone())
            .send()
            .await
            .map_err(|e| {
                let unreachable = e.is_connect() || e.is_timeout();
                let reason = job.redact(&e.without_url().to_string());
                if unreachable {
                    BridgeError::UnreachableRemote(reason)
                } else {
                    BridgeError::RemoteProtocol(reason)
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Start request failed: {} - {}", status, job);
        }
        Ok(StartResponse { status, body })
    }

    async fn last_build(&self, job: &JobUrl) -> RemoteStep<BuildInfo> {
        match self.fetch_build(job, job.last_build_url()).await {
            // A real job with no builds yet also answers 404 here
            RemoteStep::Fatal(BridgeError::JobNotFound(path)) => match self.job_exists(job).await {
                Some(false) => RemoteStep::Fatal(BridgeError::JobNotFound(path)),
                Some(true) => RemoteStep::Retryable("job has no builds yet".to_string()),
                None => RemoteStep::Retryable(format!("{} not available yet", path)),
            },
            step => step,
        }
    }

    async fn build_info(&self, job: &JobUrl, job_id: &str) -> RemoteStep<BuildInfo> {
        self.fetch_build(job, job.build_info_url(job_id)).await
    }

    async fn console_text(&self, job: &JobUrl, job_id: &str) -> Result<String, BridgeError> {
        let url = job.console_url(job_id);
        debug!("GET {}", job.display_url(&url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::RemoteProtocol(job.redact(&e.without_url().to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::RemoteRejected {
                status: status.as_u16(),
                message: format!("console text for build {} unavailable", job_id),
            });
        }

        response
            .text()
            .await
            .map_err(|e| BridgeError::RemoteProtocol(job.redact(&e.without_url().to_string())))
    }

    async fn diagnose_host(&self) -> HostDiagnostics {
        let port = self.root.port_or_known_default().unwrap_or(80);
        diagnose::collect(self.host(), port, self.probe_text()).await
    }
}
