//! Scripted job server for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use jobbridge::app::options::AppOptions;
use jobbridge::app::state::AppState;
use jobbridge::errors::BridgeError;
use jobbridge::jenkins::client::{JenkinsApi, StartResponse};
use jobbridge::jenkins::diagnose::HostDiagnostics;
use jobbridge::jenkins::models::{BuildInfo, RemoteStep};
use jobbridge::jenkins::url::JobUrl;
use jobbridge::poll::PollOptions;
use jobbridge::sanitize::ShortKeyPolicy;

/// A key of the expected length
pub const GOOD_KEY: &str = "11f0e5a9c2d84b7aa1c0de55f00dbabe42";

pub const SERVER: &str = "jenkins.test.local";

/// Scripted answers, one per query, then a fallback forever after
pub struct Script {
    queue: Mutex<VecDeque<RemoteStep<BuildInfo>>>,
    fallback: Option<BuildInfo>,
}

impl Script {
    pub fn new(steps: Vec<RemoteStep<BuildInfo>>, fallback: Option<BuildInfo>) -> Self {
        Self {
            queue: Mutex::new(steps.into()),
            fallback,
        }
    }

    fn next(&self) -> RemoteStep<BuildInfo> {
        if let Some(step) = self.queue.lock().unwrap().pop_front() {
            return step;
        }
        match &self.fallback {
            Some(build) => RemoteStep::Ready(build.clone()),
            None => RemoteStep::Retryable("nothing scripted".to_string()),
        }
    }
}

pub struct FakeJenkins {
    /// None simulates a refused connection
    pub root_status: Option<StatusCode>,
    pub start_status: StatusCode,
    pub start_unreachable: bool,
    pub start_body: String,
    pub console: Result<String, String>,
    pub last_build: Script,
    pub build_info: Script,
    pub start_calls: AtomicU32,
    pub last_build_calls: AtomicU32,
    pub build_info_calls: AtomicU32,
    pub console_calls: AtomicU32,
    pub diagnose_calls: AtomicU32,
    pub started: Mutex<Vec<String>>,
}

impl Default for FakeJenkins {
    fn default() -> Self {
        Self {
            root_status: Some(StatusCode::FORBIDDEN),
            start_status: StatusCode::CREATED,
            start_unreachable: false,
            start_body: String::new(),
            console: Ok("Started by remote host\nFinished".to_string()),
            last_build: Script::new(Vec::new(), None),
            build_info: Script::new(Vec::new(), None),
            start_calls: AtomicU32::new(0),
            last_build_calls: AtomicU32::new(0),
            build_info_calls: AtomicU32::new(0),
            console_calls: AtomicU32::new(0),
            diagnose_calls: AtomicU32::new(0),
            started: Mutex::new(Vec::new()),
        }
    }
}

impl FakeJenkins {
    pub fn with_last_build(
        mut self,
        steps: Vec<RemoteStep<BuildInfo>>,
        fallback: Option<BuildInfo>,
    ) -> Self {
        self.last_build = Script::new(steps, fallback);
        self
    }

    pub fn with_build_info(
        mut self,
        steps: Vec<RemoteStep<BuildInfo>>,
        fallback: Option<BuildInfo>,
    ) -> Self {
        self.build_info = Script::new(steps, fallback);
        self
    }

    /// Answers `lastBuild` with a running build from the first query on
    pub fn starts_immediately(self, id: &str) -> Self {
        self.with_last_build(Vec::new(), Some(BuildInfo::in_progress(id)))
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JenkinsApi for FakeJenkins {
    async fn probe_root(&self) -> Result<StatusCode, BridgeError> {
        self.root_status
            .ok_or_else(|| BridgeError::UnreachableRemote("connection refused".to_string()))
    }

    async fn start_build(&self, job: &JobUrl) -> Result<StartResponse, BridgeError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.started
            .lock()
            .unwrap()
            .push(job.expose_url().to_string());
        if self.start_unreachable {
            return Err(BridgeError::UnreachableRemote("connection refused".to_string()));
        }
        Ok(StartResponse {
            status: self.start_status,
            body: self.start_body.clone(),
        })
    }

    async fn last_build(&self, _job: &JobUrl) -> RemoteStep<BuildInfo> {
        self.last_build_calls.fetch_add(1, Ordering::SeqCst);
        self.last_build.next()
    }

    async fn build_info(&self, _job: &JobUrl, _job_id: &str) -> RemoteStep<BuildInfo> {
        self.build_info_calls.fetch_add(1, Ordering::SeqCst);
        self.build_info.next()
    }

    async fn console_text(&self, _job: &JobUrl, _job_id: &str) -> Result<String, BridgeError> {
        self.console_calls.fetch_add(1, Ordering::SeqCst);
        self.console.clone().map_err(BridgeError::RemoteProtocol)
    }

    async fn diagnose_host(&self) -> HostDiagnostics {
        self.diagnose_calls.fetch_add(1, Ordering::SeqCst);
        HostDiagnostics {
            host: SERVER.to_string(),
            resolve_error: Some("no such host".to_string()),
            http_probe: "connection refused".to_string(),
            ..Default::default()
        }
    }
}

/// Poll budgets shrunk to zero-length sleeps
pub fn fast_poll() -> PollOptions {
    PollOptions {
        discovery_attempts: 30,
        discovery_interval: Duration::from_millis(0),
        completion_attempts: 120,
        completion_interval: Duration::from_millis(0),
    }
}

pub fn options(policy: ShortKeyPolicy) -> AppOptions {
    let mut options = AppOptions::default();
    options.jenkins.server = SERVER.to_string();
    options.jenkins.short_key_policy = policy;
    options.poll = fast_poll();
    options
}

pub fn app_state(fake: Arc<FakeJenkins>) -> AppState {
    AppState::with_api(&options(ShortKeyPolicy::Reject), fake).unwrap()
}

pub fn trigger_body(job_type: &str) -> serde_json::Value {
    serde_json::json!({
        "auth_usr": "ci-bot",
        "auth_key": GOOD_KEY,
        "services": "web",
        "job_type": job_type,
    })
}
