//! Application state management

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::analytics::AnalyticsForwarder;
use crate::app::options::AppOptions;
use crate::errors::BridgeError;
use crate::jenkins::client::{JenkinsApi, JenkinsClient};
use crate::jenkins::url::JobUrlBuilder;
use crate::jobs::service::JobService;

/// Main application state
pub struct AppState {
    /// Remote job flows
    pub jobs: Arc<JobService>,

    /// Analytics gateway forwarder
    pub analytics: Arc<AnalyticsForwarder>,
}

impl AppState {
    /// Initialize application state against the configured job server
    pub fn init(options: &AppOptions) -> Result<Self, BridgeError> {
        info!("Initializing application state...");

        let api = Arc::new(JenkinsClient::new(
            &options.jenkins.server,
            options.jenkins.request_timeout,
        )?);
        Self::with_api(options, api)
    }

    /// Initialize application state with a given job server client
    pub fn with_api(options: &AppOptions, api: Arc<dyn JenkinsApi>) -> Result<Self, BridgeError> {
        let urls = JobUrlBuilder::new(&options.jenkins.server)?;
        let jobs = Arc::new(JobService::new(
            api,
            urls,
            options.poll.clone(),
            options.jenkins.short_key_policy,
        ));

        let analytics = Arc::new(AnalyticsForwarder::new(
            options.analytics.gateway_url.clone(),
            options
                .analytics
                .token
                .as_ref()
                .map(|token| SecretString::from(token.expose_secret().to_owned())),
            options.jenkins.request_timeout,
        )?);

        Ok(Self { jobs, analytics })
    }
}
