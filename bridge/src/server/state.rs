//! Server state

use std::sync::Arc;

use crate::analytics::AnalyticsForwarder;
use crate::jobs::service::JobService;

/// Server state shared across handlers
pub struct ServerState {
    pub jobs: Arc<JobService>,
    pub analytics: Arc<AnalyticsForwarder>,
}

impl ServerState {
    pub fn new(jobs: Arc<JobService>, analytics: Arc<AnalyticsForwarder>) -> Self {
        Self { jobs, analytics }
    }
}
