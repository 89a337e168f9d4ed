//! Job server liveness probe

use http::StatusCode;
use tracing::{debug, warn};

use crate::jenkins::client::JenkinsApi;

/// Check that the job server is up and guarding its API.
///
/// An unauthenticated GET of the root is expected to answer 403. Any other
/// status, or no answer at all, means the server is down or misconfigured.
pub async fn is_reachable<A: JenkinsApi + ?Sized>(api: &A) -> bool {
    match api.probe_root().await {
        Ok(StatusCode::FORBIDDEN) => {
            debug!("Job server answered 403, reachable");
            true
        }
        Ok(status) => {
            warn!("Job server answered {} to the liveness probe, expected 403", status);
            false
        }
        Err(e) => {
            warn!("Job server liveness probe failed: {}", e);
            false
        }
    }
}
