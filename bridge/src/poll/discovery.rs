//! Discovery of a freshly started build
//!
//! The start request does not return a build id, and the job server's
//! `lastBuild` view lags behind it. Discovery keeps asking for the newest
//! build until one reports that it is running.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::BridgeError;
use crate::jenkins::client::JenkinsApi;
use crate::jenkins::models::{BuildInfo, RemoteStep};
use crate::jenkins::url::JobUrl;
use crate::poll::{PollOptions, PollState, PollStatus};

/// Terminal discovery states
#[derive(Debug)]
pub enum Discovery {
    /// A running build was observed
    Found(String),

    /// Budget spent without observing a running build
    TimedOut { attempts: u32, note: String },

    /// A non-retryable answer, e.g. the job path does not exist
    Failed(BridgeError),
}

/// Feed one `lastBuild` answer into the search.
///
/// Returns `Some` once the search is over.
pub fn advance(state: &mut PollState, step: RemoteStep<BuildInfo>) -> Option<Discovery> {
    state.spend();

    match step {
        RemoteStep::Ready(build) if build.building => {
            state.status = PollStatus::InProgress;
            return Some(Discovery::Found(build.id));
        }
        RemoteStep::Ready(build) => {
            debug!("Latest build {} is not running yet", build.id);
            state.note_answer(format!("latest build {} is not running", build.id));
        }
        RemoteStep::Retryable(reason) => {
            warn!(
                "Discovery attempt {} got no usable answer: {}",
                state.attempts(),
                reason
            );
            state.note_hiccup(reason);
        }
        RemoteStep::Fatal(err) => return Some(Discovery::Failed(err)),
    }

    if state.is_exhausted() {
        state.status = PollStatus::TimedOut;
        return Some(Discovery::TimedOut {
            attempts: state.attempts(),
            note: timeout_note(state),
        });
    }
    None
}

fn timeout_note(state: &PollState) -> String {
    let last = state.last_reason().unwrap_or("none");
    if state.answered() == 0 {
        format!(
            "no usable answer in {} attempts; the job path may be wrong or the build never started (last: {})",
            state.attempts(),
            last
        )
    } else {
        format!(
            "the job server answered but no new build started in {} attempts; the queue may be slow (last: {})",
            state.attempts(),
            last
        )
    }
}

/// Poll `{base}/lastBuild/api/json` until a running build shows up
pub async fn discover<A, S, F>(
    api: &A,
    job: &JobUrl,
    options: &PollOptions,
    sleep_fn: S,
) -> Discovery
where
    A: JenkinsApi + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut state = PollState::new(options.discovery_attempts, options.discovery_interval);
    info!(
        "Waiting for build of {} to start (up to {} attempts)",
        job, state.remaining_tries
    );

    loop {
        let step = api.last_build(job).await;
        if let Some(outcome) = advance(&mut state, step) {
            match &outcome {
                Discovery::Found(id) => {
                    info!("Build {} started after {} attempts", id, state.attempts())
                }
                Discovery::TimedOut { note, .. } => warn!("Build discovery timed out: {}", note),
                Discovery::Failed(e) => warn!("Build discovery aborted: {}", e),
            }
            return outcome;
        }
        sleep_fn(state.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tries: u32) -> PollState {
        PollState::new(tries, Duration::from_secs(1))
    }

    #[test]
    fn test_running_build_is_found() {
        let mut s = state(30);
        let out = advance(&mut s, RemoteStep::Ready(BuildInfo::in_progress("12")));
        assert!(matches!(out, Some(Discovery::Found(id)) if id == "12"));
        assert_eq!(s.status, PollStatus::InProgress);
        assert_eq!(s.remaining_tries, 29);
    }

    #[test]
    fn test_finished_build_keeps_searching() {
        let mut s = state(30);
        let out = advance(&mut s, RemoteStep::Ready(BuildInfo::finished("11", "SUCCESS")));
        assert!(out.is_none());
        assert_eq!(s.status, PollStatus::NotStarted);
        assert_eq!(s.answered(), 1);
    }

    #[test]
    fn test_hiccup_is_retried() {
        let mut s = state(30);
        let out = advance(&mut s, RemoteStep::Retryable("malformed".into()));
        assert!(out.is_none());
        assert_eq!(s.last_reason(), Some("malformed"));
    }

    #[test]
    fn test_fatal_stops_immediately() {
        let mut s = state(30);
        let out = advance(
            &mut s,
            RemoteStep::Fatal(BridgeError::JobNotFound("/job/nope".into())),
        );
        assert!(matches!(out, Some(Discovery::Failed(BridgeError::JobNotFound(_)))));
        assert_eq!(s.attempts(), 1);
    }

    #[test]
    fn test_timeout_on_last_attempt() {
        let mut s = state(3);
        assert!(advance(&mut s, RemoteStep::Retryable("a".into())).is_none());
        assert!(advance(&mut s, RemoteStep::Retryable("b".into())).is_none());
        let out = advance(&mut s, RemoteStep::Retryable("c".into()));
        match out {
            Some(Discovery::TimedOut { attempts, note }) => {
                assert_eq!(attempts, 3);
                assert!(note.contains("job path may be wrong"));
                assert!(note.contains("last: c"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.status, PollStatus::TimedOut);
    }

    #[test]
    fn test_timeout_note_tells_slow_queue_apart() {
        let mut s = state(2);
        advance(&mut s, RemoteStep::Retryable("boom".into()));
        let out = advance(&mut s, RemoteStep::Ready(BuildInfo::finished("4", "FAILURE")));
        match out {
            Some(Discovery::TimedOut { note, .. }) => assert!(note.contains("queue may be slow")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
