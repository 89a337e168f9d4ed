//! Waiting for a known build to finish

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::BridgeError;
use crate::jenkins::client::JenkinsApi;
use crate::jenkins::models::{BuildInfo, RemoteStep};
use crate::jenkins::url::JobUrl;
use crate::poll::{PollOptions, PollState, PollStatus};

/// Terminal completion states
#[derive(Debug)]
pub enum Completion {
    Succeeded,

    /// Finished with any result other than success
    Failed { result: Option<String> },

    /// Still running, or unreadable, when the budget ran out
    TimedOut { attempts: u32, note: String },

    /// A non-retryable answer, e.g. the build does not exist
    Aborted(BridgeError),
}

/// A finished completion wait, with whatever console output exists
#[derive(Debug)]
pub struct CompletionReport {
    pub job_id: String,
    pub completion: Completion,
    pub console: String,
}

/// Feed one build status answer into the wait.
///
/// Returns `Some` once the wait is over.
pub fn advance(state: &mut PollState, step: RemoteStep<BuildInfo>) -> Option<Completion> {
    state.spend();

    match step {
        RemoteStep::Ready(build) if !build.building => {
            return Some(if build.succeeded() {
                state.status = PollStatus::Success;
                Completion::Succeeded
            } else {
                state.status = PollStatus::Failure;
                Completion::Failed {
                    result: build.result,
                }
            });
        }
        RemoteStep::Ready(build) => {
            state.status = PollStatus::InProgress;
            state.note_answer(format!("build {} still running", build.id));
        }
        RemoteStep::Retryable(reason) => {
            warn!(
                "Status attempt {} got no usable answer: {}",
                state.attempts(),
                reason
            );
            state.note_hiccup(reason);
        }
        RemoteStep::Fatal(err) => return Some(Completion::Aborted(err)),
    }

    if state.is_exhausted() {
        state.status = PollStatus::TimedOut;
        let note = if state.answered() == 0 {
            format!(
                "build status was never readable in {} attempts (last: {})",
                state.attempts(),
                state.last_reason().unwrap_or("none")
            )
        } else {
            format!("build still running after {} attempts", state.attempts())
        };
        return Some(Completion::TimedOut {
            attempts: state.attempts(),
            note,
        });
    }
    None
}

/// Poll `{base}/{job_id}/api/json` until the build leaves the running state.
///
/// Console text is fetched on every terminal state except [`Completion::Aborted`];
/// a failed fetch leaves it empty.
pub async fn await_completion<A, S, F>(
    api: &A,
    job: &JobUrl,
    job_id: &str,
    options: &PollOptions,
    sleep_fn: S,
) -> CompletionReport
where
    A: JenkinsApi + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut state = PollState::new(options.completion_attempts, options.completion_interval);
    info!(
        "Waiting for build {} to finish (up to {} attempts)",
        job_id, state.remaining_tries
    );

    let completion = loop {
        let step = api.build_info(job, job_id).await;
        if let Some(completion) = advance(&mut state, step) {
            break completion;
        }
        sleep_fn(state.interval).await;
    };

    info!("Build {} ended as {:?}", job_id, state.status);

    let console = match &completion {
        Completion::Aborted(_) => String::new(),
        _ => match api.console_text(job, job_id).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Console text for build {} unavailable: {}", job_id, e);
                String::new()
            }
        },
    };

    CompletionReport {
        job_id: job_id.to_string(),
        completion,
        console,
    }
}
