//! Remote job server payloads

use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Subset of a build's `api/json` document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Build number, as a string in the remote API
    pub id: String,

    /// Whether the build is still running
    pub building: bool,

    /// Final result (`SUCCESS`, `FAILURE`, `ABORTED`, ...), null while running
    #[serde(default)]
    pub result: Option<String>,

    #[serde(default)]
    pub number: Option<u64>,

    #[serde(default)]
    pub url: Option<String>,
}

impl BuildInfo {
    pub fn in_progress(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            building: true,
            result: None,
            number: None,
            url: None,
        }
    }

    pub fn finished(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            building: false,
            result: Some(result.into()),
            number: None,
            url: None,
        }
    }

    /// True when the build finished with a `success` result, in any case
    pub fn succeeded(&self) -> bool {
        !self.building
            && self
                .result
                .as_deref()
                .map(|r| r.eq_ignore_ascii_case("success"))
                .unwrap_or(false)
    }
}

/// Outcome of one query against the remote job server
#[derive(Debug)]
pub enum RemoteStep<T> {
    /// A well-formed answer
    Ready(T),
    /// Transport hiccup or malformed answer; worth asking again
    Retryable(String),
    /// Asking again cannot help
    Fatal(BridgeError),
}
