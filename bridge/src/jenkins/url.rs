//! Job URL construction and redaction
//!
//! A [`JobUrl`] carries the caller's credential in its authority component.
//! Its `Display` and `Debug` output always substitutes the credential, so a
//! `JobUrl` can be handed to any logging macro as-is.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::BridgeError;

/// Placeholder written in place of a credential
pub const REDACTION_MARKER: &str = "********";

const TERRAFORM_COMMAND: &str = "apply -auto-approve --var-file=./vars/";
const TERRAFORM_VAR_FILE: &str = "production.tfvars";

/// Remote job templates known to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    DeployContainer,
    RunTerraform,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DeployContainer => "deployContainer",
            JobType::RunTerraform => "runTerraform",
        }
    }

    /// Write this job's path and parameters onto `url`
    fn apply(&self, url: &mut Url, services: &str) -> Result<(), BridgeError> {
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BridgeError::Config("Job server URL cannot carry a path".into()))?;
            segments.pop_if_empty();
            match self {
                JobType::DeployContainer => {
                    segments.extend(["job", "DeployContainer", "buildWithParameters"]);
                }
                JobType::RunTerraform => {
                    segments.extend(["job", "terraform", "job"]);
                    segments.push(&format!("terraform_{}", services));
                    segments.push("buildWithParameters");
                }
            }
        }

        let mut query = url.query_pairs_mut();
        query.clear();
        match self {
            JobType::DeployContainer => {
                query.append_pair("services", services);
            }
            JobType::RunTerraform => {
                query.append_pair("COMMAND", TERRAFORM_COMMAND);
                query.append_pair("VAR_FILE", TERRAFORM_VAR_FILE);
            }
        }
        Ok(())
    }
}

impl FromStr for JobType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("deployContainer") {
            Ok(JobType::DeployContainer)
        } else if s.eq_ignore_ascii_case("runTerraform") {
            Ok(JobType::RunTerraform)
        } else {
            Err(BridgeError::UnknownJobType(s.to_string()))
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic-auth pair embedded in outbound job URLs
#[derive(Debug)]
pub struct Credentials {
    pub user: String,
    pub key: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key: SecretString::from(key.into()),
        }
    }
}

/// Replace every occurrence of `secret` in `text` with [`REDACTION_MARKER`]
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTION_MARKER)
}

/// Parse a configured job server into a base URL.
///
/// A bare host name gets `http://`. A path is kept as the prefix every job
/// path is appended to, for servers mounted under e.g. `/jenkins`.
pub fn parse_server(server: &str) -> Result<Url, BridgeError> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(BridgeError::Config("Job server host is empty".into()));
    }
    let candidate = if server.contains("://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    };
    let mut url = Url::parse(&candidate)
        .map_err(|e| BridgeError::Config(format!("Invalid job server {}: {}", server, e)))?;
    if url.host_str().is_none() {
        return Err(BridgeError::Config(format!("Job server {} has no host", server)));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Composes job URLs against one job server
#[derive(Debug, Clone)]
pub struct JobUrlBuilder {
    server: Url,
}

impl JobUrlBuilder {
    pub fn new(server: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            server: parse_server(server)?,
        })
    }

    /// Server root, without credentials
    pub fn root(&self) -> &Url {
        &self.server
    }

    /// Build the parameterised start URL for `job_type`
    pub fn build(
        &self,
        job_type: &str,
        services: &str,
        credentials: &Credentials,
    ) -> Result<JobUrl, BridgeError> {
        let job_type: JobType = job_type.parse()?;
        let mut url = self.with_credentials(credentials)?;
        job_type.apply(&mut url, services)?;
        Ok(JobUrl {
            url,
            secret: SecretString::from(credentials.key.expose_secret().to_string()),
        })
    }

    /// Build the plain `/job/{job}/build` URL used by the legacy trigger
    pub fn build_plain(&self, job: &str, credentials: &Credentials) -> Result<JobUrl, BridgeError> {
        let mut url = self.with_credentials(credentials)?;
        url.path_segments_mut()
            .map_err(|_| BridgeError::Config("Job server URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["job", job, "build"]);
        url.set_query(None);
        Ok(JobUrl {
            url,
            secret: SecretString::from(credentials.key.expose_secret().to_string()),
        })
    }

    fn with_credentials(&self, credentials: &Credentials) -> Result<Url, BridgeError> {
        let mut url = self.server.clone();
        url.set_username(&credentials.user)
            .and_then(|_| url.set_password(Some(credentials.key.expose_secret())))
            .map_err(|_| BridgeError::Config("Job server URL cannot carry credentials".into()))?;
        Ok(url)
    }
}

/// Fully qualified job-control URL with embedded credentials
pub struct JobUrl {
    url: Url,
    secret: SecretString,
}

impl JobUrl {
    /// The real URL, credential included. Never log this.
    pub fn expose_url(&self) -> &Url {
        &self.url
    }

    /// Job control path with the build trigger suffix and parameters removed
    pub fn base(&self) -> Url {
        let mut base = self.url.clone();
        base.set_query(None);
        let is_trigger = base
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|last| last == "buildWithParameters" || last == "build")
            .unwrap_or(false);
        if is_trigger {
            if let Ok(mut segments) = base.path_segments_mut() {
                segments.pop();
            }
        }
        base
    }

    fn under_base(&self, tail: &[&str]) -> Url {
        let mut url = self.base();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(tail);
        }
        url
    }

    /// `{base}/api/json`
    pub fn job_info_url(&self) -> Url {
        self.under_base(&["api", "json"])
    }

    /// `{base}/lastBuild/api/json`
    pub fn last_build_url(&self) -> Url {
        self.under_base(&["lastBuild", "api", "json"])
    }

    /// `{base}/{job_id}/api/json`
    pub fn build_info_url(&self, job_id: &str) -> Url {
        self.under_base(&[job_id, "api", "json"])
    }

    /// `{base}/{job_id}/consoleText`
    pub fn console_url(&self, job_id: &str) -> Url {
        self.under_base(&[job_id, "consoleText"])
    }

    /// Redact the credential from arbitrary text, e.g. a transport error
    pub fn redact(&self, text: &str) -> String {
        let text = match self.url.password() {
            Some(encoded) if encoded != self.secret.expose_secret() => {
                redact(text, encoded)
            }
            _ => text.to_string(),
        };
        redact(&text, self.secret.expose_secret())
    }

    /// Any URL derived from this one, with the credential redacted
    pub fn display_url(&self, url: &Url) -> String {
        let mut shown = url.clone();
        if shown.password().is_some() {
            let _ = shown.set_password(Some(REDACTION_MARKER));
        }
        self.redact(shown.as_str())
    }
}

impl fmt::Display for JobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_url(&self.url))
    }
}

impl fmt::Debug for JobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JobUrl").field(&self.to_string()).finish()
    }
}
