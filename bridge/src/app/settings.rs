//! Settings loading
//!
//! Defaults, then an optional JSON settings file, then environment variables,
//! then `--key=value` command-line overrides.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::options::{
    AnalyticsOptions, AppOptions, JenkinsOptions, LifecycleOptions, ServerOptions,
};
use crate::errors::BridgeError;
use crate::jenkins::url::REDACTION_MARKER;
use crate::logs::{LogLevel, LogOptions};
use crate::poll::PollOptions;
use crate::sanitize::ShortKeyPolicy;

pub const ENV_JENKINS_SERVER: &str = "JENKINS_SERVER";
pub const ENV_ANALYTICS_GATEWAY_URL: &str = "ANALYTICS_GATEWAY_URL";
pub const ENV_ANALYTICS_GATEWAY_TOKEN: &str = "ANALYTICS_GATEWAY_TOKEN";
pub const ENV_HOST: &str = "BRIDGE_HOST";
pub const ENV_PORT: &str = "BRIDGE_PORT";
pub const ENV_LOG_LEVEL: &str = "BRIDGE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BRIDGE_LOG_DIR";
pub const ENV_SHORT_KEY_POLICY: &str = "BRIDGE_SHORT_KEY_POLICY";

/// Bridge settings
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Remote job server host
    #[serde(default)]
    pub jenkins_server: Option<String>,

    /// Analytics gateway endpoint
    #[serde(default)]
    pub analytics_gateway_url: Option<String>,

    /// Analytics gateway bearer token
    #[serde(default, skip_serializing)]
    pub analytics_gateway_token: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerSettings,

    /// Handling of credentials shorter than expected
    #[serde(default)]
    pub short_key_policy: ShortKeyPolicy,

    /// Poll budgets
    #[serde(default)]
    pub polling: PollingSettings,

    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("jenkins_server", &self.jenkins_server)
            .field("analytics_gateway_url", &self.analytics_gateway_url)
            .field(
                "analytics_gateway_token",
                &self.analytics_gateway_token.as_ref().map(|_| REDACTION_MARKER),
            )
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("log_dir", &self.log_dir)
            .field("server", &self.server)
            .field("short_key_policy", &self.short_key_policy)
            .field("polling", &self.polling)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jenkins_server: None,
            analytics_gateway_url: None,
            analytics_gateway_token: None,
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            short_key_policy: ShortKeyPolicy::default(),
            polling: PollingSettings::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Poll budget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_discovery_attempts")]
    pub discovery_attempts: u32,

    #[serde(default = "default_discovery_interval")]
    pub discovery_interval_secs: u64,

    #[serde(default = "default_completion_attempts")]
    pub completion_attempts: u32,

    #[serde(default = "default_completion_interval")]
    pub completion_interval_secs: u64,
}

fn default_discovery_attempts() -> u32 {
    30
}

fn default_discovery_interval() -> u64 {
    1
}

fn default_completion_attempts() -> u32 {
    120
}

fn default_completion_interval() -> u64 {
    5
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            discovery_attempts: default_discovery_attempts(),
            discovery_interval_secs: default_discovery_interval(),
            completion_attempts: default_completion_attempts(),
            completion_interval_secs: default_completion_interval(),
        }
    }
}

impl Settings {
    /// Load from all sources, the settings file being optional
    pub async fn load(
        file: Option<&Path>,
        cli_args: &HashMap<String, String>,
    ) -> Result<Self, BridgeError> {
        let mut settings = match file {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.apply_cli(cli_args)?;
        Ok(settings)
    }

    /// Read a JSON settings file
    pub async fn from_file(path: &Path) -> Result<Self, BridgeError> {
        debug!("Reading settings from {}", path.display());
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            BridgeError::Config(format!("Unable to read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Override from environment variables, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(server) = get(ENV_JENKINS_SERVER) {
            self.jenkins_server = Some(server);
        }
        if let Some(url) = get(ENV_ANALYTICS_GATEWAY_URL) {
            self.analytics_gateway_url = Some(url);
        }
        if let Some(token) = get(ENV_ANALYTICS_GATEWAY_TOKEN) {
            self.analytics_gateway_token = Some(token);
        }
        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = parse_port(&port)?;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level.parse().map_err(BridgeError::Config)?;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = get(ENV_SHORT_KEY_POLICY) {
            self.short_key_policy = policy.parse().map_err(BridgeError::Config)?;
        }
        Ok(())
    }

    /// Override from `--key=value` arguments
    pub fn apply_cli(&mut self, cli_args: &HashMap<String, String>) -> Result<(), BridgeError> {
        for (key, value) in cli_args {
            match key.as_str() {
                "jenkins-server" => self.jenkins_server = Some(value.clone()),
                "host" => self.server.host = value.clone(),
                "port" => self.server.port = parse_port(value)?,
                "log-level" => {
                    self.log_level = value.parse().map_err(BridgeError::Config)?;
                }
                "log-json" => self.log_json = value == "true",
                "log-dir" => self.log_dir = Some(PathBuf::from(value)),
                "short-key-policy" => {
                    self.short_key_policy = value.parse().map_err(BridgeError::Config)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate and convert into immutable options
    pub fn into_options(self) -> Result<AppOptions, BridgeError> {
        let server = self
            .jenkins_server
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::Config(format!(
                    "Job server host is not set, provide {} or --jenkins-server",
                    ENV_JENKINS_SERVER
                ))
            })?;

        Ok(AppOptions {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: self.server.host,
                port: self.server.port,
            },
            jenkins: JenkinsOptions {
                server,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                short_key_policy: self.short_key_policy,
            },
            poll: PollOptions {
                discovery_attempts: self.polling.discovery_attempts,
                discovery_interval: Duration::from_secs(self.polling.discovery_interval_secs),
                completion_attempts: self.polling.completion_attempts,
                completion_interval: Duration::from_secs(self.polling.completion_interval_secs),
            },
            analytics: AnalyticsOptions {
                gateway_url: self.analytics_gateway_url,
                token: self.analytics_gateway_token.map(SecretString::from),
            },
            log: LogOptions {
                log_level: self.log_level,
                stdout: true,
                log_dir: self.log_dir,
                json_format: self.log_json,
            },
        })
    }
}

fn parse_port(value: &str) -> Result<u16, BridgeError> {
    value
        .trim()
        .parse()
        .map_err(|_| BridgeError::Config(format!("Invalid port: {}", value)))
}
