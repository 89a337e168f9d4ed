//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::logs::LogOptions;
use crate::poll::PollOptions;
use crate::sanitize::ShortKeyPolicy;

/// Main application options.
///
/// Built once at startup and shared read-only with every handler.
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Remote job server configuration
    pub jenkins: JenkinsOptions,

    /// Polling budgets
    pub poll: PollOptions,

    /// Analytics gateway configuration
    pub analytics: AnalyticsOptions,

    /// Logging configuration
    pub log: LogOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions::default(),
            jenkins: JenkinsOptions::default(),
            poll: PollOptions::default(),
            analytics: AnalyticsOptions::default(),
            log: LogOptions::default(),
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Remote job server options
#[derive(Debug, Clone)]
pub struct JenkinsOptions {
    /// Host, optionally with scheme and port
    pub server: String,

    /// Per-request timeout for outbound calls
    pub request_timeout: Duration,

    /// What to do with short credentials
    pub short_key_policy: ShortKeyPolicy,
}

impl Default for JenkinsOptions {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
            short_key_policy: ShortKeyPolicy::default(),
        }
    }
}

/// Analytics gateway options
#[derive(Debug, Default)]
pub struct AnalyticsOptions {
    pub gateway_url: Option<String>,
    pub token: Option<SecretString>,
}
