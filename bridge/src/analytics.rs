//! Analytics gateway forwarder

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::errors::BridgeError;
use crate::utils::version_info;

/// Event name sent on every forward
pub const ANALYTICS_EVENT: &str = "jobbridge.analytics";

/// Fixed event posted to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn now() -> Self {
        Self {
            event: ANALYTICS_EVENT.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: version_info().version,
            timestamp: Utc::now(),
        }
    }
}

/// Posts [`AnalyticsEvent`]s to the configured gateway with a bearer token
pub struct AnalyticsForwarder {
    client: Client,
    gateway_url: Option<String>,
    token: Option<SecretString>,
}

impl AnalyticsForwarder {
    pub fn new(
        gateway_url: Option<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            gateway_url,
            token,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.gateway_url.is_some() && self.token.is_some()
    }

    /// Forward one event; returns the gateway's response text
    pub async fn forward(&self) -> Result<String, BridgeError> {
        let (url, token) = match (&self.gateway_url, &self.token) {
            (Some(url), Some(token)) => (url, token),
            _ => {
                return Err(BridgeError::Config(
                    "Analytics gateway URL or token is not set".to_string(),
                ))
            }
        };

        let event = AnalyticsEvent::now();
        debug!("POST {} ({})", url, event.event);

        let response = self
            .client
            .post(url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            )
            .json(&event)
            .send()
            .await
            .map_err(|e| BridgeError::Http(e.without_url()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Analytics gateway answered {}", status);
            return Err(BridgeError::RemoteRejected {
                status: status.as_u16(),
                message: "analytics gateway refused the event".to_string(),
            });
        }

        info!("Analytics event forwarded ({})", status);
        Ok(body)
    }
}
