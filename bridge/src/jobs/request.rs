//! Caller request validation

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::errors::BridgeError;
use crate::jenkins::url::{Credentials, JobType};
use crate::sanitize::{Sanitized, ShortKeyPolicy, MIN_KEY_LEN};

const REQUIRED_FIELDS: [&str; 4] = ["auth_usr", "auth_key", "services", "job_type"];

/// A validated trigger or status request
#[derive(Debug)]
pub struct TriggerRequest {
    pub auth_usr: String,
    pub auth_key: SecretString,
    pub services: String,
    pub job_type: JobType,
    pub job_id: Option<String>,
}

impl TriggerRequest {
    /// Validate sanitized fields.
    ///
    /// Missing fields are reported together, by name. `job_id` is required
    /// only when `require_job_id` is set.
    pub fn from_fields(
        sanitized: &Sanitized,
        policy: ShortKeyPolicy,
        require_job_id: bool,
    ) -> Result<Self, BridgeError> {
        let fields = &sanitized.fields;

        let mut missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|name| text_field(fields.get(*name)).is_none())
            .collect();
        if require_job_id && text_field(fields.get("job_id")).is_none() {
            missing.push("job_id");
        }
        if !missing.is_empty() {
            return Err(BridgeError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        if policy == ShortKeyPolicy::Reject && sanitized.has_short_key() {
            return Err(BridgeError::InvalidCredential(format!(
                "auth_key must be at least {} characters",
                MIN_KEY_LEN
            )));
        }

        let field = |name: &str| text_field(fields.get(name)).unwrap_or_default();
        let job_type: JobType = field("job_type").parse()?;

        Ok(Self {
            auth_usr: field("auth_usr"),
            auth_key: SecretString::from(field("auth_key")),
            services: field("services"),
            job_type,
            job_id: text_field(fields.get("job_id")),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.auth_usr.clone(), self.auth_key.expose_secret().to_string())
    }
}

/// Text content of a field; lists are joined with commas, numbers stringified.
/// Empty values count as missing.
fn text_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(","),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
