//! Caller input cleansing
//!
//! Every string that reaches a job URL is passed through here first. Path
//! separators are removed so a value can never extend or redirect the remote
//! job path, and short credentials are flagged for the caller to act on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Expected length of a real remote API token.
pub const MIN_KEY_LEN: usize = 34;

/// Placeholder forwarded instead of a known-bad key under [`ShortKeyPolicy::Substitute`].
pub const INVALID_KEY_SENTINEL: &str = "Invalid_Key";

/// Field holding the caller's credential.
pub const AUTH_KEY_FIELD: &str = "auth_key";

const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

/// What to do with a credential shorter than [`MIN_KEY_LEN`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortKeyPolicy {
    /// Log a warning and forward the key as-is
    Warn,
    /// Log a warning and forward [`INVALID_KEY_SENTINEL`] instead
    Substitute,
    /// Log a warning and refuse the request with a 400
    #[default]
    Reject,
}

impl std::str::FromStr for ShortKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(ShortKeyPolicy::Warn),
            "substitute" => Ok(ShortKeyPolicy::Substitute),
            "reject" => Ok(ShortKeyPolicy::Reject),
            _ => Err(format!("Invalid short key policy: {}", s)),
        }
    }
}

/// Signals raised while cleansing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeWarning {
    /// The credential is shorter than [`MIN_KEY_LEN`] after cleansing
    ShortKey { len: usize },
}

/// Cleansed fields together with any raised signals
#[derive(Debug, Clone, Default)]
pub struct Sanitized {
    pub fields: Map<String, Value>,
    pub warnings: Vec<SanitizeWarning>,
}

impl Sanitized {
    pub fn has_short_key(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, SanitizeWarning::ShortKey { .. }))
    }
}

/// Strip path separators and surrounding whitespace from a single value
pub fn sanitize_str(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !PATH_SEPARATORS.contains(c))
        .collect();
    stripped.trim().to_string()
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(sanitize_str(&s)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Cleanse every field of a request body.
///
/// Never fails. A short `auth_key` is reported through
/// [`Sanitized::warnings`] and, under [`ShortKeyPolicy::Substitute`], replaced
/// with [`INVALID_KEY_SENTINEL`].
pub fn sanitize_fields(fields: Map<String, Value>, policy: ShortKeyPolicy) -> Sanitized {
    let mut fields: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| (name, sanitize_value(value)))
        .collect();

    let mut warnings = Vec::new();
    let short_len = match fields.get(AUTH_KEY_FIELD) {
        Some(Value::String(key)) if key.chars().count() < MIN_KEY_LEN => Some(key.chars().count()),
        _ => None,
    };

    if let Some(len) = short_len {
        warn!(
            "Credential is {} characters, expected at least {} (policy: {:?})",
            len, MIN_KEY_LEN, policy
        );
        warnings.push(SanitizeWarning::ShortKey { len });
        if policy == ShortKeyPolicy::Substitute {
            fields.insert(
                AUTH_KEY_FIELD.to_string(),
                Value::String(INVALID_KEY_SENTINEL.to_string()),
            );
        }
    }

    Sanitized { fields, warnings }
}
