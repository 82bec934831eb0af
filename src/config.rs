//! Configuration types.
//!
//! Every component receives its configuration at construction time. Nothing
//! reads process-wide state after `main` has built these structs.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default generateContent endpoint for the generation service.
pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Default Gmail REST base for the authenticated user.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Default number of candidates pulled per run.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// The three label names the pipeline works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNames {
    /// Candidates must carry this label to be selected.
    pub inclusion: String,
    /// Terminal marker. Threads carrying it are never selected again.
    pub processed: String,
    /// Actionable marker for messages that need a reply.
    pub to_respond: String,
}

impl Default for LabelNames {
    fn default() -> Self {
        Self {
            inclusion: "Triage".to_string(),
            processed: "Processed".to_string(),
            to_respond: "ToRespond".to_string(),
        }
    }
}

/// Generation-service client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Full generateContent URL; the key is appended as `?key=`.
    pub endpoint: String,
    pub api_key: SecretString,
}

/// Gmail REST configuration.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub api_base: String,
    /// OAuth bearer token. Acquiring and refreshing it happens elsewhere.
    pub access_token: SecretString,
}

impl GmailConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_token = lookup("GMAIL_ACCESS_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GMAIL_ACCESS_TOKEN".into()))?;

        Ok(Self {
            api_base: lookup("GMAIL_API_BASE")
                .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string()),
            access_token: SecretString::from(access_token),
        })
    }
}

/// Triage run configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub gemini: GeminiConfig,
    pub labels: LabelNames,
    /// Maximum candidates per run.
    pub batch_size: usize,
    /// When set, runs repeat on this interval instead of once.
    pub interval: Option<Duration>,
}

impl TriageConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;

        let endpoint =
            lookup("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());

        let defaults = LabelNames::default();
        let labels = LabelNames {
            inclusion: lookup("TRIAGE_INCLUSION_LABEL").unwrap_or(defaults.inclusion),
            processed: lookup("TRIAGE_PROCESSED_LABEL").unwrap_or(defaults.processed),
            to_respond: lookup("TRIAGE_RESPOND_LABEL").unwrap_or(defaults.to_respond),
        };

        let batch_size = match lookup("TRIAGE_BATCH_SIZE") {
            Some(raw) => {
                let value = parse_positive("TRIAGE_BATCH_SIZE", &raw)?;
                usize::try_from(value).map_err(|e| ConfigError::InvalidValue {
                    key: "TRIAGE_BATCH_SIZE".into(),
                    message: format!("{value} does not fit this platform: {e}"),
                })?
            }
            None => DEFAULT_BATCH_SIZE,
        };

        let interval = lookup("TRIAGE_INTERVAL_SECS")
            .map(|raw| parse_positive("TRIAGE_INTERVAL_SECS", &raw).map(Duration::from_secs))
            .transpose()?;

        Ok(Self {
            gemini: GeminiConfig {
                endpoint,
                api_key: SecretString::from(api_key),
            },
            labels,
            batch_size,
            interval,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?} is not a number: {e}"),
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1".into(),
        });
    }
    Ok(value)
}
