//! Error types for inbox triage.

/// Top-level error type for whole-run callers such as the binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Provider-level mailbox failures, shared by every `Mailbox` implementation.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox connection failed: {0}")]
    Connection(String),

    #[error("Mailbox authentication failed: {0}")]
    Auth(String),

    #[error("Mailbox entity not found: {0}")]
    NotFound(String),

    #[error("Mailbox API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse mailbox response: {0}")]
    Parse(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}

/// Candidate selection failed. Fatal to the run that hit it.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Candidate search failed: {0}")]
    Search(#[from] MailboxError),
}

/// Generation-service call or verdict parsing failed for one message.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Generation response has no candidate text")]
    MissingText,

    #[error("Invalid verdict ({reason}): {raw}")]
    InvalidVerdict { reason: String, raw: String },
}

/// Label lookup, creation or attach failed for one thread.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Failed to look up label {label}: {source}")]
    Lookup {
        label: String,
        #[source]
        source: MailboxError,
    },

    #[error("Failed to create label {label}: {source}")]
    Create {
        label: String,
        #[source]
        source: MailboxError,
    },

    #[error("Failed to attach label {label} to thread {thread_id}: {source}")]
    Attach {
        label: String,
        thread_id: String,
        #[source]
        source: MailboxError,
    },
}

/// Any failure scoped to a single candidate. Caught at the batch boundary.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Failed to fetch message: {0}")]
    Fetch(#[source] MailboxError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error("Item processing panicked: {0}")]
    Panicked(String),
}

/// Result type alias for inbox triage.
pub type Result<T> = std::result::Result<T, Error>;
