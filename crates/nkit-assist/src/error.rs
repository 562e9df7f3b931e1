use nkit_core::error::{ErrorCode, RemoteError};

use crate::retry::{CallError, RetryError};

/// Everything that can stop an email from being handled.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("failed to read email input {path}: {source}")]
    InputRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required field in input: {0}")]
    MissingField(String),

    #[error("Invalid email input: {0}")]
    InvalidInput(String),

    #[error("failed to read prompt template {path}: {source}")]
    PromptRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Service temporarily unavailable. Please try again later.")]
    Unavailable,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unable to connect to the assistant API. Check your internet connection.")]
    Connect(String),

    #[error("Request timed out. Please try again.")]
    Timeout(String),

    #[error("Invalid JSON in response: {0}")]
    InvalidReply(String),

    #[error("failed to create task page '{title}': {source}")]
    TaskPage { title: String, source: RemoteError },
}

impl AssistError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InputRead { .. } | Self::MissingField(_) | Self::InvalidInput(_) => {
                ErrorCode::EmailInputInvalid
            }
            Self::PromptRead { .. } => ErrorCode::ConfigParseError,
            Self::InvalidApiKey | Self::RateLimited | Self::Unavailable | Self::Http { .. } => {
                ErrorCode::AssistantRejected
            }
            Self::Connect(_) | Self::Timeout(_) => ErrorCode::RemoteUnreachable,
            Self::InvalidReply(_) => ErrorCode::AssistantReplyInvalid,
            Self::TaskPage { source, .. } => source.code(),
        }
    }
}

impl From<CallError> for AssistError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Status { status: 401, .. } => Self::InvalidApiKey,
            CallError::Status { status: 429, .. } => Self::RateLimited,
            CallError::Status { status: 529, .. } => Self::Unavailable,
            CallError::Status { status, body, .. } => Self::Http { status, body },
            CallError::Timeout(detail) => Self::Timeout(detail),
            CallError::Connect(detail) => Self::Connect(detail),
        }
    }
}

impl From<RetryError> for AssistError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Permanent(last) | RetryError::Exhausted { last, .. } => last.into(),
        }
    }
}
