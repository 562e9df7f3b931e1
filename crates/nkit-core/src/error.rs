use std::fmt;

/// Machine-readable error codes for script-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingToken,
    CategoryFileInvalid,
    DatabaseNotFound,
    ColumnTypeMismatch,
    RemoteRejected,
    RemoteUnreachable,
    RemoteProtocol,
    CacheUnreadable,
    AssistantRejected,
    AssistantReplyInvalid,
    EmailInputInvalid,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingToken => "E1002",
            Self::CategoryFileInvalid => "E1003",
            Self::DatabaseNotFound => "E2001",
            Self::ColumnTypeMismatch => "E2002",
            Self::RemoteRejected => "E3001",
            Self::RemoteUnreachable => "E3002",
            Self::RemoteProtocol => "E3003",
            Self::CacheUnreadable => "E4001",
            Self::AssistantRejected => "E5001",
            Self::AssistantReplyInvalid => "E5002",
            Self::EmailInputInvalid => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingToken => "Notion token not found",
            Self::CategoryFileInvalid => "Category file is invalid",
            Self::DatabaseNotFound => "Database not found or not shared",
            Self::ColumnTypeMismatch => "Tag column is not a multi-select",
            Self::RemoteRejected => "Notion rejected the request",
            Self::RemoteUnreachable => "Notion is unreachable",
            Self::RemoteProtocol => "Unexpected Notion response",
            Self::CacheUnreadable => "Database cache unreadable",
            Self::AssistantRejected => "Assistant API rejected the request",
            Self::AssistantReplyInvalid => "Assistant reply is not valid JSON",
            Self::EmailInputInvalid => "Email input is invalid",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and scripts.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ~/.config/nkit/config.toml and retry."),
            Self::MissingToken => {
                Some("Pass --token or set NOTION_TOKEN (create one at notion.so/my-integrations).")
            }
            Self::CategoryFileInvalid => {
                Some("Use a YAML mapping of category name to a list of member identifiers.")
            }
            Self::DatabaseNotFound => {
                Some("Check the database ID and share the database with your integration.")
            }
            Self::ColumnTypeMismatch => Some("Pick a multi-select column with --column."),
            Self::RemoteRejected => None,
            Self::RemoteUnreachable => Some("Check your network connection and retry."),
            Self::RemoteProtocol => Some("Retry once. If persistent, report a bug with logs."),
            Self::CacheUnreadable => Some("The cache is rebuilt automatically on the next search."),
            Self::AssistantRejected => Some("Check the API key and retry later."),
            Self::AssistantReplyInvalid => Some("Retry; the model occasionally wraps its reply."),
            Self::EmailInputInvalid => {
                Some("Provide apiKey, cleanInstructions, cleanSender, cleanSubject and emailSnippet.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a single call against the remote database service.
///
/// Non-success statuses keep the body text verbatim so callers can surface
/// exactly what the service said.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Status { status: 404, .. } => ErrorCode::DatabaseNotFound,
            Self::Status { .. } => ErrorCode::RemoteRejected,
            Self::Transport(_) => ErrorCode::RemoteUnreachable,
            Self::Decode(_) | Self::Protocol(_) => ErrorCode::RemoteProtocol,
        }
    }

    /// HTTP status when the service answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => Self::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, RemoteError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::MissingToken,
            ErrorCode::CategoryFileInvalid,
            ErrorCode::DatabaseNotFound,
            ErrorCode::ColumnTypeMismatch,
            ErrorCode::RemoteRejected,
            ErrorCode::RemoteUnreachable,
            ErrorCode::RemoteProtocol,
            ErrorCode::CacheUnreadable,
            ErrorCode::AssistantRejected,
            ErrorCode::AssistantReplyInvalid,
            ErrorCode::EmailInputInvalid,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::ColumnTypeMismatch.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn status_error_keeps_body_verbatim() {
        let err = RemoteError::Status {
            status: 400,
            body: r#"{"object":"error","code":"validation_error"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"HTTP 400: {"object":"error","code":"validation_error"}"#
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.code(), ErrorCode::RemoteRejected);
    }

    #[test]
    fn not_found_maps_to_database_code() {
        let err = RemoteError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.code(), ErrorCode::DatabaseNotFound);
        assert_eq!(RemoteError::Transport("dns".into()).status(), None);
    }
}
