use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssistError;

/// A follow-up task extracted from the email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TaskItem {
    /// Page body: `Due date: {due}\n\n{note}` when either is set, else empty.
    #[must_use]
    pub fn body(&self) -> String {
        let due = self.due_date.as_deref().unwrap_or_default();
        let note = self.note.as_deref().unwrap_or_default();
        if due.is_empty() && note.is_empty() {
            String::new()
        } else {
            format!("Due date: {due}\n\n{note}")
        }
    }
}

/// The model's structured answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub email_draft: String,
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
}

/// A parsed reply together with the exact JSON it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub reply: AssistantReply,
    pub raw: Value,
}

impl ParsedReply {
    /// Parse the model's text. A surrounding markdown code fence is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::InvalidReply`] when the text is not a JSON
    /// object of the expected shape.
    pub fn parse(text: &str) -> Result<Self, AssistError> {
        let json = strip_code_fence(text);
        let raw: Value =
            serde_json::from_str(json).map_err(|err| AssistError::InvalidReply(err.to_string()))?;
        let reply = AssistantReply::deserialize(&raw)
            .map_err(|err| AssistError::InvalidReply(err.to_string()))?;
        Ok(Self { reply, raw })
    }

    /// Base64 of the reply JSON, non-ASCII kept as UTF-8.
    #[must_use]
    pub fn encoded(&self) -> String {
        STANDARD.encode(self.raw.to_string())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
