//! Email input and the prompt rendered from it.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::AssistError;

/// The JSON document handed over by the mail client.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailInput {
    pub api_key: String,
    pub clean_instructions: String,
    pub clean_sender: String,
    pub clean_subject: String,
    pub email_snippet: String,
}

impl fmt::Debug for EmailInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailInput")
            .field("clean_sender", &self.clean_sender)
            .field("clean_subject", &self.clean_subject)
            .finish_non_exhaustive()
    }
}

impl EmailInput {
    /// Parse the input document.
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::MissingField`] when a required key is absent and
    /// [`AssistError::InvalidInput`] for any other malformed input.
    pub fn from_json(raw: &str) -> Result<Self, AssistError> {
        serde_json::from_str(raw).map_err(|err| {
            let message = err.to_string();
            if message.starts_with("missing field") {
                AssistError::MissingField(message)
            } else {
                AssistError::InvalidInput(message)
            }
        })
    }

    /// Read and parse an input file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AssistError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AssistError::InputRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// Built-in prompt. Placeholders are `{cleanInstructions}`, `{cleanSender}`,
/// `{cleanSubject}`, `{emailSnippet}` and `{signature}`.
pub const DEFAULT_PROMPT: &str = r#"You are an email assistant. Draft a concise, context-aware reply to the email
below and identify any actionable tasks it contains.

Return ONLY a JSON object with exactly these fields:
1. "email_draft": the reply text, or an empty string if no reply is needed
2. "tasks": an array of task objects, empty if there are none

Each task object has:
- "title": short imperative title
- "due_date": "YYYY-MM-DD", or an empty string when no date is implied
- "note": anything that helps complete the task, or an empty string

Example:
{
  "email_draft": "Hi Anna,\n\nThursday at 14:00 works for me.\n\nBest,\n{signature}",
  "tasks": [
    {"title": "Prepare slides for Thursday", "due_date": "2025-09-18", "note": ""}
  ]
}

Rules:
- Reply in the language of the original email.
- Keep replies short: two to five sentences unless more is clearly needed.
- Convert relative dates ("next Monday") to YYYY-MM-DD.
- Use 24-hour times.
- Sign the reply as {signature}.

INSTRUCTIONS: "{cleanInstructions}"

ORIGINAL EMAIL:
From: "{cleanSender}"
Subject: "{cleanSubject}"
Content: "{emailSnippet}"
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Template from `path`, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::PromptRead`] if `path` cannot be read.
    pub fn load(path: Option<&Path>) -> Result<Self, AssistError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| AssistError::PromptRead {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(text))
    }

    /// Substitute every placeholder. Input values are inserted verbatim.
    #[must_use]
    pub fn render(&self, input: &EmailInput, signature: &str) -> String {
        // Signature first: an email quoting `{signature}` keeps it literally.
        self.text
            .replace("{signature}", signature)
            .replace("{cleanInstructions}", &input.clean_instructions)
            .replace("{cleanSender}", &input.clean_sender)
            .replace("{cleanSubject}", &input.clean_subject)
            .replace("{emailSnippet}", &input.email_snippet)
    }
}
