//! Messages API client.

use std::fmt;
use std::thread;
use std::time::Duration;

use nkit_core::config::AssistantConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::AssistError;
use crate::retry::{CallError, RetryPolicy, execute_with_retry};

/// A text-in, text-out language model.
pub trait Llm {
    /// Send one user message and return the first text block of the reply.
    ///
    /// # Errors
    ///
    /// Returns the mapped API or transport failure once retries are spent.
    fn complete(&self, prompt: &str) -> Result<String, AssistError>;
}

impl<T: Llm + ?Sized> Llm for &T {
    fn complete(&self, prompt: &str) -> Result<String, AssistError> {
        (**self).complete(prompt)
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Clone)]
pub struct MessagesClient {
    agent: ureq::Agent,
    url: String,
    api_key: String,
    api_version: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    policy: RetryPolicy,
}

impl fmt::Debug for MessagesClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagesClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl MessagesClient {
    pub fn new(api_key: impl Into<String>, config: &AssistantConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("nkit/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            url: config.api_url.clone(),
            api_key: api_key.into(),
            api_version: config.api_version.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            policy: RetryPolicy {
                max_retries: config.max_retries,
            },
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        })
    }

    fn send_once(&self, body: &Value) -> Result<String, CallError> {
        let response = self
            .agent
            .post(&self.url)
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", &self.api_version)
            .set("content-type", "application/json")
            .send_json(body)
            .map_err(call_error)?;
        response
            .into_string()
            .map_err(|err| CallError::Connect(format!("failed to read response body: {err}")))
    }
}

fn call_error(err: ureq::Error) -> CallError {
    match err {
        ureq::Error::Status(status, response) => CallError::Status {
            status,
            retry_after: response.header("retry-after").map(str::to_string),
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            if message.contains("timed out") {
                CallError::Timeout(message)
            } else {
                CallError::Connect(message)
            }
        }
    }
}

impl Llm for MessagesClient {
    fn complete(&self, prompt: &str) -> Result<String, AssistError> {
        let body = self.request_body(prompt);
        info!(model = %self.model, "requesting email draft");

        let raw = execute_with_retry(
            &self.policy,
            |attempt| {
                debug!(attempt, "messages request");
                self.send_once(&body)
            },
            thread::sleep,
        )?;
        let response: MessagesResponse =
            serde_json::from_str(&raw).map_err(|err| AssistError::InvalidReply(err.to_string()))?;

        response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| AssistError::InvalidReply("reply has no text content".to_string()))
    }
}
