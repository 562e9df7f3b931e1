#![forbid(unsafe_code)]
//! nkit-assist library.
//!
//! Turns an incoming email into a drafted reply plus follow-up tasks: the
//! email is rendered into a prompt, sent to the Messages API with retries,
//! and every task in the reply becomes a page in the task database.
//!
//! # Conventions
//!
//! - **Errors**: [`AssistError`] for everything user-facing; each variant
//!   carries its own message and an `ErrorCode`.
//! - **Logging**: `tracing` macros. Only the encoded reply goes to stdout,
//!   and that is the binary's job.

pub mod assistant;
pub mod error;
pub mod llm;
pub mod notify;
pub mod prompt;
pub mod reply;
pub mod retry;
pub mod sink;

pub use assistant::{EmailAssistant, HandledEmail, TASK_SOUND};
pub use error::AssistError;
pub use llm::{Llm, MessagesClient};
pub use notify::{LogNotifier, Notification, Notifier, OsaScriptNotifier, default_notifier};
pub use prompt::{EmailInput, PromptTemplate};
pub use reply::{AssistantReply, ParsedReply, TaskItem};
pub use retry::{CallError, RetryError, RetryPolicy, execute_with_retry};
pub use sink::PageSink;
