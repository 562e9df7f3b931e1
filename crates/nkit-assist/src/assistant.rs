//! The email-to-reply-and-tasks flow.

use tracing::{info, instrument, warn};

use crate::error::AssistError;
use crate::llm::Llm;
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::prompt::{EmailInput, PromptTemplate};
use crate::reply::{AssistantReply, ParsedReply};
use crate::sink::PageSink;

/// Sound played for task notifications.
pub const TASK_SOUND: &str = "Ping";

/// Result of handling one email.
#[derive(Debug, Clone, PartialEq)]
pub struct HandledEmail {
    pub reply: AssistantReply,
    /// Base64 of the reply JSON, ready for the calling script.
    pub encoded: String,
    /// URLs of the task pages that were created.
    pub created: Vec<String>,
    /// Tasks whose page could not be created, with the reason.
    pub failed: Vec<(String, String)>,
}

struct TaskTarget<P> {
    sink: P,
    database_id: String,
}

pub struct EmailAssistant<L, P> {
    llm: L,
    prompt: PromptTemplate,
    signature: String,
    tasks: Option<TaskTarget<P>>,
    notifier: Box<dyn Notifier>,
}

impl<L: Llm, P: PageSink> EmailAssistant<L, P> {
    pub fn new(llm: L, prompt: PromptTemplate, signature: impl Into<String>) -> Self {
        Self {
            llm,
            prompt,
            signature: signature.into(),
            tasks: None,
            notifier: Box::new(LogNotifier),
        }
    }

    /// Create a page in `database_id` for every extracted task.
    #[must_use]
    pub fn with_tasks(mut self, sink: P, database_id: impl Into<String>) -> Self {
        self.tasks = Some(TaskTarget {
            sink,
            database_id: database_id.into(),
        });
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Draft a reply for `input` and file its tasks.
    ///
    /// A task page that cannot be created is logged and listed in
    /// [`HandledEmail::failed`]; the reply is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error when the model call fails or its reply is not valid
    /// JSON.
    #[instrument(skip_all, fields(subject = %input.clean_subject))]
    pub fn handle(&self, input: &EmailInput) -> Result<HandledEmail, AssistError> {
        let prompt = self.prompt.render(input, &self.signature);
        let text = self.llm.complete(&prompt)?;
        let parsed = ParsedReply::parse(&text)?;
        info!(
            tasks = parsed.reply.tasks.len(),
            has_draft = !parsed.reply.email_draft.is_empty(),
            "assistant replied"
        );

        let mut created = Vec::new();
        let mut failed = Vec::new();
        for (i, task) in parsed.reply.tasks.iter().enumerate() {
            let body = task.body();
            if let Some(target) = &self.tasks {
                match target
                    .sink
                    .create_page(&target.database_id, &task.title, &body)
                {
                    Ok(url) => {
                        info!(title = %task.title, url = %url, "created task page");
                        created.push(url);
                    }
                    Err(source) => {
                        let err = AssistError::TaskPage {
                            title: task.title.clone(),
                            source,
                        };
                        warn!(error = %err, "task page not created");
                        failed.push((task.title.clone(), err.to_string()));
                        continue;
                    }
                }
            }
            let notification = Notification::new(format!("Task {}: {}", i + 1, task.title), body)
                .with_sound(TASK_SOUND);
            self.notifier.notify(&notification);
        }

        Ok(HandledEmail {
            encoded: parsed.encoded(),
            reply: parsed.reply,
            created,
            failed,
        })
    }
}
