//! `nk email`: draft a reply to an email and file its follow-up tasks.
//!
//! In text and pretty mode stdout carries exactly one line, the reply JSON
//! encoded as base64, so a calling script can decode it without parsing
//! anything else.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use nkit_assist::{
    AssistError, AssistantReply, EmailAssistant, EmailInput, HandledEmail, MessagesClient,
    PromptTemplate, default_notifier,
};
use nkit_core::config::Config;
use nkit_core::notion::NotionClient;
use serde::Serialize;
use tracing::{info, warn};

use crate::output::{CliError, OutputMode, render, render_error};
use crate::token;

#[derive(Args, Debug)]
#[command(
    about = "Draft a reply and create tasks from an email",
    long_about = "Read an email description (JSON with apiKey, cleanInstructions, cleanSender, \
                  cleanSubject and emailSnippet), ask the model for a reply draft and a task list, \
                  create a page per task and print the reply as base64.",
    after_help = "EXAMPLES:\n    # Called from a mail rule\n    nk email /tmp/email.json\n\n\
                  # Draft only, no task pages\n    nk email /tmp/email.json --no-tasks"
)]
pub struct EmailArgs {
    /// Email description file.
    pub input: PathBuf,

    /// Task database; defaults to `[todo] database_id` in the config.
    #[arg(long)]
    pub task_database_id: Option<String>,

    /// Do not create task pages.
    #[arg(long)]
    pub no_tasks: bool,

    /// Do not show desktop notifications.
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Debug, Serialize)]
struct EmailOutput<'a> {
    reply: &'a AssistantReply,
    encoded: &'a str,
    created: &'a [String],
    failed: Vec<FailedTask<'a>>,
}

#[derive(Debug, Serialize)]
struct FailedTask<'a> {
    title: &'a str,
    error: &'a str,
}

fn assist_error(err: &AssistError) -> CliError {
    CliError::coded(err.code(), err.to_string())
}

/// Execute `nk email <input>`.
///
/// # Errors
///
/// Returns an error if the input is invalid, the model call fails, or its
/// reply is not valid JSON.
pub fn run_email(
    args: &EmailArgs,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let handled = match handle(args, config, token_flag) {
        Ok(handled) => handled,
        Err(err) => {
            render_error(output, &assist_error(&err))?;
            anyhow::bail!("{err}");
        }
    };

    for (title, error) in &handled.failed {
        warn!(task = %title, error = %error, "task page not created");
    }

    let view = EmailOutput {
        reply: &handled.reply,
        encoded: &handled.encoded,
        created: &handled.created,
        failed: handled
            .failed
            .iter()
            .map(|(title, error)| FailedTask { title, error })
            .collect(),
    };
    render(output, &view, |v, w| writeln!(w, "{}", v.encoded))?;
    io::stdout().flush()?;
    Ok(())
}

fn handle(
    args: &EmailArgs,
    config: &Config,
    token_flag: Option<&str>,
) -> Result<HandledEmail, AssistError> {
    let input = EmailInput::load(&args.input)?;
    let prompt = PromptTemplate::load(config.assistant.prompt_path.as_deref())?;
    let llm = MessagesClient::new(input.api_key.clone(), &config.assistant);
    let notifier = default_notifier(config.assistant.notify && !args.no_notify);

    let assistant = EmailAssistant::<_, NotionClient>::new(
        llm,
        prompt,
        config.assistant.signature.clone(),
    )
    .with_notifier(notifier);

    let task_database = args
        .task_database_id
        .clone()
        .or_else(|| config.todo.database_id.clone())
        .filter(|_| !args.no_tasks);

    let assistant = match (task_database, token::resolve_token(token_flag)) {
        (Some(database_id), Some(token)) => {
            info!(database = %database_id, "task pages enabled");
            assistant.with_tasks(NotionClient::new(token, &config.notion), database_id)
        }
        (Some(_), None) => {
            warn!("no Notion token; tasks will only be notified");
            assistant
        }
        (None, _) => assistant,
    };

    assistant.handle(&input)
}
