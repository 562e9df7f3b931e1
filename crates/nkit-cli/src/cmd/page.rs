//! `nk page new` and `nk todo`: pick a database by fuzzy search, then create
//! a page in it.
//!
//! The directory comes from the local cache when it is fresh. An aging cache
//! is refreshed on a background thread while the user types; the result is
//! picked up before each search and waited on (briefly) before the page is
//! created.

use std::io::{self, BufRead, Read, Write};

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Subcommand};
use nkit_assist::PageSink;
use nkit_core::config::Config;
use nkit_core::error::{ErrorCode, RemoteError};
use nkit_core::notion::NotionClient;
use nkit_search::{
    Breakdown, DatabaseSummary, DirectoryCache, DirectorySource, FINISH_TIMEOUT, PendingRefresh,
    Refresher, load_or_fetch, rank,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::output::{CliError, OutputMode, render, render_error};
use crate::token;

#[derive(Subcommand, Debug)]
pub enum PageCommand {
    #[command(
        about = "Create a page in a database chosen by search",
        after_help = "EXAMPLES:\n    # Search for the database interactively\n    nk page new\n\n\
                      # Skip the search\n    nk page new --database-id 1a2b3c"
    )]
    New(PageNewArgs),
}

#[derive(Args, Debug)]
pub struct PageNewArgs {
    /// Use this database directly; falls back to search if it is not accessible.
    #[arg(long)]
    pub database_id: Option<String>,
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Created {
        database_id: String,
        database: String,
        title: String,
        url: String,
    },
    Cancelled,
}

/// One interactive page-creation session.
pub struct PageSession<'io, S> {
    source: S,
    cache: Option<DirectoryCache>,
    limit: usize,
    refresher: Refresher,
    pending: Option<PendingRefresh>,
    databases: Vec<DatabaseSummary>,
    input: &'io mut dyn BufRead,
    out: &'io mut dyn Write,
}

enum Choice {
    Picked(DatabaseSummary),
    SearchAgain,
    Quit,
}

fn is_quit(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "q" | "quit" | "exit")
}

impl<'io, S> PageSession<'io, S>
where
    S: DirectorySource + PageSink + Clone + Send + 'static,
{
    pub fn new(
        source: S,
        cache: Option<DirectoryCache>,
        limit: usize,
        input: &'io mut dyn BufRead,
        out: &'io mut dyn Write,
    ) -> Self {
        Self {
            source,
            cache,
            limit,
            refresher: Refresher::new(),
            pending: None,
            databases: Vec::new(),
            input,
            out,
        }
    }

    /// Run the whole flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be loaded, the terminal
    /// cannot be read or written, or the page cannot be created.
    pub fn run(mut self, database_id: Option<&str>) -> anyhow::Result<PageOutcome> {
        let preselected = match database_id {
            Some(id) => self.check_database(id)?,
            None => None,
        };

        let database = match preselected {
            Some(database) => database,
            None => {
                self.load_directory()?;
                match self.pick_database()? {
                    Some(database) => database,
                    None => return Ok(PageOutcome::Cancelled),
                }
            }
        };

        writeln!(self.out, "\nCreating a page in '{}'.", database.title)?;
        let Some(title) = self.prompt("Page title: ")?.filter(|t| !t.is_empty()) else {
            writeln!(self.out, "No title given; nothing created.")?;
            return Ok(PageOutcome::Cancelled);
        };
        writeln!(self.out, "Content (finish with Ctrl-D):")?;
        self.out.flush()?;
        let content = self.read_to_end()?;

        self.finish_refresh();

        let url = self
            .source
            .create_page(&database.id, &title, &content)
            .with_context(|| format!("failed to create page in '{}'", database.title))?;
        info!(database = %database.id, url = %url, "page created");

        Ok(PageOutcome::Created {
            database_id: database.id,
            database: database.title,
            title,
            url,
        })
    }

    fn check_database(&mut self, id: &str) -> io::Result<Option<DatabaseSummary>> {
        match self.source.retrieve(id) {
            Ok(db) => Ok(Some(DatabaseSummary::from(&db))),
            Err(err) => {
                writeln!(
                    self.out,
                    "Could not access database {id}: {err}\nFalling back to search."
                )?;
                Ok(None)
            }
        }
    }

    fn load_directory(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();
        let loaded = load_or_fetch(&self.source, self.cache.as_ref(), now)
            .context("failed to load the database directory")?;

        if loaded.from_cache
            && self
                .cache
                .as_ref()
                .is_some_and(|c| c.needs_refresh(&loaded.snapshot, now))
        {
            self.pending = self
                .refresher
                .start(self.source.clone(), self.cache.clone());
        }

        self.databases = loaded.snapshot.databases;
        let breakdown = Breakdown::of(&self.databases);
        writeln!(
            self.out,
            "{} databases available ({} workspace, {} private){}.",
            self.databases.len(),
            breakdown.workspace,
            breakdown.private,
            if loaded.from_cache { ", from cache" } else { "" }
        )?;
        Ok(())
    }

    /// Swap in a finished background refresh.
    fn absorb_refresh(&mut self) {
        let Some(pending) = &self.pending else {
            return;
        };
        match pending.try_finish() {
            Some(Ok(databases)) => {
                self.pending = None;
                if !databases.is_empty() {
                    debug!(count = databases.len(), "using refreshed directory");
                    self.databases = databases;
                }
            }
            Some(Err(_)) => self.pending = None,
            None => {}
        }
    }

    fn finish_refresh(&mut self) {
        if let Some(pending) = self.pending.take() {
            match pending.wait(FINISH_TIMEOUT) {
                Some(Ok(databases)) if !databases.is_empty() => self.databases = databases,
                Some(Err(err)) => warn!(error = %err, "background refresh failed"),
                _ => {}
            }
        }
    }

    fn pick_database(&mut self) -> io::Result<Option<DatabaseSummary>> {
        loop {
            let Some(term) = self.prompt("\nSearch databases (q to quit): ")? else {
                return Ok(None);
            };
            if is_quit(&term) {
                return Ok(None);
            }
            if term.is_empty() {
                continue;
            }

            self.absorb_refresh();
            match self.choose(&term)? {
                Choice::Picked(database) => return Ok(Some(database)),
                Choice::SearchAgain => {}
                Choice::Quit => return Ok(None),
            }
        }
    }

    fn choose(&mut self, term: &str) -> io::Result<Choice> {
        let matches: Vec<(DatabaseSummary, u8)> = rank(term, &self.databases, self.limit)
            .into_iter()
            .filter(|m| m.score > 0)
            .map(|m| (m.database.clone(), m.score))
            .collect();
        for (i, (database, score)) in matches.iter().enumerate() {
            writeln!(
                self.out,
                "{:>2}. {} {} ({score}%)",
                i + 1,
                database.title,
                database.context.label()
            )?;
        }

        if matches.is_empty() {
            writeln!(self.out, "No databases match '{term}'.")?;
            return Ok(Choice::SearchAgain);
        }

        let prompt = format!("Select 1-{} (q to quit): ", matches.len());
        let Some(answer) = self.prompt(&prompt)? else {
            return Ok(Choice::Quit);
        };
        if is_quit(&answer) {
            return Ok(Choice::Quit);
        }
        if let Some(database) = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| matches.get(i))
            .map(|(database, _)| database.clone())
        {
            return Ok(Choice::Picked(database));
        }

        writeln!(self.out, "No selection made.")?;
        match self.prompt("Search again? [Y/n]: ")? {
            Some(answer) if answer.eq_ignore_ascii_case("n") || is_quit(&answer) => {
                Ok(Choice::Quit)
            }
            Some(_) => Ok(Choice::SearchAgain),
            None => Ok(Choice::Quit),
        }
    }

    /// Print `prompt` and read one trimmed line; `None` at end of input.
    fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn read_to_end(&mut self) -> io::Result<String> {
        let mut content = String::new();
        self.input.read_to_string(&mut content)?;
        Ok(content.trim_end().to_string())
    }
}

/// Dispatch a `nk page` subcommand.
///
/// # Errors
///
/// Returns an error if the session fails; see [`PageSession::run`].
pub fn run_page(
    command: &PageCommand,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    match command {
        PageCommand::New(args) => {
            run_interactive(args.database_id.as_deref(), config, token_flag, output)
        }
    }
}

/// Execute `nk todo`: the same flow pinned to the task database.
///
/// # Errors
///
/// Returns an error if no task database is configured or the session fails.
pub fn run_todo(
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let Some(database_id) = config.todo.database_id.as_deref() else {
        let err = CliError::with_details(
            "no task database configured",
            "set [todo] database_id in the config",
            ErrorCode::DatabaseNotFound.code(),
        );
        render_error(output, &err)?;
        anyhow::bail!("{}", err.message);
    };
    run_interactive(Some(database_id), config, token_flag, output)
}

fn run_interactive(
    database_id: Option<&str>,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stderr();

    let token = match token::require_token_or_prompt(token_flag, &mut input, &mut out) {
        Ok(token) => token,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };
    let client = NotionClient::new(token, &config.notion);
    let cache = DirectoryCache::from_config(&config.search)
        .map_err(|err| warn!(error = %err, "directory cache disabled"))
        .ok();

    let session = PageSession::new(
        client,
        cache,
        config.search.result_limit,
        &mut input,
        &mut out,
    );
    let outcome = match session.run(database_id) {
        Ok(outcome) => outcome,
        Err(err) => {
            let code = err
                .downcast_ref::<RemoteError>()
                .map_or(ErrorCode::InternalUnexpected, RemoteError::code);
            render_error(output, &CliError::coded(code, format!("{err:#}")))?;
            return Err(err);
        }
    };

    render(output, &outcome, |o, w| match o {
        PageOutcome::Created { database, url, .. } => {
            writeln!(w, "Created page in '{database}': {url}")
        }
        PageOutcome::Cancelled => writeln!(w, "Cancelled."),
    })
}
