//! `nk tags sync`: bring a database's tag column in line with a category file.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use nkit_core::config::Config;
use nkit_core::error::ErrorCode;
use nkit_core::model::CategoryMap;
use nkit_core::notion::NotionClient;
use nkit_core::rate_limit::RateLimiter;
use nkit_core::reconcile::{ReconcileOptions, Reconciler, RunAborted};
use tracing::info;

use crate::output::{CliError, OutputMode, render, render_error, render_error_with};
use crate::token;

#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    #[command(
        about = "Sync the tag column with a category file",
        long_about = "Add missing category options to the tag column, then rewrite each \
                      record's tags so they match the categories its member belongs to. \
                      Tags that are not categories are left alone.",
        after_help = "EXAMPLES:\n    # Preview the changes\n    nk tags sync categories.yml --database-id 1a2b3c --dry-run\n\n\
                      # Apply them to a custom column\n    nk tags sync categories.yml --column pathways"
    )]
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// YAML mapping of category name to member identifiers.
    pub categories: PathBuf,

    /// Target database; defaults to `[tags] database_id` in the config.
    #[arg(long)]
    pub database_id: Option<String>,

    /// Multi-select column holding the tags.
    #[arg(long)]
    pub column: Option<String>,

    /// Records requested per query page (at most 100).
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    fn options(&self, config: &Config) -> Result<ReconcileOptions, CliError> {
        let database_id = self
            .database_id
            .clone()
            .or_else(|| config.tags.database_id.clone())
            .ok_or_else(|| {
                CliError::with_details(
                    "no database to sync",
                    "pass --database-id or set [tags] database_id in the config",
                    ErrorCode::DatabaseNotFound.code(),
                )
            })?;

        let mut options = ReconcileOptions::from_config(database_id, &config.tags);
        if let Some(column) = &self.column {
            options.column.clone_from(column);
        }
        if let Some(page_size) = self.page_size {
            options.page_size = page_size;
        }
        options.dry_run = self.dry_run;
        Ok(options)
    }
}

/// Dispatch a `nk tags` subcommand.
///
/// # Errors
///
/// Returns an error if the run cannot start or aborts.
pub fn run_tags(
    command: &TagsCommand,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    match command {
        TagsCommand::Sync(args) => run_sync(args, config, token_flag, output),
    }
}

fn run_sync(
    args: &SyncArgs,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let categories = match CategoryMap::load(&args.categories) {
        Ok(categories) => categories,
        Err(err) => {
            render_error(output, &CliError::coded(err.code(), err.to_string()))?;
            anyhow::bail!("{err}");
        }
    };
    let options = match args.options(config) {
        Ok(options) => options,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };
    let token = match token::require_token(token_flag) {
        Ok(token) => token,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };

    info!(
        categories = categories.len(),
        database = %options.database_id,
        column = %options.column,
        dry_run = options.dry_run,
        "starting tag sync"
    );

    let client = NotionClient::new(token, &config.notion);
    let limiter = RateLimiter::new(config.notion.max_requests_per_second);
    let mut reconciler = Reconciler::new(client, limiter, options);

    match reconciler.run(&categories) {
        Ok(stats) => render(output, &stats, |s, w| s.write_summary(w)),
        Err(RunAborted { error, summary }) => {
            render_error_with(
                output,
                &CliError::coded(error.code(), error.to_string()),
                "summary",
                summary.as_ref(),
                |s, w| s.write_summary(w),
            )?;
            anyhow::bail!("tag sync aborted: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(database_id: Option<&str>) -> SyncArgs {
        SyncArgs {
            categories: PathBuf::from("categories.yml"),
            database_id: database_id.map(str::to_string),
            column: None,
            page_size: None,
            dry_run: false,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.tags.database_id = Some("from-config".to_string());
        let mut a = args(Some("from-flag"));
        a.column = Some("pathways".to_string());
        a.page_size = Some(25);
        a.dry_run = true;

        let options = a.options(&config).unwrap();
        assert_eq!(options.database_id, "from-flag");
        assert_eq!(options.column, "pathways");
        assert_eq!(options.page_size, 25);
        assert!(options.dry_run);
    }

    #[test]
    fn config_supplies_defaults() {
        let mut config = Config::default();
        config.tags.database_id = Some("from-config".to_string());

        let options = args(None).options(&config).unwrap();
        assert_eq!(options.database_id, "from-config");
        assert_eq!(options.column, "gene_sets");
        assert_eq!(options.page_size, 100);
    }

    #[test]
    fn missing_database_is_an_error() {
        let err = args(None).options(&Config::default()).unwrap_err();
        assert!(err.suggestion.unwrap().contains("--database-id"));
    }
}
