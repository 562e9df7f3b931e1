#![forbid(unsafe_code)]

mod cmd;
mod output;
mod token;

use std::env;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use nkit_core::config::{Config, load_config, load_config_from};
use nkit_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "nk: Notion catalog tagging, database search and email-to-task tools",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Notion integration token (overrides NOTION_TOKEN / NOTION_API_KEY).
    #[arg(long, global = true)]
    token: Option<String>,

    /// Config file (default: ~/.config/nkit/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    fn token_flag(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Catalog",
        about = "Keep a tag column in sync with category membership"
    )]
    Tags {
        #[command(subcommand)]
        command: cmd::tags::TagsCommand,
    },

    #[command(next_help_heading = "Directory")]
    Search(cmd::search::SearchArgs),

    #[command(next_help_heading = "Directory", about = "Create pages")]
    Page {
        #[command(subcommand)]
        command: cmd::page::PageCommand,
    },

    #[command(
        next_help_heading = "Directory",
        about = "Add a page to the task database",
        after_help = "EXAMPLES:\n    # Requires [todo] database_id in the config\n    nk todo"
    )]
    Todo,

    #[command(next_help_heading = "Assistant")]
    Email(cmd::email::EmailArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    nk completions bash > ~/.local/share/bash-completion/completions/nk"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("NKIT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "nkit=debug,info"
        } else if quiet {
            "error"
        } else {
            "nkit=info,warn"
        })
    });

    let format = env::var("NKIT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let output = cli.output_mode();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    debug!(?output, "config loaded");

    let token = cli.token_flag();
    match &cli.command {
        Commands::Tags { command } => cmd::tags::run_tags(command, &config, token, output),
        Commands::Search(args) => cmd::search::run_search(args, &config, token, output),
        Commands::Page { command } => cmd::page::run_page(command, &config, token, output),
        Commands::Todo => cmd::page::run_todo(&config, token, output),
        Commands::Email(args) => cmd::email::run_email(args, &config, token, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["nk", "search", "reading", "--json"]);
        assert!(cli.json);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["nk", "--format", "text", "search", "x"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn token_flag_parsed() {
        let cli = Cli::parse_from(["nk", "--token", "secret", "todo"]);
        assert_eq!(cli.token_flag(), Some("secret"));
    }

    #[test]
    fn tags_sync_parses() {
        let cli = Cli::parse_from([
            "nk",
            "tags",
            "sync",
            "categories.yml",
            "--database-id",
            "abc",
            "--column",
            "sets",
            "--page-size",
            "50",
            "--dry-run",
        ]);
        let Commands::Tags {
            command: cmd::tags::TagsCommand::Sync(args),
        } = cli.command
        else {
            panic!("expected tags sync");
        };
        assert_eq!(args.categories, PathBuf::from("categories.yml"));
        assert_eq!(args.database_id.as_deref(), Some("abc"));
        assert_eq!(args.column.as_deref(), Some("sets"));
        assert_eq!(args.page_size, Some(50));
        assert!(args.dry_run);
    }

    #[test]
    fn email_parses() {
        let cli = Cli::parse_from(["nk", "email", "in.json", "--no-notify"]);
        assert!(matches!(cli.command, Commands::Email(ref a) if a.no_notify && !a.no_tasks));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["nk", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Zsh,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["nk", "tags", "sync", "c.yml"],
            vec!["nk", "search", "x"],
            vec!["nk", "page", "new"],
            vec!["nk", "page", "new", "--database-id", "abc"],
            vec!["nk", "todo"],
            vec!["nk", "email", "in.json"],
            vec!["nk", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
