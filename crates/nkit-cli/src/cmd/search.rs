//! `nk search`: ranked, non-interactive database lookup.

use chrono::Utc;
use clap::Args;
use nkit_core::config::Config;
use nkit_core::notion::NotionClient;
use nkit_search::{Breakdown, DirectoryCache, DirectorySource, load_or_fetch, rank};
use serde::Serialize;
use std::io::{self, Write};
use tracing::warn;

use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};
use crate::token;

#[derive(Args, Debug)]
#[command(
    about = "Find databases by fuzzy title match",
    long_about = "Rank every database shared with the integration against a search term. \
                  Uses the local directory cache when it is fresh.",
    after_help = "EXAMPLES:\n    # Top matches for a term\n    nk search reading\n\n\
                  # Ignore the cache\n    nk search reading --refresh\n\n\
                  # Machine-readable output\n    nk search reading --format json"
)]
pub struct SearchArgs {
    /// Search term, matched against title and location.
    pub term: String,

    /// Maximum number of results; defaults to `[search] result_limit`.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Fetch from Notion even when the cache is fresh.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub context: String,
    /// Match score, 0-100.
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub term: String,
    pub total_databases: usize,
    pub from_cache: bool,
    pub breakdown: Breakdown,
    pub results: Vec<SearchHit>,
}

/// Rank the directory of `source` against `args.term`.
///
/// # Errors
///
/// Returns the remote error when no usable cache exists and fetching fails.
pub fn search_directory<S: DirectorySource>(
    source: &S,
    cache: Option<&DirectoryCache>,
    args: &SearchArgs,
    default_limit: usize,
) -> Result<SearchOutput, nkit_core::error::RemoteError> {
    let now = Utc::now();
    let loaded = if args.refresh {
        let loaded = load_or_fetch(source, None, now)?;
        if let Some(cache) = cache {
            cache.store(&loaded.snapshot);
        }
        loaded
    } else {
        load_or_fetch(source, cache, now)?
    };
    let databases = &loaded.snapshot.databases;
    let results = rank(&args.term, databases, args.limit.unwrap_or(default_limit))
        .into_iter()
        .map(|m| SearchHit {
            id: m.database.id.clone(),
            title: m.database.title.clone(),
            context: m.database.context.label().to_string(),
            score: m.score,
            url: m.database.url.clone(),
        })
        .collect();
    Ok(SearchOutput {
        term: args.term.clone(),
        total_databases: databases.len(),
        from_cache: loaded.from_cache,
        breakdown: Breakdown::of(databases),
        results,
    })
}

/// Execute `nk search <term>`.
///
/// # Errors
///
/// Returns an error if no token is available, the directory cannot be
/// loaded, or rendering fails.
pub fn run_search(
    args: &SearchArgs,
    config: &Config,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let token = match token::require_token(token_flag) {
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
    let result = search_directory(&client, cache.as_ref(), args, config.search.result_limit);

    let found = match result {
        Ok(found) => found,
        Err(err) => {
            render_error(output, &CliError::coded(err.code(), err.to_string()))?;
            anyhow::bail!("search failed: {err}");
        }
    };

    render_mode(output, &found, write_text, write_pretty)
}

fn write_text(found: &SearchOutput, w: &mut dyn Write) -> io::Result<()> {
    for hit in &found.results {
        writeln!(w, "{}\t{}\t{}\t{}", hit.score, hit.id, hit.title, hit.context)?;
    }
    Ok(())
}

fn write_pretty(found: &SearchOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Databases matching '{}'", found.term))?;
    if found.results.is_empty() {
        writeln!(w, "No matches.")?;
    }
    for (i, hit) in found.results.iter().enumerate() {
        writeln!(w, "{:>2}. {} {} ({}%)", i + 1, hit.title, hit.context, hit.score)?;
    }
    writeln!(w)?;
    pretty_kv(
        w,
        "Searched",
        format!(
            "{} databases ({} workspace, {} private){}",
            found.total_databases,
            found.breakdown.workspace,
            found.breakdown.private,
            if found.from_cache { ", cached" } else { "" }
        ),
    )
}
