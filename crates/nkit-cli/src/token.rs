//! Notion token resolution.
//!
//! The chain: `--token` flag > `NOTION_TOKEN` env > `NOTION_API_KEY` env.
//! Interactive commands may additionally prompt when stdin is a TTY.

use std::env;
use std::io::{BufRead, IsTerminal, Write};

use nkit_core::error::ErrorCode;

use crate::output::CliError;

/// Environment variables consulted, in order.
pub const TOKEN_VARS: [&str; 2] = ["NOTION_TOKEN", "NOTION_API_KEY"];

/// Environment reader for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_token_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(token) = cli_flag.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }
    TOKEN_VARS.iter().find_map(|key| env.get(key))
}

pub fn resolve_token(cli_flag: Option<&str>) -> Option<String> {
    resolve_token_with(cli_flag, &RealEnv)
}

/// Resolve the token or explain how to provide one.
pub fn require_token(cli_flag: Option<&str>) -> Result<String, CliError> {
    resolve_token(cli_flag).ok_or_else(missing_token)
}

/// Like [`require_token`], but asks on the terminal as a last resort.
pub fn require_token_or_prompt(
    cli_flag: Option<&str>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<String, CliError> {
    if let Some(token) = resolve_token(cli_flag) {
        return Ok(token);
    }
    if !std::io::stdin().is_terminal() {
        return Err(missing_token());
    }
    prompt_token(input, out).ok_or_else(missing_token)
}

fn prompt_token(input: &mut dyn BufRead, out: &mut dyn Write) -> Option<String> {
    write!(out, "Notion token: ").ok()?;
    out.flush().ok()?;
    let mut line = String::new();
    input.read_line(&mut line).ok()?;
    let token = line.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn missing_token() -> CliError {
    CliError::coded(
        ErrorCode::MissingToken,
        format!(
            "no Notion token: pass --token or set {}",
            TOKEN_VARS.join(" or ")
        ),
    )
}
