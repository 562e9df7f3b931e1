use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration, read from `~/.config/nkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub todo: TodoConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: f64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            version: default_notion_version(),
            timeout_secs: default_timeout_secs(),
            max_requests_per_second: default_max_requests_per_second(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default = "default_tag_column")]
    pub column: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Property names tried in order to find a record's member identifier.
    #[serde(default = "default_identifier_fields")]
    pub identifier_fields: Vec<String>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            database_id: None,
            column: default_tag_column(),
            page_size: default_page_size(),
            identifier_fields: default_identifier_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoConfig {
    #[serde(default)]
    pub database_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
    #[serde(default = "default_refresh_after_secs")]
    pub refresh_after_secs: u64,
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Override for the cache file location.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_max_age_secs: default_cache_max_age_secs(),
            refresh_after_secs: default_refresh_after_secs(),
            result_limit: default_result_limit(),
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_url")]
    pub api_url: String,
    #[serde(default = "default_assistant_model")]
    pub model: String,
    #[serde(default = "default_assistant_api_version")]
    pub api_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Name the drafted replies are signed with.
    #[serde(default = "default_signature")]
    pub signature: String,
    /// Replaces the built-in prompt template.
    #[serde(default)]
    pub prompt_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub notify: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: default_assistant_url(),
            model: default_assistant_model(),
            api_version: default_assistant_api_version(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            signature: default_signature(),
            prompt_path: None,
            notify: default_true(),
        }
    }
}

/// Location of the user config file, if a config directory exists.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nkit/config.toml"))
}

/// Load the user config, falling back to defaults when no file exists.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

/// Load config from an explicit path; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.notion.com".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_requests_per_second() -> f64 {
    3.0
}

fn default_tag_column() -> String {
    "gene_sets".to_string()
}

const fn default_page_size() -> u32 {
    100
}

fn default_identifier_fields() -> Vec<String> {
    ["gene_name", "Gene Name", "Gene", "Name", "Title"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

const fn default_cache_max_age_secs() -> u64 {
    3600
}

const fn default_refresh_after_secs() -> u64 {
    1800
}

const fn default_result_limit() -> usize {
    8
}

fn default_assistant_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_assistant_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_assistant_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_max_tokens() -> u32 {
    1000
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_retries() -> u32 {
    3
}

fn default_signature() -> String {
    "Me".to_string()
}
