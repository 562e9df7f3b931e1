//! Blocking HTTP client for the Notion REST API.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::NotionConfig;
use crate::error::RemoteError;
use crate::model::{DatabaseObject, SelectOption};
use crate::page::{CreatedPage, PageDraft};
use crate::remote::{MAX_PAGE_SIZE, QueryPage, RemoteDatabase};

/// Strip dashes and whitespace so URL-copied ids work.
#[must_use]
pub fn normalize_database_id(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '-').collect()
}

/// The integration's own user object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Object-type filter for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Databases,
    Everything,
}

/// One page of search results, with databases already parsed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub databases: Vec<DatabaseObject>,
    /// Number of objects of any kind in this page.
    pub total: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchPage {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct NotionClient {
    agent: ureq::Agent,
    base_url: String,
    version: String,
    token: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    pub fn new(token: impl Into<String>, config: &NotionConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("nkit/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            version: config.version.clone(),
            token: token.into(),
        }
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, RemoteError> {
        let url = format!("{}/v1/{path}", self.base_url);
        debug!(method, url = %url, "notion request");

        let request = self
            .agent
            .request(method, &url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Notion-Version", &self.version)
            .set("Content-Type", "application/json");

        let response = match body {
            Some(body) => request.send_json(body)?,
            None => request.call()?,
        };

        response
            .into_json::<T>()
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }

    /// Identity of the integration behind the token.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the call fails.
    pub fn me(&self) -> Result<BotUser, RemoteError> {
        self.send("GET", "users/me", None)
    }

    /// Retrieve a database and check that the object really is one.
    ///
    /// # Errors
    ///
    /// Returns the remote error, or a protocol error for non-database objects.
    pub fn database(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        let id = normalize_database_id(database_id);
        let database: DatabaseObject = self.send("GET", &format!("databases/{id}"), None)?;
        if database.object != "database" {
            return Err(RemoteError::Protocol(format!(
                "object {id} is a {}, not a database",
                database.object
            )));
        }
        Ok(database)
    }

    /// One page of object search.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the call fails.
    pub fn search(
        &self,
        filter: SearchFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResults, RemoteError> {
        let mut body = json!({"page_size": page_size.clamp(1, MAX_PAGE_SIZE)});
        if filter == SearchFilter::Databases {
            body["filter"] = json!({"property": "object", "value": "database"});
        }
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let raw: RawSearchPage = self.send("POST", "search", Some(&body))?;
        let total = raw.results.len();
        let databases = raw
            .results
            .into_iter()
            .filter(|obj| obj.get("object").and_then(Value::as_str) == Some("database"))
            .filter_map(|obj| match serde_json::from_value::<DatabaseObject>(obj) {
                Ok(db) => Some(db),
                Err(err) => {
                    debug!(error = %err, "skipping unparseable database in search results");
                    None
                }
            })
            .collect();

        Ok(SearchResults {
            databases,
            total,
            has_more: raw.has_more,
            next_cursor: raw.next_cursor,
        })
    }

    /// Create a page and return its id and URL.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the call fails.
    pub fn create_page(
        &self,
        draft: &PageDraft,
        title_property: Option<&str>,
    ) -> Result<CreatedPage, RemoteError> {
        let mut draft = draft.clone();
        draft.database_id = normalize_database_id(&draft.database_id);
        self.send("POST", "pages", Some(&draft.to_request(title_property)))
    }
}

impl RemoteDatabase for NotionClient {
    fn retrieve_database(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        self.database(database_id)
    }

    fn update_tag_options(
        &self,
        database_id: &str,
        column: &str,
        options: &[SelectOption],
    ) -> Result<(), RemoteError> {
        let id = normalize_database_id(database_id);
        let body = json!({
            "properties": {column: {"multi_select": {"options": options}}}
        });
        self.send::<IgnoredAny>("PATCH", &format!("databases/{id}"), Some(&body))?;
        Ok(())
    }

    fn query(
        &self,
        database_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<QueryPage, RemoteError> {
        let id = normalize_database_id(database_id);
        let mut body = json!({"page_size": page_size.clamp(1, MAX_PAGE_SIZE)});
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        self.send("POST", &format!("databases/{id}/query"), Some(&body))
    }

    fn update_page_tags(
        &self,
        page_id: &str,
        column: &str,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        let values: Vec<Value> = tags.iter().map(|t| json!({"name": t})).collect();
        let body = json!({"properties": {column: {"multi_select": values}}});
        self.send::<IgnoredAny>("PATCH", &format!("pages/{page_id}"), Some(&body))?;
        Ok(())
    }
}
