//! Discovery of every database shared with the integration.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nkit_core::error::RemoteError;
use nkit_core::model::DatabaseObject;
use nkit_core::notion::{BotUser, NotionClient, SearchFilter, SearchResults};
use nkit_core::remote::MAX_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheSnapshot, DirectoryCache};

/// Read-only calls needed to build the database directory.
pub trait DirectorySource {
    /// One page of search results.
    fn search_page(
        &self,
        filter: SearchFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResults, RemoteError>;

    /// Identity of the integration.
    fn bot_user(&self) -> Result<BotUser, RemoteError>;

    /// Retrieve one database by id.
    fn retrieve(&self, database_id: &str) -> Result<DatabaseObject, RemoteError>;
}

impl DirectorySource for NotionClient {
    fn search_page(
        &self,
        filter: SearchFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResults, RemoteError> {
        self.search(filter, page_size, cursor)
    }

    fn bot_user(&self) -> Result<BotUser, RemoteError> {
        self.me()
    }

    fn retrieve(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        self.database(database_id)
    }
}

impl<T: DirectorySource + ?Sized> DirectorySource for &T {
    fn search_page(
        &self,
        filter: SearchFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResults, RemoteError> {
        (**self).search_page(filter, page_size, cursor)
    }

    fn bot_user(&self) -> Result<BotUser, RemoteError> {
        (**self).bot_user()
    }

    fn retrieve(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        (**self).retrieve(database_id)
    }
}

/// Where a database lives in the workspace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentContext {
    Workspace,
    Page,
    Database,
    Unknown,
}

impl ParentContext {
    #[must_use]
    pub fn from_parent_kind(kind: Option<&str>) -> Self {
        match kind {
            Some("workspace") => Self::Workspace,
            Some("page_id") => Self::Page,
            Some("database_id") => Self::Database,
            _ => Self::Unknown,
        }
    }

    /// Suffix shown after the title in listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Workspace => "(Workspace)",
            Self::Page => "(In Page)",
            Self::Database => "(In Database)",
            Self::Unknown => "",
        }
    }
}

/// What the directory remembers about one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub id: String,
    pub title: String,
    pub context: ParentContext,
    /// Name of the schema property of type `title`.
    #[serde(default)]
    pub title_property: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<&DatabaseObject> for DatabaseSummary {
    fn from(db: &DatabaseObject) -> Self {
        Self {
            id: db.id.clone(),
            title: db.display_title(),
            context: ParentContext::from_parent_kind(db.parent.as_ref().map(|p| p.kind.as_str())),
            title_property: db.title_property().map(str::to_string),
            url: db.url.clone(),
        }
    }
}

impl DatabaseSummary {
    /// Text matched against search terms: title followed by its context.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.context.label())
            .trim()
            .to_string()
    }
}

/// Workspace-parented versus page-parented databases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub workspace: usize,
    pub private: usize,
}

impl Breakdown {
    #[must_use]
    pub fn of(databases: &[DatabaseSummary]) -> Self {
        let workspace = databases
            .iter()
            .filter(|d| d.context == ParentContext::Workspace)
            .count();
        Self {
            workspace,
            private: databases.len() - workspace,
        }
    }
}

/// Who the integration is and whether it can see anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub bot_name: Option<String>,
    #[serde(default)]
    pub bot_type: Option<String>,
    #[serde(default)]
    pub workspace_accessible: bool,
    /// Set instead of the fields above when the lookup failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Look up the integration identity. Failures degrade to an error note.
pub fn workspace_info<S: DirectorySource>(source: &S) -> WorkspaceInfo {
    let lookup = || -> Result<WorkspaceInfo, RemoteError> {
        let bot = source.bot_user()?;
        let probe = source.search_page(SearchFilter::Everything, 1, None)?;
        Ok(WorkspaceInfo {
            bot_id: Some(bot.id),
            bot_name: bot.name,
            bot_type: bot.kind,
            workspace_accessible: probe.total > 0,
            error: None,
        })
    };
    lookup().unwrap_or_else(|err| {
        warn!(error = %err, "could not read workspace info");
        WorkspaceInfo {
            error: Some(err.to_string()),
            ..WorkspaceInfo::default()
        }
    })
}

/// Fetch every visible database.
///
/// Pages through the database-filtered search, then merges the databases of
/// one unfiltered search, which occasionally surfaces objects the filtered
/// one misses. The result has unique ids and is sorted by lowercase title.
///
/// # Errors
///
/// Returns the first remote error, or a protocol error when the service
/// reports more results without a cursor.
#[instrument(skip(source))]
pub fn fetch_directory<S: DirectorySource>(
    source: &S,
) -> Result<Vec<DatabaseSummary>, RemoteError> {
    let mut found: Vec<DatabaseObject> = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = source.search_page(SearchFilter::Databases, MAX_PAGE_SIZE, cursor.as_deref())?;
        found.extend(page.databases);
        if !page.has_more {
            break;
        }
        debug!(so_far = found.len(), "loading more databases");
        cursor = Some(page.next_cursor.ok_or_else(|| {
            RemoteError::Protocol("has_more is true but next_cursor is missing".to_string())
        })?);
    }

    let general = source.search_page(SearchFilter::Everything, MAX_PAGE_SIZE, None)?;
    found.extend(general.databases);

    let mut seen = HashSet::new();
    let mut databases: Vec<DatabaseSummary> = found
        .iter()
        .filter(|db| !db.id.is_empty() && seen.insert(db.id.clone()))
        .map(DatabaseSummary::from)
        .collect();
    databases.sort_by_cached_key(|d| d.title.to_lowercase());

    let breakdown = Breakdown::of(&databases);
    info!(
        total = databases.len(),
        workspace = breakdown.workspace,
        private = breakdown.private,
        "fetched database directory"
    );
    Ok(databases)
}

/// Directory contents plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDirectory {
    pub snapshot: CacheSnapshot,
    pub from_cache: bool,
}

/// Use the cache when it is fresh, otherwise fetch and rewrite it.
///
/// An empty fetch result is returned but never cached.
///
/// # Errors
///
/// Returns the remote error when the cache is unusable and fetching fails.
pub fn load_or_fetch<S: DirectorySource>(
    source: &S,
    cache: Option<&DirectoryCache>,
    now: DateTime<Utc>,
) -> Result<LoadedDirectory, RemoteError> {
    if let Some(snapshot) = cache.and_then(|c| c.load_fresh(now)) {
        info!(count = snapshot.databases.len(), "loaded databases from cache");
        return Ok(LoadedDirectory {
            snapshot,
            from_cache: true,
        });
    }

    let workspace = workspace_info(source);
    let databases = fetch_directory(source)?;
    let snapshot = CacheSnapshot {
        databases,
        workspace: Some(workspace),
        timestamp: now,
    };
    if let Some(cache) = cache {
        cache.store(&snapshot);
    }
    Ok(LoadedDirectory {
        snapshot,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db(id: &str, title: &str, parent: &str) -> DatabaseObject {
        serde_json::from_value(json!({
            "object": "database",
            "id": id,
            "title": [{"plain_text": title}],
            "parent": {"type": parent},
            "properties": {"Name": {"type": "title"}, "Tags": {"type": "multi_select"}},
        }))
        .expect("database parses")
    }

    #[test]
    fn summary_reads_title_context_and_title_property() {
        let summary = DatabaseSummary::from(&db("d1", "Reading List", "page_id"));
        assert_eq!(summary.title, "Reading List");
        assert_eq!(summary.context, ParentContext::Page);
        assert_eq!(summary.title_property.as_deref(), Some("Name"));
        assert_eq!(summary.search_text(), "Reading List (In Page)");
    }

    #[test]
    fn unknown_parent_has_no_label() {
        let summary = DatabaseSummary::from(&db("d1", "Loose", "block_id"));
        assert_eq!(summary.context, ParentContext::Unknown);
        assert_eq!(summary.search_text(), "Loose");
    }

    #[test]
    fn breakdown_counts_workspace_parents() {
        let all = [
            DatabaseSummary::from(&db("a", "A", "workspace")),
            DatabaseSummary::from(&db("b", "B", "page_id")),
            DatabaseSummary::from(&db("c", "C", "database_id")),
        ];
        assert_eq!(
            Breakdown::of(&all),
            Breakdown {
                workspace: 1,
                private: 2
            }
        );
    }
}
