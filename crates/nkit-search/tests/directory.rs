//! Directory discovery, caching and background refresh against a fake source.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use nkit_core::error::RemoteError;
use nkit_core::model::DatabaseObject;
use nkit_core::notion::{BotUser, SearchFilter, SearchResults};
use nkit_search::{
    DirectoryCache, DirectorySource, FINISH_TIMEOUT, ParentContext, Refresher, fetch_directory,
    load_or_fetch, rank, workspace_info,
};
use serde_json::json;
use tempfile::TempDir;

fn db(id: &str, title: &str, parent: &str) -> DatabaseObject {
    serde_json::from_value(json!({
        "object": "database",
        "id": id,
        "title": [{"plain_text": title}],
        "parent": {"type": parent},
        "properties": {"Name": {"type": "title"}},
    }))
    .expect("database parses")
}

#[derive(Debug, Clone, Default)]
struct FakeSource {
    /// Pages returned by the database-filtered search, in order.
    filtered: Vec<Vec<DatabaseObject>>,
    general: Vec<DatabaseObject>,
    fail: bool,
    delay: Duration,
    calls: Arc<Mutex<Vec<(SearchFilter, Option<String>)>>>,
}

impl FakeSource {
    fn calls(&self) -> Vec<(SearchFilter, Option<String>)> {
        self.calls.lock().expect("lock").clone()
    }
}

impl DirectorySource for FakeSource {
    fn search_page(
        &self,
        filter: SearchFilter,
        _page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResults, RemoteError> {
        std::thread::sleep(self.delay);
        self.calls
            .lock()
            .expect("lock")
            .push((filter, cursor.map(str::to_string)));
        if self.fail {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        match filter {
            SearchFilter::Databases => {
                let index: usize = cursor.map_or(0, |c| c.parse().expect("numeric cursor"));
                let databases = self.filtered.get(index).cloned().unwrap_or_default();
                let has_more = index + 1 < self.filtered.len();
                Ok(SearchResults {
                    total: databases.len(),
                    databases,
                    has_more,
                    next_cursor: has_more.then(|| (index + 1).to_string()),
                })
            }
            SearchFilter::Everything => Ok(SearchResults {
                total: self.general.len() + 3,
                databases: self.general.clone(),
                has_more: false,
                next_cursor: None,
            }),
        }
    }

    fn bot_user(&self) -> Result<BotUser, RemoteError> {
        if self.fail {
            return Err(RemoteError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            });
        }
        Ok(BotUser {
            id: "bot-1".to_string(),
            name: Some("nkit".to_string()),
            kind: Some("bot".to_string()),
        })
    }

    fn retrieve(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        Ok(db(database_id, "Retrieved", "workspace"))
    }
}

fn source() -> FakeSource {
    FakeSource {
        filtered: vec![
            vec![db("b", "beta", "workspace"), db("a", "Alpha", "page_id")],
            vec![db("c", "Gamma", "database_id")],
        ],
        general: vec![db("a", "Alpha", "page_id"), db("z", "zeta", "workspace")],
        ..FakeSource::default()
    }
}

fn cache(dir: &TempDir) -> DirectoryCache {
    DirectoryCache::new(
        dir.path().join("databases.json"),
        Duration::from_secs(3600),
        Duration::from_secs(1800),
    )
}

#[test]
fn fetch_pages_merges_dedupes_and_sorts() {
    let source = source();

    let databases = fetch_directory(&source).expect("fetch succeeds");

    let ids: Vec<&str> = databases.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "z"]);
    assert_eq!(databases[0].context, ParentContext::Page);
    assert_eq!(
        source.calls(),
        vec![
            (SearchFilter::Databases, None),
            (SearchFilter::Databases, Some("1".to_string())),
            (SearchFilter::Everything, None),
        ]
    );
}

#[test]
fn workspace_info_degrades_to_error_note() {
    let info = workspace_info(&FakeSource {
        fail: true,
        ..FakeSource::default()
    });
    assert!(info.error.as_deref().is_some_and(|e| e.contains("401")));
    assert!(!info.workspace_accessible);

    let ok = workspace_info(&source());
    assert_eq!(ok.bot_name.as_deref(), Some("nkit"));
    assert!(ok.workspace_accessible);
    assert!(ok.error.is_none());
}

#[test]
fn load_prefers_fresh_cache() {
    let dir = TempDir::new().expect("tempdir");
    let cache = cache(&dir);
    let now = Utc::now();

    let first = load_or_fetch(&source(), Some(&cache), now).expect("fetch");
    assert!(!first.from_cache);
    assert_eq!(first.snapshot.databases.len(), 4);
    assert!(cache.path().exists());

    let offline = FakeSource {
        fail: true,
        ..FakeSource::default()
    };
    let second = load_or_fetch(&offline, Some(&cache), now).expect("cache hit");
    assert!(second.from_cache);
    assert_eq!(second.snapshot.databases, first.snapshot.databases);
    assert!(offline.calls().is_empty());
}

#[test]
fn load_without_cache_surfaces_fetch_errors() {
    let offline = FakeSource {
        fail: true,
        ..FakeSource::default()
    };
    let err = load_or_fetch(&offline, None, Utc::now()).expect_err("fetch fails");
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[test]
fn ranking_uses_title_and_context() {
    let databases = fetch_directory(&source()).expect("fetch");
    let ranked = rank("gamma", &databases, 8);
    assert_eq!(ranked[0].database.id, "c");
    assert_eq!(ranked[0].score, 100);
    assert_eq!(ranked.len(), 4);
}

#[test]
fn background_refresh_rewrites_cache_and_runs_once() {
    let dir = TempDir::new().expect("tempdir");
    let cache = cache(&dir);
    let slow = FakeSource {
        delay: Duration::from_millis(100),
        ..source()
    };
    let refresher = Refresher::new();

    let pending = refresher
        .start(slow.clone(), Some(cache.clone()))
        .expect("first refresh starts");
    assert!(refresher.is_running());
    assert!(refresher.start(slow, None).is_none());

    let databases = pending
        .wait(FINISH_TIMEOUT)
        .expect("finished in time")
        .expect("refresh succeeded");
    assert_eq!(databases.len(), 4);
    assert!(!refresher.is_running());
    assert_eq!(
        cache.load_fresh(Utc::now()).map(|s| s.databases),
        Some(databases)
    );
}

#[test]
fn unfinished_refresh_times_out() {
    let slow = FakeSource {
        delay: Duration::from_millis(300),
        ..source()
    };
    let pending = Refresher::new().start(slow, None).expect("starts");

    assert!(pending.try_finish().is_none());
    assert!(pending.wait(Duration::from_millis(10)).is_none());
}
