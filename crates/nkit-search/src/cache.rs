//! On-disk cache of the database directory.
//!
//! The cache is a single JSON document holding the database summaries, the
//! workspace info and the time they were fetched. Freshness is judged from
//! that embedded timestamp, not from file metadata.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nkit_core::config::SearchConfig;
use nkit_core::error::ErrorCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::{DatabaseSummary, WorkspaceInfo};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("unable to determine OS cache directory")]
    NoCacheDir,

    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl CacheError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::CacheUnreadable
    }
}

/// Contents of the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub databases: Vec<DatabaseSummary>,
    #[serde(default)]
    pub workspace: Option<WorkspaceInfo>,
    pub timestamp: DateTime<Utc>,
}

impl CacheSnapshot {
    /// Age at `now`; a timestamp in the future counts as zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Location and freshness policy of the directory cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCache {
    path: PathBuf,
    max_age: Duration,
    refresh_after: Duration,
}

impl DirectoryCache {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration, refresh_after: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
            refresh_after,
        }
    }

    /// Cache configured by `[search]`, defaulting to
    /// `dirs::cache_dir() / nkit / databases.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] when no path is configured and the
    /// platform has no cache directory.
    pub fn from_config(config: &SearchConfig) -> Result<Self, CacheError> {
        let path = match &config.cache_path {
            Some(path) => path.clone(),
            None => default_cache_path()?,
        };
        Ok(Self::new(
            path,
            Duration::from_secs(config.cache_max_age_secs),
            Duration::from_secs(config.refresh_after_secs),
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache file regardless of age.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read(&self) -> Result<CacheSnapshot, CacheError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The cached snapshot if it exists, parses, is non-empty and is younger
    /// than the maximum age.
    #[must_use]
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Option<CacheSnapshot> {
        let snapshot = match self.read() {
            Ok(snapshot) => snapshot,
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                return None;
            }
            Err(err) => {
                debug!(error = %err, "ignoring unreadable cache");
                return None;
            }
        };
        let age = snapshot.age(now);
        if age > self.max_age {
            debug!(age_secs = age.as_secs(), "cache expired");
            return None;
        }
        if snapshot.databases.is_empty() {
            return None;
        }
        Some(snapshot)
    }

    /// Whether a cache younger than the maximum age is still old enough to be
    /// refreshed in the background.
    #[must_use]
    pub fn needs_refresh(&self, snapshot: &CacheSnapshot, now: DateTime<Utc>) -> bool {
        snapshot.age(now) > self.refresh_after
    }

    /// Write `snapshot`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        let io = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json).map_err(io)
    }

    /// Save non-empty snapshots; failures are only logged.
    pub fn store(&self, snapshot: &CacheSnapshot) {
        if snapshot.databases.is_empty() {
            return;
        }
        if let Err(err) = self.save(snapshot) {
            warn!(error = %err, "could not save database cache");
        }
    }
}

/// `dirs::cache_dir() / nkit / databases.json`.
///
/// # Errors
///
/// Returns [`CacheError::NoCacheDir`] when the platform has no cache directory.
pub fn default_cache_path() -> Result<PathBuf, CacheError> {
    let mut path = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
    path.push("nkit");
    path.push("databases.json");
    Ok(path)
}
