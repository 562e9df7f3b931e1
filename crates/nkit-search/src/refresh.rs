//! Background re-fetch of the database directory.
//!
//! One worker thread fetches while the foreground keeps interacting with the
//! user. The result comes back over a channel; the caller decides how long it
//! is willing to wait for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use nkit_core::error::RemoteError;
use tracing::{debug, info, warn};

use crate::cache::{CacheSnapshot, DirectoryCache};
use crate::directory::{DatabaseSummary, DirectorySource, fetch_directory, workspace_info};

/// How long the foreground waits for an unfinished refresh before moving on.
pub const FINISH_TIMEOUT: Duration = Duration::from_secs(5);

pub type RefreshOutcome = Result<Vec<DatabaseSummary>, RemoteError>;

/// Starts refreshes, never more than one at a time.
#[derive(Debug, Clone, Default)]
pub struct Refresher {
    in_progress: Arc<AtomicBool>,
}

/// Clears the in-progress flag when the worker exits, panics included.
struct InProgress(Arc<AtomicBool>);

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Refresher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Spawn a refresh unless one is already running.
    ///
    /// A successful, non-empty fetch is written to `cache` by the worker.
    pub fn start<S>(&self, source: S, cache: Option<DirectoryCache>) -> Option<PendingRefresh>
    where
        S: DirectorySource + Send + 'static,
    {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in progress");
            return None;
        }

        let (tx, rx) = mpsc::channel();
        let guard = InProgress(Arc::clone(&self.in_progress));
        let spawned = thread::Builder::new()
            .name("nkit-refresh".to_string())
            .spawn(move || {
                debug!("refreshing database cache in background");
                let outcome = fetch_directory(&source);
                match &outcome {
                    Ok(databases) if !databases.is_empty() => {
                        if let Some(cache) = &cache {
                            cache.store(&CacheSnapshot {
                                databases: databases.clone(),
                                workspace: Some(workspace_info(&source)),
                                timestamp: Utc::now(),
                            });
                        }
                        debug!(count = databases.len(), "background refresh completed");
                    }
                    Ok(_) => warn!("background refresh found no databases"),
                    Err(err) => warn!(error = %err, "background refresh failed"),
                }
                drop(guard);
                let _ = tx.send(outcome);
            });

        match spawned {
            Ok(_) => Some(PendingRefresh { rx }),
            Err(err) => {
                warn!(error = %err, "could not spawn refresh thread");
                None
            }
        }
    }
}

/// Handle on a running refresh.
#[derive(Debug)]
pub struct PendingRefresh {
    rx: Receiver<RefreshOutcome>,
}

impl PendingRefresh {
    /// Non-blocking check. `None` while the worker is still fetching.
    pub fn try_finish(&self) -> Option<RefreshOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout`; `None` if the worker did not finish in time.
    pub fn wait(self, timeout: Duration) -> Option<RefreshOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => {
                info!("background refresh still running; continuing without it");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
