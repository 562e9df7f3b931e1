use tracing::{debug, info, instrument};

use super::ReconcileError;
use crate::error::RemoteError;
use crate::model::Record;
use crate::rate_limit::RateLimiter;
use crate::remote::{MAX_PAGE_SIZE, RemoteDatabase};

/// Fetch every record of a database, following continuation cursors.
///
/// Each query is paced by `limiter`. Any failed batch aborts the whole fetch.
///
/// # Errors
///
/// Returns [`ReconcileError::Query`] for a failed batch, or when the service
/// reports more data without a cursor to continue from.
#[instrument(skip(remote, limiter))]
pub fn fetch_all<R: RemoteDatabase>(
    remote: &R,
    limiter: &mut RateLimiter,
    database_id: &str,
    page_size_hint: u32,
) -> Result<Vec<Record>, ReconcileError> {
    let page_size = page_size_hint.clamp(1, MAX_PAGE_SIZE);
    info!(page_size, "fetching all pages from database");

    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut batch = 0_usize;

    loop {
        batch += 1;
        limiter.wait_if_needed();

        let page = remote
            .query(database_id, page_size, cursor.as_deref())
            .map_err(|source| ReconcileError::Query { batch, source })?;

        let fetched = page.results.len();
        records.extend(page.results);
        debug!(batch, fetched, total = records.len(), "fetched batch");

        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                return Err(ReconcileError::Query {
                    batch,
                    source: RemoteError::Protocol(
                        "has_more is true but next_cursor is missing".to_string(),
                    ),
                });
            }
        }
    }

    info!(batches = batch, total = records.len(), "fetch complete");
    Ok(records)
}
