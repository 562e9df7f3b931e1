use tracing::{debug, info, instrument, warn};

use super::{ReconcileError, fetch_all, plan_schema};
use crate::config::TagsConfig;
use crate::model::{CategoryMap, MembershipIndex, Record, RunStatistics, TagDelta};
use crate::rate_limit::RateLimiter;
use crate::remote::RemoteDatabase;

/// Inputs of one reconciliation run besides the category map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub database_id: String,
    /// Multi-select column kept in sync with category membership.
    pub column: String,
    /// Requested query page size; clamped to the service maximum.
    pub page_size: u32,
    /// Property names tried, in order, to resolve a record's member identifier.
    pub identifier_fields: Vec<String>,
    /// Compute and report changes without writing anything.
    pub dry_run: bool,
}

impl ReconcileOptions {
    pub fn from_config(database_id: impl Into<String>, tags: &TagsConfig) -> Self {
        Self {
            database_id: database_id.into(),
            column: tags.column.clone(),
            page_size: tags.page_size,
            identifier_fields: tags.identifier_fields.clone(),
            dry_run: false,
        }
    }
}

/// A run that stopped on a fatal error.
///
/// Schema-stage aborts still carry the (partial) summary; fetch aborts do not
/// because reconciliation never started.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunAborted {
    pub error: ReconcileError,
    pub summary: Option<RunStatistics>,
}

/// Drives a reconciliation run against one remote database.
#[derive(Debug)]
pub struct Reconciler<R> {
    remote: R,
    limiter: RateLimiter,
    options: ReconcileOptions,
}

impl<R: RemoteDatabase> Reconciler<R> {
    pub const fn new(remote: R, limiter: RateLimiter, options: ReconcileOptions) -> Self {
        Self {
            remote,
            limiter,
            options,
        }
    }

    /// Bring the remote schema and every record's tags in line with `categories`.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] when the schema cannot be read or updated, or a
    /// query batch fails. Individual record write failures are not errors;
    /// they are listed in the returned statistics.
    pub fn run(&mut self, categories: &CategoryMap) -> Result<RunStatistics, RunAborted> {
        let index = categories.membership();
        info!(
            categories = categories.len(),
            members = index.member_count(),
            dry_run = self.options.dry_run,
            "prepared category membership"
        );

        let mut stats = RunStatistics::new(self.options.dry_run);

        if let Err(error) = self.reconcile_schema(categories, &mut stats) {
            return Err(RunAborted {
                error,
                summary: Some(stats),
            });
        }

        let records = fetch_all(
            &self.remote,
            &mut self.limiter,
            &self.options.database_id,
            self.options.page_size,
        )
        .map_err(|error| RunAborted {
            error,
            summary: None,
        })?;

        self.apply(&records, &index, &mut stats);
        info!(
            updated = stats.updated,
            unchanged = stats.unchanged,
            failed = stats.failed,
            "reconciliation finished"
        );
        Ok(stats)
    }

    #[instrument(skip_all, fields(column = %self.options.column))]
    fn reconcile_schema(
        &mut self,
        categories: &CategoryMap,
        stats: &mut RunStatistics,
    ) -> Result<(), ReconcileError> {
        let database_id = &self.options.database_id;

        self.limiter.wait_if_needed();
        let database = self
            .remote
            .retrieve_database(database_id)
            .map_err(|source| ReconcileError::SchemaFetch {
                database_id: database_id.clone(),
                source,
            })?;

        let schema = database.tag_schema(&self.options.column)?;
        if !schema.exists {
            info!("tag column does not exist yet; it will be created");
        }

        let plan = plan_schema(&schema, categories);
        stats.schema_options_added = plan.new_names().map(str::to_string).collect();

        if plan.is_noop() {
            info!("all category tags already exist in schema");
            return Ok(());
        }
        if self.options.dry_run {
            info!(new = ?stats.schema_options_added, "dry run: schema left unchanged");
            return Ok(());
        }

        info!(new = ?stats.schema_options_added, "adding category tags to schema");
        self.limiter.wait_if_needed();
        self.remote
            .update_tag_options(database_id, &self.options.column, &plan.options)
            .map_err(|source| ReconcileError::SchemaUpdate { source })
    }

    fn apply(&mut self, records: &[Record], index: &MembershipIndex, stats: &mut RunStatistics) {
        let total = records.len();
        stats.records_seen = total;
        info!(total, "processing records");

        for (i, record) in records.iter().enumerate() {
            let position = i + 1;

            let Some(member) = record.member_identifier(&self.options.identifier_fields) else {
                stats.without_identifier += 1;
                debug!(page_id = %record.id, "no identifier field resolved; skipping");
                continue;
            };
            stats.with_identifier += 1;

            let delta = TagDelta::compute(record.tags(&self.options.column), member, index);
            if !delta.target.is_empty() {
                stats.members_with_categories += 1;
            }

            if delta.is_unchanged() {
                stats.unchanged += 1;
                if position % 100 == 0 {
                    info!("[{position}/{total}] processed");
                }
                continue;
            }

            let added = delta.added();
            let removed = delta.removed();

            if !self.options.dry_run {
                self.limiter.wait_if_needed();
                if let Err(err) =
                    self.remote
                        .update_page_tags(&record.id, &self.options.column, &delta.resulting)
                {
                    let message = format!("Failed to update page {}: {err}", record.id);
                    warn!("[{position}/{total}] {message}");
                    stats.record_error(message);
                    continue;
                }
            }

            stats.updated += 1;
            stats.tags_added += added.len();
            stats.tags_removed += removed.len();
            info!(
                "[{position}/{total}] {member}: +{added:?} -{removed:?}{}",
                if self.options.dry_run { " (dry run)" } else { "" }
            );
        }
    }
}
