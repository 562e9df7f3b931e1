//! Tag reconciliation: grow the tag column schema to cover every category,
//! fetch every record, then rewrite only the records whose tag set differs
//! from `preserved ∪ categories`.
//!
//! A run is strictly sequential. All records are fetched before the first
//! write, so writes are based on that snapshot. Schema and fetch failures
//! abort the run; a failed record write is recorded and the run continues.

pub mod engine;
pub mod fetch;
pub mod schema;

pub use engine::{ReconcileOptions, Reconciler, RunAborted};
pub use fetch::fetch_all;
pub use schema::{PALETTE, SchemaPlan, plan_schema};

use crate::error::{ErrorCode, RemoteError};
use crate::model::ColumnTypeError;

/// Fatal reconciliation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to fetch database {database_id}: {source}")]
    SchemaFetch {
        database_id: String,
        source: RemoteError,
    },

    #[error(transparent)]
    ColumnType(#[from] ColumnTypeError),

    #[error("failed to update database schema: {source}")]
    SchemaUpdate { source: RemoteError },

    #[error("failed to query database (batch {batch}): {source}")]
    Query { batch: usize, source: RemoteError },
}

impl ReconcileError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SchemaFetch { source, .. }
            | Self::SchemaUpdate { source }
            | Self::Query { source, .. } => source.code(),
            Self::ColumnType(_) => ErrorCode::ColumnTypeMismatch,
        }
    }
}
