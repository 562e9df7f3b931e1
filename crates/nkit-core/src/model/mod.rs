//! Typed views of remote objects plus the per-run reconciliation state.

pub mod category;
pub mod database;
pub mod delta;
pub mod record;
pub mod stats;

pub use category::{Category, CategoryMap, CategoryMapError, MembershipIndex};
pub use database::{ColumnTypeError, DatabaseObject, RemoteSchema, SelectOption};
pub use delta::TagDelta;
pub use record::{PropertyValue, Record, RichText};
pub use stats::RunStatistics;
