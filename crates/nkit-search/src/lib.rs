#![forbid(unsafe_code)]
//! nkit-search library.
//!
//! Discovers every database the integration can see, keeps a local cache of
//! the result, ranks databases against a typed search term and refreshes the
//! cache in the background while the user is busy typing.
//!
//! # Conventions
//!
//! - **Errors**: typed errors (`RemoteError`, [`cache::CacheError`]).
//! - **Logging**: `tracing` macros; nothing here writes to stdout.

pub mod cache;
pub mod directory;
pub mod fuzzy;
pub mod refresh;

pub use cache::{CacheError, CacheSnapshot, DirectoryCache};
pub use directory::{
    Breakdown, DatabaseSummary, DirectorySource, LoadedDirectory, ParentContext, WorkspaceInfo,
    fetch_directory, load_or_fetch, workspace_info,
};
pub use fuzzy::{Match, partial_ratio, rank};
pub use refresh::{FINISH_TIMEOUT, PendingRefresh, RefreshOutcome, Refresher};
