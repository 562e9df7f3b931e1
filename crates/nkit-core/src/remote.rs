//! Operations the reconciliation engine needs from the remote database
//! service. [`crate::notion::NotionClient`] is the HTTP implementation; tests
//! substitute in-memory fakes.

use serde::Deserialize;

use crate::error::RemoteError;
use crate::model::{DatabaseObject, Record, SelectOption};

/// Maximum page size the query endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One batch of a paginated query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Vec<Record>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

pub trait RemoteDatabase {
    /// Read the database object, including its property schema.
    fn retrieve_database(&self, database_id: &str) -> Result<DatabaseObject, RemoteError>;

    /// Replace the option list of the multi-select `column`.
    fn update_tag_options(
        &self,
        database_id: &str,
        column: &str,
        options: &[SelectOption],
    ) -> Result<(), RemoteError>;

    /// Fetch one batch of pages starting at `cursor`.
    fn query(
        &self,
        database_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<QueryPage, RemoteError>;

    /// Replace the tags in `column` of one page.
    fn update_page_tags(
        &self,
        page_id: &str,
        column: &str,
        tags: &[String],
    ) -> Result<(), RemoteError>;
}

impl<T: RemoteDatabase + ?Sized> RemoteDatabase for &T {
    fn retrieve_database(&self, database_id: &str) -> Result<DatabaseObject, RemoteError> {
        (**self).retrieve_database(database_id)
    }

    fn update_tag_options(
        &self,
        database_id: &str,
        column: &str,
        options: &[SelectOption],
    ) -> Result<(), RemoteError> {
        (**self).update_tag_options(database_id, column, options)
    }

    fn query(
        &self,
        database_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<QueryPage, RemoteError> {
        (**self).query(database_id, page_size, cursor)
    }

    fn update_page_tags(
        &self,
        page_id: &str,
        column: &str,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        (**self).update_page_tags(page_id, column, tags)
    }
}
