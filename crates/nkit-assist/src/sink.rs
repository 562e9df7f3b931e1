use nkit_core::error::RemoteError;
use nkit_core::notion::NotionClient;
use nkit_core::page::PageDraft;

/// Where new pages go.
pub trait PageSink {
    /// Create a page titled `title` with `content` as paragraphs and return
    /// its URL.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the database cannot be read or the page
    /// cannot be created.
    fn create_page(&self, database_id: &str, title: &str, content: &str)
    -> Result<String, RemoteError>;
}

impl PageSink for NotionClient {
    fn create_page(
        &self,
        database_id: &str,
        title: &str,
        content: &str,
    ) -> Result<String, RemoteError> {
        let database = self.database(database_id)?;
        let draft = PageDraft::new(database_id, title, content);
        let created = Self::create_page(self, &draft, database.title_property())?;
        Ok(created.url)
    }
}

impl<T: PageSink + ?Sized> PageSink for &T {
    fn create_page(
        &self,
        database_id: &str,
        title: &str,
        content: &str,
    ) -> Result<String, RemoteError> {
        (**self).create_page(database_id, title, content)
    }
}
