//! Building new pages: title property and paragraph blocks.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::model::DatabaseObject;

/// A page to be created in a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDraft {
    pub database_id: String,
    pub title: String,
    pub content: String,
}

impl PageDraft {
    pub fn new(
        database_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Request body for page creation against `database`'s schema.
    ///
    /// Only the title property is set; databases without one get no
    /// properties at all.
    #[must_use]
    pub fn to_request(&self, title_property: Option<&str>) -> Value {
        let mut properties = Map::new();
        if let Some(name) = title_property {
            properties.insert(
                name.to_string(),
                json!({"title": [{"text": {"content": self.title}}]}),
            );
        }

        let mut body = json!({
            "parent": {"database_id": self.database_id},
            "properties": properties,
        });
        let children = paragraph_blocks(&self.content);
        if !children.is_empty() {
            body["children"] = Value::Array(children);
        }
        body
    }

    /// Convenience for callers holding the full database object.
    #[must_use]
    pub fn to_request_for(&self, database: &DatabaseObject) -> Value {
        self.to_request(database.title_property())
    }
}

/// Split text on blank lines into paragraph blocks, dropping empty ones.
#[must_use]
pub fn paragraph_blocks(content: &str) -> Vec<Value> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{"type": "text", "text": {"content": paragraph}}]
                }
            })
        })
        .collect()
}

/// The service's answer to a page creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    #[serde(default)]
    pub url: String,
}
