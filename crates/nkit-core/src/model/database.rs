//! Database objects and the tag-column schema derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::RichText;

/// A selectable value of a multi-select column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectOption {
    /// A new option that the service has not assigned an id to yet.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: Some(color.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MultiSelectSchema {
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

/// Schema of one database property. Only multi-select carries a payload we use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub multi_select: Option<MultiSelectSchema>,
}

/// Where a database lives in the workspace tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentRef {
    #[serde(rename = "type")]
    pub kind: String,
}

/// A database as returned by retrieve and search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseObject {
    pub object: String,
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The tag column exists but is not a multi-select.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column '{column}' is a {found} property, not multi_select")]
pub struct ColumnTypeError {
    pub column: String,
    pub found: String,
}

impl DatabaseObject {
    /// Display title: the first title fragment, or a placeholder.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .first()
            .map(|t| t.plain_text.trim())
            .filter(|t| !t.is_empty())
            .map_or_else(|| "Untitled Database".to_string(), str::to_string)
    }

    /// Name of the property of type `title`, if the schema has one.
    #[must_use]
    pub fn title_property(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, schema)| schema.kind == "title")
            .map(|(name, _)| name.as_str())
    }

    /// Extract the tag-column schema.
    ///
    /// A missing column yields an empty schema that the first patch creates.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnTypeError`] when the column exists with another type.
    pub fn tag_schema(&self, column: &str) -> Result<RemoteSchema, ColumnTypeError> {
        match self.properties.get(column) {
            None => Ok(RemoteSchema {
                column: column.to_string(),
                exists: false,
                options: Vec::new(),
            }),
            Some(schema) if schema.kind == "multi_select" => Ok(RemoteSchema {
                column: column.to_string(),
                exists: true,
                options: schema.multi_select.clone().unwrap_or_default().options,
            }),
            Some(schema) => Err(ColumnTypeError {
                column: column.to_string(),
                found: schema.kind.clone(),
            }),
        }
    }
}

/// Allowed values of the tag column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSchema {
    pub column: String,
    pub exists: bool,
    pub options: Vec<SelectOption>,
}

impl RemoteSchema {
    #[must_use]
    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }
}
