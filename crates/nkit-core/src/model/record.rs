//! Database pages as returned by a query, with typed property values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A rich-text fragment. Only the plain text is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// A chosen select or multi-select value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectValue {
    pub name: String,
}

/// Value of one page property, tagged by the service's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectValue>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectValue>,
    },
    #[serde(other)]
    Other,
}

impl PropertyValue {
    /// Identifier text for the recognized shapes: first title or rich-text
    /// fragment, or the select option name, taken verbatim. Empty text does
    /// not count.
    #[must_use]
    pub fn identifier_text(&self) -> Option<&str> {
        let text = match self {
            Self::Title { title: fragments } | Self::RichText { rich_text: fragments } => {
                fragments.first().map(|t| t.plain_text.as_str())
            }
            Self::Select { select } => select.as_ref().map(|s| s.name.as_str()),
            Self::MultiSelect { .. } | Self::Other => None,
        }?;
        (!text.is_empty()).then_some(text)
    }
}

/// A page of the reconciled database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Record {
    /// Resolve the member identifier by trying `candidates` in order.
    ///
    /// The first property that is present and holds a non-empty value of a
    /// recognized shape wins, even if later candidates are populated too.
    #[must_use]
    pub fn member_identifier<'a>(&'a self, candidates: &[String]) -> Option<&'a str> {
        candidates
            .iter()
            .filter_map(|name| self.properties.get(name))
            .find_map(PropertyValue::identifier_text)
    }

    /// Current tags in `column`; empty when absent or not a multi-select.
    #[must_use]
    pub fn tags(&self, column: &str) -> Vec<String> {
        match self.properties.get(column) {
            Some(PropertyValue::MultiSelect { multi_select }) => {
                multi_select.iter().map(|v| v.name.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}
