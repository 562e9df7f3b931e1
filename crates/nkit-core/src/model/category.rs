//! Category membership: the caller-supplied `CategoryMap` and its inverted
//! `MembershipIndex`.
//!
//! Category files are YAML mappings of category name to a list of member
//! identifiers:
//!
//! ```yaml
//! Oncogene: [KRAS, MYC, EGFR]
//! Tumor Suppressor:
//!   - TP53
//!   - PTEN
//! ```
//!
//! File order is preserved; it decides which palette color a newly created
//! tag option receives.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};

use crate::error::ErrorCode;

/// Errors raised while loading a category file.
#[derive(Debug, thiserror::Error)]
pub enum CategoryMapError {
    #[error("failed to read category file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse category file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl CategoryMapError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::CategoryFileInvalid
    }
}

/// One category and its ordered, duplicate-free members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub members: Vec<String>,
}

/// Ordered mapping of unique category names to member identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    categories: Vec<Category>,
}

impl CategoryMap {
    /// Build a map from `(name, members)` pairs.
    ///
    /// A repeated category name merges into the first occurrence; repeated
    /// members keep their first position.
    pub fn from_pairs<I, N, M, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, M)>,
        N: Into<String>,
        M: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for (name, members) in pairs {
            map.insert(name.into(), members.into_iter().map(Into::into));
        }
        map
    }

    fn insert(&mut self, name: String, members: impl Iterator<Item = String>) {
        let index = match self.categories.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(Category {
                    name,
                    members: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        let category = &mut self.categories[index];
        for member in members {
            if !category.members.contains(&member) {
                category.members.push(member);
            }
        }
    }

    /// Load and parse a YAML category file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a mapping of
    /// names to string lists.
    pub fn load(path: &Path) -> Result<Self, CategoryMapError> {
        let content = std::fs::read_to_string(path).map_err(|source| CategoryMapError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML category document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a mapping of names to string
    /// lists, or repeats a category name.
    pub fn from_yaml(content: &str) -> Result<Self, CategoryMapError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Category names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Invert the map into member → categories.
    #[must_use]
    pub fn membership(&self) -> MembershipIndex {
        MembershipIndex::build(self)
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = CategoryMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of category name to a list of member identifiers")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(CategoryMap::default())
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = CategoryMap::default();
                while let Some((name, members)) =
                    access.next_entry::<String, Option<Vec<String>>>()?
                {
                    if map.contains(&name) {
                        return Err(de::Error::custom(format!(
                            "duplicate category '{name}'"
                        )));
                    }
                    map.insert(name, members.unwrap_or_default().into_iter());
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(CategoryMapVisitor)
    }
}

/// Member identifier → names of the categories it belongs to, in
/// `CategoryMap` order.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    by_member: HashMap<String, Vec<String>>,
    category_names: HashSet<String>,
}

impl MembershipIndex {
    fn build(map: &CategoryMap) -> Self {
        let mut by_member: HashMap<String, Vec<String>> = HashMap::new();
        for category in map.categories() {
            for member in &category.members {
                by_member
                    .entry(member.clone())
                    .or_default()
                    .push(category.name.clone());
            }
        }
        Self {
            by_member,
            category_names: map.names().map(str::to_string).collect(),
        }
    }

    /// Categories for a member; empty when the member is not listed anywhere.
    #[must_use]
    pub fn categories_of(&self, member: &str) -> &[String] {
        self.by_member.get(member).map_or(&[], Vec::as_slice)
    }

    /// True when `tag` names any category of the run.
    #[must_use]
    pub fn is_category(&self, tag: &str) -> bool {
        self.category_names.contains(tag)
    }

    /// Number of distinct members listed under at least one category.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.by_member.len()
    }
}
