//! In-memory `RemoteDatabase` shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use nkit_core::error::RemoteError;
use nkit_core::model::{DatabaseObject, Record, SelectOption};
use nkit_core::remote::{QueryPage, RemoteDatabase};
use serde_json::{Value, json};

pub const DB: &str = "db1";
pub const COLUMN: &str = "gene_sets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Retrieve,
    UpdateOptions(Vec<String>),
    Query { page_size: u32, cursor: Option<String> },
    UpdatePage { page_id: String, tags: Vec<String> },
}

#[derive(Debug)]
pub struct FakeRemote {
    column_type: String,
    options: RefCell<Vec<SelectOption>>,
    pages: RefCell<Vec<(String, String, Vec<String>)>>,
    batch_size: usize,
    pub calls: RefCell<Vec<Call>>,
    pub fail_retrieve: bool,
    pub fail_schema_update: bool,
    pub fail_query_batch: Option<usize>,
    pub drop_cursor_after: Option<usize>,
    pub fail_pages: HashSet<String>,
}

impl FakeRemote {
    /// Pages as `(id, gene_name, tags)`; queries return at most `batch_size`.
    pub fn new(pages: &[(&str, &str, &[&str])], options: &[&str], batch_size: usize) -> Self {
        Self {
            column_type: "multi_select".to_string(),
            options: RefCell::new(
                options
                    .iter()
                    .map(|name| SelectOption {
                        id: Some(format!("opt-{name}")),
                        name: (*name).to_string(),
                        color: Some("default".to_string()),
                    })
                    .collect(),
            ),
            pages: RefCell::new(
                pages
                    .iter()
                    .map(|(id, gene, tags)| {
                        (
                            (*id).to_string(),
                            (*gene).to_string(),
                            tags.iter().map(|t| (*t).to_string()).collect(),
                        )
                    })
                    .collect(),
            ),
            batch_size,
            calls: RefCell::new(Vec::new()),
            fail_retrieve: false,
            fail_schema_update: false,
            fail_query_batch: None,
            drop_cursor_after: None,
            fail_pages: HashSet::new(),
        }
    }

    pub fn with_column_type(mut self, kind: &str) -> Self {
        self.column_type = kind.to_string();
        self
    }

    pub fn option_names(&self) -> Vec<String> {
        self.options.borrow().iter().map(|o| o.name.clone()).collect()
    }

    pub fn option_colors(&self) -> BTreeMap<String, Option<String>> {
        self.options
            .borrow()
            .iter()
            .map(|o| (o.name.clone(), o.color.clone()))
            .collect()
    }

    pub fn tags_of(&self, page_id: &str) -> Vec<String> {
        self.pages
            .borrow()
            .iter()
            .find(|(id, _, _)| id == page_id)
            .map(|(_, _, tags)| tags.clone())
            .unwrap_or_default()
    }

    pub fn page_writes(&self) -> usize {
        self.count(|c| matches!(c, Call::UpdatePage { .. }))
    }

    pub fn schema_writes(&self) -> usize {
        self.count(|c| matches!(c, Call::UpdateOptions(_)))
    }

    pub fn queries(&self) -> usize {
        self.count(|c| matches!(c, Call::Query { .. }))
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record_json(id: &str, gene: &str, tags: &[String]) -> Value {
        let mut properties = json!({
            COLUMN: {
                "type": "multi_select",
                "multi_select": tags.iter().map(|t| json!({"name": t})).collect::<Vec<_>>(),
            }
        });
        if !gene.is_empty() {
            properties["gene_name"] = json!({
                "type": "title",
                "title": [{"plain_text": gene}],
            });
        }
        json!({"object": "page", "id": id, "properties": properties})
    }
}

impl RemoteDatabase for FakeRemote {
    fn retrieve_database(&self, _database_id: &str) -> Result<DatabaseObject, RemoteError> {
        self.calls.borrow_mut().push(Call::Retrieve);
        if self.fail_retrieve {
            return Err(RemoteError::Status {
                status: 404,
                body: r#"{"object":"error","code":"object_not_found"}"#.to_string(),
            });
        }
        let value = json!({
            "object": "database",
            "id": DB,
            "title": [{"plain_text": "Genes"}],
            "properties": {
                "gene_name": {"type": "title"},
                COLUMN: {
                    "type": self.column_type,
                    "multi_select": {"options": *self.options.borrow()},
                },
            },
        });
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn update_tag_options(
        &self,
        _database_id: &str,
        _column: &str,
        options: &[SelectOption],
    ) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(Call::UpdateOptions(
            options.iter().map(|o| o.name.clone()).collect(),
        ));
        if self.fail_schema_update {
            return Err(RemoteError::Status {
                status: 400,
                body: "validation_error".to_string(),
            });
        }
        *self.options.borrow_mut() = options.to_vec();
        Ok(())
    }

    fn query(
        &self,
        _database_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<QueryPage, RemoteError> {
        self.calls.borrow_mut().push(Call::Query {
            page_size,
            cursor: cursor.map(str::to_string),
        });
        let batch = self.queries();
        if self.fail_query_batch == Some(batch) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }

        let start: usize = cursor.map_or(0, |c| c.parse().unwrap_or(0));
        let pages = self.pages.borrow();
        let end = (start + self.batch_size).min(pages.len());
        let results = pages[start..end]
            .iter()
            .map(|(id, gene, tags)| {
                serde_json::from_value::<Record>(Self::record_json(id, gene, tags))
                    .map_err(|e| RemoteError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = end < pages.len();
        let next_cursor = if has_more && self.drop_cursor_after != Some(batch) {
            Some(end.to_string())
        } else {
            None
        };
        Ok(QueryPage {
            results,
            has_more,
            next_cursor,
        })
    }

    fn update_page_tags(
        &self,
        page_id: &str,
        _column: &str,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(Call::UpdatePage {
            page_id: page_id.to_string(),
            tags: tags.to_vec(),
        });
        if self.fail_pages.contains(page_id) {
            return Err(RemoteError::Status {
                status: 409,
                body: "conflict_error".to_string(),
            });
        }
        if let Some(page) = self
            .pages
            .borrow_mut()
            .iter_mut()
            .find(|(id, _, _)| id == page_id)
        {
            page.2 = tags.to_vec();
        }
        Ok(())
    }
}
