//! Schema lookup: the metadata collaborator that knows each table's fields.
//!
//! The pipeline only depends on the [`SchemaStore`] capability. A lookup
//! returning `Ok(None)` means "no such table", and like an `Err` it aborts the
//! affected source only.
//!
//! [`JsonSchemaStore`] reads table records from a JSON document shaped like the
//! entities of a key-value metadata store:
//!
//! ```json
//! {
//!   "orders": { "columns": { "id": "INTEGER", "placed": "TIMESTAMP" } },
//!   "users":  { "columns": "{\"id\": \"INTEGER\", \"name\": \"STRING\"}" }
//! }
//! ```
//!
//! `columns` may be an ordered JSON object or a string holding one; field order
//! is preserved either way.

use crate::schema::FieldSchema;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Fetches the field schema of a table.
pub trait SchemaStore: Send + Sync {
    /// Look up `table`; `Ok(None)` when it does not exist.
    fn fetch_schema(&self, table: &str) -> Result<Option<FieldSchema>>;
}

impl<S: SchemaStore + ?Sized> SchemaStore for std::sync::Arc<S> {
    fn fetch_schema(&self, table: &str) -> Result<Option<FieldSchema>> {
        (**self).fetch_schema(table)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TableEntity {
    columns: Columns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Columns {
    Encoded(String),
    Inline(IndexMap<String, String>),
}

/// Table schemas loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaStore {
    tables: IndexMap<String, TableEntity>,
}

impl JsonSchemaStore {
    /// Load the document at `path`.
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not have the documented shape.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("open {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse schema store {}", path.display()))
    }

    /// # Errors
    /// Fails if `json` does not have the documented shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tables: IndexMap<String, TableEntity> = serde_json::from_str(json)?;
        Ok(Self { tables })
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl SchemaStore for JsonSchemaStore {
    fn fetch_schema(&self, table: &str) -> Result<Option<FieldSchema>> {
        let Some(entity) = self.tables.get(table) else {
            return Ok(None);
        };
        let schema = match &entity.columns {
            Columns::Encoded(encoded) => FieldSchema::from_json_str(encoded),
            Columns::Inline(fields) => {
                FieldSchema::new(fields.iter().map(|(k, v)| (k.clone(), v.as_str())))
            }
        };
        schema
            .map(Some)
            .with_context(|| format!("parse schema for table {table}"))
    }
}
