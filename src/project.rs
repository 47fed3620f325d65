//! Output schema projection.
//!
//! The destination table mirrors the source schema field for field, in the same
//! order, with the injected timestamp appended last.

use crate::enrich::RAW_TIMESTAMP_FIELD;
use crate::schema::{FieldSchema, FieldType};
use serde::{Deserialize, Serialize};

/// One column of the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
}

/// Ordered column list of the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSchema {
    pub fields: Vec<OutputField>,
}

impl OutputSchema {
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Describe the destination for `schema`.
///
/// Emits `(name, type, "Field {name}")` per field in insertion order, then
/// `("_RAWTIMESTAMP", TIMESTAMP, "Injected timestamp")`.
pub fn project(schema: &FieldSchema) -> OutputSchema {
    let mut fields: Vec<OutputField> = schema
        .iter()
        .map(|(name, ty)| OutputField {
            name: name.to_string(),
            field_type: ty.clone(),
            description: format!("Field {name}"),
        })
        .collect();
    fields.push(OutputField {
        name: RAW_TIMESTAMP_FIELD.to_string(),
        field_type: FieldType::Timestamp,
        description: "Injected timestamp".to_string(),
    });
    OutputSchema { fields }
}
