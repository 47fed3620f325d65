//! Declared field types and per-source field schemas.
//!
//! A [`FieldSchema`] is the insertion-ordered mapping from field name to
//! [`FieldType`] fetched once per source from a
//! [`SchemaStore`](crate::store::SchemaStore). Its key order doubles as the
//! [`ColumnList`] used by the codec, and as the field order of the projected
//! output schema.
//!
//! Schemas are immutable once built; share them across workers behind an `Arc`.

use crate::enrich::RAW_TIMESTAMP_FIELD;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordered list of column names for one source.
pub type ColumnList = Vec<String>;

/// The declared analytical type of a column.
///
/// Recognized names are matched case-insensitively. Anything else becomes
/// [`FieldType::Unknown`], which keeps the declared text so it can be echoed
/// back into the output schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    DateTime,
    Timestamp,
    Unknown(String),
}

impl FieldType {
    /// Every recognized type, in declaration order.
    pub const KNOWN: [FieldType; 5] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Float,
        FieldType::DateTime,
        FieldType::Timestamp,
    ];

    /// Canonical type name as written in schemas.
    pub fn name(&self) -> &str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::DateTime => "DATETIME",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Unknown(declared) => declared,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FieldType::Unknown(_))
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let found = FieldType::KNOWN
            .iter()
            .find(|known| known.name().eq_ignore_ascii_case(t))
            .cloned();
        Ok(found.unwrap_or_else(|| FieldType::Unknown(s.to_string())))
    }
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FieldType::from(s.as_str()))
    }
}

/// Insertion-ordered mapping from field name to declared type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: IndexMap<String, FieldType>,
}

impl FieldSchema {
    /// Build a schema from `(name, type)` pairs, keeping their order.
    ///
    /// # Errors
    /// Fails on duplicate names and on a field named `_RAWTIMESTAMP`, which is
    /// reserved for the ingestion timestamp.
    pub fn new<I, N, T>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<FieldType>,
    {
        let mut map = IndexMap::new();
        for (name, ty) in fields {
            let name = name.into();
            if name == RAW_TIMESTAMP_FIELD {
                bail!("field name {RAW_TIMESTAMP_FIELD} is reserved for the ingestion timestamp");
            }
            if map.insert(name.clone(), ty.into()).is_some() {
                bail!("duplicate field {name} in schema");
            }
        }
        Ok(Self { fields: map })
    }

    /// Parse a JSON object of `name -> type name`, preserving key order.
    ///
    /// # Errors
    /// Fails on malformed JSON, non-string type names, or the conditions of [`FieldSchema::new`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: IndexMap<String, String> =
            serde_json::from_str(json).context("parse field schema JSON")?;
        Self::new(raw.iter().map(|(k, v)| (k.clone(), FieldType::from(v.as_str()))))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The schema's keys as the column list used to decode source lines.
    pub fn columns(&self) -> ColumnList {
        self.fields.keys().cloned().collect()
    }
}

impl<'de> Deserialize<'de> for FieldSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, FieldType>::deserialize(deserializer)?;
        FieldSchema::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!(FieldType::from("INTEGER"), FieldType::Integer);
        assert_eq!(FieldType::from("timestamp"), FieldType::Timestamp);
        assert_eq!(FieldType::from(" Float "), FieldType::Float);
        assert_eq!(
            FieldType::from("GEOGRAPHY"),
            FieldType::Unknown("GEOGRAPHY".into())
        );
    }

    #[test]
    fn only_the_five_names_are_known() {
        assert!(FieldType::KNOWN.iter().all(FieldType::is_known));
        assert!(!FieldType::from("GEOGRAPHY").is_known());
    }

    #[test]
    fn json_keeps_insertion_order() {
        let schema = FieldSchema::from_json_str(r#"{"z": "STRING", "a": "INTEGER", "m": "FLOAT"}"#)
            .unwrap();
        assert_eq!(schema.columns(), vec!["z", "a", "m"]);
    }

    #[test]
    fn rejects_reserved_timestamp_name() {
        let err = FieldSchema::new([("_RAWTIMESTAMP", "TIMESTAMP")]).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }
}
