//! Record shapes flowing through a source: raw decoded lines and normalized output.

use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// A coerced, typed field value.
///
/// Serializes untagged, so a record renders as a flat JSON object
/// (`{"id": 42, "name": "Alice"}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    /// Seconds since the Unix epoch, UTC.
    Timestamp(i64),
}

impl FieldValue {
    /// Text form used when writing the value back into a delimited line.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Integer(v) | FieldValue::Timestamp(v) => Cow::Owned(v.to_string()),
            FieldValue::Float(v) => Cow::Owned(v.to_string()),
            FieldValue::String(s) => Cow::Borrowed(s),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) | FieldValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Gives the codec access to a record's fields as bytes, by column name.
pub trait FieldSource {
    /// Bytes for `name`, or `None` when the record lacks that field.
    fn field_bytes(&self, name: &str) -> Option<Cow<'_, [u8]>>;
}

/// One decoded line keyed by column name.
///
/// Values stay as raw bytes until the normalizer decodes them, so undecodable
/// input survives until the STRING coercion decides what to drop. Fields past
/// the end of the column list are kept in `overflow`; they count towards
/// [`RawRecord::len`] so over-long lines are still rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    fields: IndexMap<String, Vec<u8>>,
    overflow: Vec<Vec<u8>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs; handy in tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let mut r = Self::new();
        for (k, v) in pairs {
            r.insert(k, v.as_ref().to_vec());
        }
        r
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.fields.insert(name.into(), value);
    }

    pub fn push_overflow(&mut self, value: Vec<u8>) {
        self.overflow.push(value);
    }

    /// Number of parsed values, including overflow.
    pub fn len(&self) -> usize {
        self.fields.len() + self.overflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// Keyed fields in column order (overflow excluded).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn overflow(&self) -> &[Vec<u8>] {
        &self.overflow
    }
}

impl FieldSource for RawRecord {
    fn field_bytes(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.get(name).map(Cow::Borrowed)
    }
}

/// A fully coerced record, ready for the sink.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: IndexMap<String, FieldValue>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(n),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FieldSource for NormalizedRecord {
    fn field_bytes(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.get(name).map(|v| match v.render() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        })
    }
}
