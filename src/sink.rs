//! The destination side: where normalized records go.
//!
//! A [`RecordSink`] must create a destination when it is absent and append to it
//! otherwise. The pipeline calls [`RecordSink::ensure_destination`] once per
//! source with the projected schema, then [`RecordSink::append`] once per batch.
//! Batches already appended stay in place if a later one fails.

use crate::project::OutputSchema;
use crate::record::NormalizedRecord;
use anyhow::Result;
use std::fmt;

/// A destination table, `dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub dataset: String,
    pub table: String,
}

impl Destination {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Accepts normalized records plus one schema description per destination.
pub trait RecordSink: Send + Sync {
    /// Create `dest` with `schema` if it does not exist yet.
    fn ensure_destination(&self, dest: &Destination, schema: &OutputSchema) -> Result<()>;

    /// Append `records` to `dest`, returning how many were written.
    fn append(&self, dest: &Destination, records: &[NormalizedRecord]) -> Result<usize>;
}

impl<S: RecordSink + ?Sized> RecordSink for std::sync::Arc<S> {
    fn ensure_destination(&self, dest: &Destination, schema: &OutputSchema) -> Result<()> {
        (**self).ensure_destination(dest, schema)
    }

    fn append(&self, dest: &Destination, records: &[NormalizedRecord]) -> Result<usize> {
        (**self).append(dest, records)
    }
}
