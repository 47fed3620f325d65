//! In-memory stand-ins for the pipeline's collaborators.
//!
//! These make it possible to run a full ingestion without a schema service or a
//! warehouse:
//!
//! - [`MemorySchemaStore`]: table schemas held in a map
//! - [`MemorySink`]: destinations and appended records held in a map
//! - [`FixedClock`]: a clock that always returns the same instant
//! - [`SourceDir`]: a temporary directory to write source files into
//!
//! ```no_run
//! use ingestbeam::testing::*;
//! use ingestbeam::{FieldSchema, Ingestor};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = FieldSchema::new([("id", "INTEGER"), ("name", "STRING")])?;
//! let store = MemorySchemaStore::new().with_table("users", schema);
//! let sink = Arc::new(MemorySink::new());
//!
//! let dir = SourceDir::new()?;
//! let path = dir.write("users.csv", "id,name\n1,Alice\n")?;
//!
//! let ingestor = Ingestor::new(store, Arc::clone(&sink), "rawdata")
//!     .with_clock(Arc::new(FixedClock(1_700_000_000)));
//! ingestor.ingest_source(&path)?;
//! assert_eq!(sink.records("rawdata.users").len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::enrich::Clock;
use crate::project::OutputSchema;
use crate::record::NormalizedRecord;
use crate::schema::FieldSchema;
use crate::sink::{Destination, RecordSink};
use crate::store::SchemaStore;
use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Schema store backed by a map of table name to schema.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaStore {
    tables: IndexMap<String, FieldSchema>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, schema: FieldSchema) -> Self {
        self.tables.insert(table.into(), schema);
        self
    }
}

impl SchemaStore for MemorySchemaStore {
    fn fetch_schema(&self, table: &str) -> Result<Option<FieldSchema>> {
        Ok(self.tables.get(table).cloned())
    }
}

#[derive(Debug, Default)]
struct Table {
    schema: OutputSchema,
    records: Vec<NormalizedRecord>,
    appends: usize,
}

/// Sink that keeps everything in memory, keyed by `dataset.table`.
///
/// A destination can be made to reject appends with [`MemorySink::fail_appends_to`].
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, Table>>,
    failing: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append to `destination` (as `dataset.table`) fail.
    pub fn fail_appends_to(&self, destination: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(destination.into());
        }
    }

    /// Records appended to `destination` so far, in order.
    pub fn records(&self, destination: &str) -> Vec<NormalizedRecord> {
        self.with_table(destination, |t| t.records.clone())
            .unwrap_or_default()
    }

    /// The schema `destination` was created with.
    pub fn schema(&self, destination: &str) -> Option<OutputSchema> {
        self.with_table(destination, |t| t.schema.clone())
    }

    /// How many append calls `destination` received.
    pub fn append_calls(&self, destination: &str) -> usize {
        self.with_table(destination, |t| t.appends).unwrap_or(0)
    }

    /// Names of all created destinations, sorted.
    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn with_table<T>(&self, destination: &str, f: impl FnOnce(&Table) -> T) -> Option<T> {
        let tables = self.tables.lock().ok()?;
        tables.get(destination).map(f)
    }
}

impl RecordSink for MemorySink {
    fn ensure_destination(&self, dest: &Destination, schema: &OutputSchema) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("memory sink poisoned"))?;
        let table = tables.entry(dest.to_string()).or_insert_with(|| Table {
            schema: schema.clone(),
            ..Table::default()
        });
        if table.schema != *schema {
            bail!("destination {dest} exists with a different schema");
        }
        Ok(())
    }

    fn append(&self, dest: &Destination, records: &[NormalizedRecord]) -> Result<usize> {
        let key = dest.to_string();
        let failing = self
            .failing
            .lock()
            .map_err(|_| anyhow!("memory sink poisoned"))?
            .contains(&key);
        if failing {
            bail!("append to {key} rejected");
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("memory sink poisoned"))?;
        let table = tables
            .get_mut(&key)
            .ok_or_else(|| anyhow!("destination {key} was not prepared"))?;
        table.records.extend_from_slice(records);
        table.appends += 1;
        Ok(records.len())
    }
}

/// A clock stuck at the given epoch second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.0
    }
}

/// A temporary directory for source files, removed on drop.
pub struct SourceDir {
    dir: TempDir,
}

impl SourceDir {
    /// # Errors
    /// Fails if the directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the directory and return its path.
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Like [`SourceDir::write`], gzip-compressing the contents.
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    #[cfg(feature = "compression-gzip")]
    pub fn write_gz(&self, name: &str, contents: impl AsRef<[u8]>) -> std::io::Result<PathBuf> {
        use flate2::{Compression, write::GzEncoder};
        use std::io::Write;

        let path = self.dir.path().join(name);
        let mut enc = GzEncoder::new(fs::File::create(&path)?, Compression::default());
        enc.write_all(contents.as_ref())?;
        enc.finish()?;
        Ok(path)
    }
}
