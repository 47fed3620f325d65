//! JSON Lines sink.
//!
//! Each destination becomes two files under the sink's root directory:
//! - `<dataset>.<table>.schema.json` - the projected schema, written once
//! - `<dataset>.<table>.jsonl` - one compact JSON object per record, appended

use crate::project::OutputSchema;
use crate::record::NormalizedRecord;
use crate::sink::{Destination, RecordSink};
use anyhow::{Context, Result, bail};
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes destinations as JSONL files in a directory.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    root: PathBuf,
}

impl JsonlSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn data_path(&self, dest: &Destination) -> PathBuf {
        self.root.join(format!("{dest}.jsonl"))
    }

    pub fn schema_path(&self, dest: &Destination) -> PathBuf {
        self.root.join(format!("{dest}.schema.json"))
    }
}

impl RecordSink for JsonlSink {
    fn ensure_destination(&self, dest: &Destination, schema: &OutputSchema) -> Result<()> {
        create_dir_all(&self.root).with_context(|| format!("mkdir -p {}", self.root.display()))?;
        let path = self.schema_path(dest);
        if path.exists() {
            let existing = read_schema(&path)?;
            if existing != *schema {
                bail!("destination {dest} exists with a different schema");
            }
            return Ok(());
        }
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, schema)
            .with_context(|| format!("write schema {}", path.display()))?;
        w.flush()?;
        Ok(())
    }

    fn append(&self, dest: &Destination, records: &[NormalizedRecord]) -> Result<usize> {
        let path = self.data_path(dest);
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {} for append", path.display()))?;
        let mut w = BufWriter::new(f);
        for (i, rec) in records.iter().enumerate() {
            serde_json::to_writer(&mut w, rec)
                .with_context(|| format!("serialize record #{} to {}", i, path.display()))?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(records.len())
    }
}

fn read_schema(path: &Path) -> Result<OutputSchema> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(f).with_context(|| format!("parse schema {}", path.display()))
}
