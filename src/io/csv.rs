//! Delimited-text sink.
//!
//! Writes each destination as `<dataset>.<table>.csv` under a root directory,
//! using the same [`RecordCodec`] rules as the sources. The header row is the
//! projected schema's field names and is written only when the file is created.

use crate::codec::RecordCodec;
use crate::project::OutputSchema;
use crate::record::NormalizedRecord;
use crate::sink::{Destination, RecordSink};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Writes destinations as delimited text files in a directory.
#[derive(Debug)]
pub struct CsvSink {
    root: PathBuf,
    codecs: Mutex<HashMap<Destination, RecordCodec>>,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            codecs: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_path(&self, dest: &Destination) -> PathBuf {
        self.root.join(format!("{dest}.csv"))
    }
}

impl RecordSink for CsvSink {
    fn ensure_destination(&self, dest: &Destination, schema: &OutputSchema) -> Result<()> {
        create_dir_all(&self.root).with_context(|| format!("mkdir -p {}", self.root.display()))?;
        let codec = RecordCodec::new(schema.names());
        let header = codec.encode_header()?;
        let path = self.data_path(dest);

        if path.exists() {
            let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
            let mut first = String::new();
            BufReader::new(f)
                .read_line(&mut first)
                .with_context(|| format!("read header of {}", path.display()))?;
            if first.trim_end_matches(['\r', '\n']) != header {
                bail!("destination {dest} exists with a different header");
            }
        } else {
            let mut f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
            writeln!(f, "{header}")?;
        }

        self.codecs
            .lock()
            .map_err(|_| anyhow!("csv sink state poisoned"))?
            .insert(dest.clone(), codec);
        Ok(())
    }

    fn append(&self, dest: &Destination, records: &[NormalizedRecord]) -> Result<usize> {
        let codec = self
            .codecs
            .lock()
            .map_err(|_| anyhow!("csv sink state poisoned"))?
            .get(dest)
            .cloned()
            .with_context(|| format!("destination {dest} was not prepared"))?;

        let path = self.data_path(dest);
        let f = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("open {} for append", path.display()))?;
        let mut w = BufWriter::new(f);
        for (i, rec) in records.iter().enumerate() {
            let line = codec
                .encode(rec)
                .with_context(|| format!("encode record #{} for {}", i, path.display()))?;
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(records.len())
    }
}
