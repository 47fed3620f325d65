//! Source files: naming, discovery, and lazy line reading.

use crate::io::compression::auto_detect_reader;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::fs::File;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Table a source file loads into: its file stem up to the first `_`.
///
/// `orders_2020-01.csv` and `orders.csv.gz` both map to `orders`.
///
/// # Errors
/// Fails when the file name yields an empty table name.
pub fn table_name_for(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let stem = file_name.split('.').next().unwrap_or_default();
    let table = stem.split('_').next().unwrap_or_default();
    if table.is_empty() {
        bail!("cannot derive a table name from {}", path.display());
    }
    Ok(table.to_string())
}

/// Split a comma-delimited list of input names, dropping blanks.
pub fn split_input_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve input names against `base`, expanding glob patterns.
///
/// Plain names are kept even when the file does not exist yet, so the missing
/// file surfaces as that source's own failure. Patterns expand to matching
/// files in sorted order; a pattern matching nothing is an error.
///
/// # Errors
/// Fails on an invalid pattern, unreadable glob entries, or a pattern with no matches.
pub fn resolve_inputs(base: Option<&Path>, names: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for name in names {
        let joined = match base {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        };
        if !name.contains(['*', '?', '[']) {
            out.push(joined);
            continue;
        }
        let pattern = joined.to_string_lossy().into_owned();
        let mut matched = Vec::new();
        for entry in glob(&pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            let path =
                entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
            if path.is_file() {
                matched.push(path);
            }
        }
        if matched.is_empty() {
            bail!("no files found matching pattern: {pattern}");
        }
        matched.sort();
        out.extend(matched);
    }
    Ok(out)
}

/// Lazy reader over the data lines of one source file.
///
/// Yields `(line_number, bytes)` with 1-based line numbers counted from the top
/// of the file, header included. Line terminators are stripped.
pub struct SourceLines {
    reader: Box<dyn BufRead>,
    line_no: u64,
    path: PathBuf,
}

impl SourceLines {
    /// Open `path`, decompressing if needed, and skip `skip_header_lines` lines.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or the header cannot be read.
    pub fn open(path: impl AsRef<Path>, skip_header_lines: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let reader = auto_detect_reader(f, &path)
            .with_context(|| format!("setup decompression for {}", path.display()))?;
        let mut lines = Self {
            reader,
            line_no: 0,
            path,
        };
        for _ in 0..skip_header_lines {
            if lines.next().transpose()?.is_none() {
                break;
            }
        }
        Ok(lines)
    }
}

impl Iterator for SourceLines {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                Some(Ok((self.line_no, buf)))
            }
            Err(e) => Some(Err(e).with_context(|| {
                format!("read line {} in {}", self.line_no + 1, self.path.display())
            })),
        }
    }
}
