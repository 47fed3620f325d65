//! Ingestion configuration.
//!
//! Configuration is plain serde data with defaults for every field, so a JSON
//! file only needs to mention what differs:
//!
//! ```json
//! {
//!   "input_dir": "landing",
//!   "input_files": "orders_2024-01.csv,users.csv.gz",
//!   "dataset": "rawdata",
//!   "exec": { "mode": "parallel", "threads": 4 },
//!   "normalize": { "encoding": "latin1", "redact_fields": ["ssn"] }
//! }
//! ```
//!
//! `input_files` accepts either a comma-delimited string or an array; entries may
//! be glob patterns.

use crate::coerce::{CoercionRules, DEFAULT_TIME_FORMAT};
use crate::io::source::{resolve_inputs, split_input_list};
use crate::runner::ExecMode;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the coercion table and its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Text encoding label for STRING fields (WHATWG labels, e.g. `utf-8`, `latin1`).
    pub encoding: String,
    /// Primary time format; the two fallback formats are always tried after it.
    pub time_format: String,
    /// Fields whose raw values are redacted in diagnostics.
    pub redact_fields: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            redact_fields: Vec::new(),
        }
    }
}

impl NormalizeConfig {
    /// Build the coercion rules this config describes.
    ///
    /// # Errors
    /// Fails on an unknown encoding label.
    pub fn rules(&self) -> Result<CoercionRules> {
        CoercionRules::from_label(&self.encoding, &self.time_format)
    }
}

/// Top-level settings for an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory the input names are relative to.
    pub input_dir: Option<PathBuf>,
    /// Input file names or glob patterns.
    #[serde(deserialize_with = "comma_or_list")]
    pub input_files: Vec<String>,
    /// Dataset all destination tables live in.
    pub dataset: String,
    /// Leading lines of every source to ignore.
    pub skip_header_lines: usize,
    /// Lines per normalization batch and sink append.
    pub batch_size: usize,
    pub exec: ExecMode,
    pub normalize: NormalizeConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            input_files: Vec::new(),
            dataset: "rawdata".to_string(),
            skip_header_lines: 1,
            batch_size: 1000,
            exec: ExecMode::default(),
            normalize: NormalizeConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or parsed, or does not pass [`IngestConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("open {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load config {}", path.display()))
    }

    /// # Errors
    /// Fails if `json` does not parse or does not pass [`IngestConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("parse config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    /// Fails on an empty dataset, a zero batch size, zero threads, or an unknown encoding.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.dataset.trim().is_empty(), "dataset must not be empty");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        if let ExecMode::Parallel { threads: Some(t) } = self.exec {
            ensure!(t > 0, "threads must be at least 1");
        }
        self.normalize.rules()?;
        Ok(())
    }

    /// Input paths, joined with `input_dir` and glob-expanded.
    ///
    /// # Errors
    /// See [`resolve_inputs`].
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>> {
        resolve_inputs(self.input_dir.as_deref(), &self.input_files)
    }
}

fn comma_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        Joined(String),
        List(Vec<String>),
    }
    Ok(match Names::deserialize(deserializer)? {
        Names::Joined(s) => split_input_list(&s),
        Names::List(v) => v.into_iter().flat_map(|s| split_input_list(&s)).collect(),
    })
}
