//! Structured per-record diagnostics.
//!
//! Nothing the normalizer does to a record is silent: every substituted default
//! and every skipped line is described by a value in this module, carrying enough
//! context to reconstruct the decision without reading log output.
//!
//! - [`Diagnostic`] - one field fell back to its type's default
//! - [`SkipReason`] - why a whole line was rejected
//! - [`DiagnosticLog`] - accumulates both for a source, with JSON export

use crate::schema::FieldType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{fmt, io};

/// Placeholder written instead of the raw value of a sensitive field.
pub const REDACTED: &str = "<redacted>";

/// One field whose value was replaced by its type's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Field name
    pub field: String,
    /// Declared type, as written in the schema
    pub declared_type: String,
    /// Raw value as read (lossily decoded), or [`REDACTED`]
    pub raw_value: String,
    /// Text form of the default that was substituted
    pub fallback: String,
    /// Why coercion failed
    pub reason: String,
}

impl Diagnostic {
    pub fn new(field: &str, ty: &FieldType, raw_value: String, fallback: String, reason: String) -> Self {
        Self {
            field: field.to_string(),
            declared_type: ty.name().to_string(),
            raw_value,
            fallback,
            reason,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}: {}] {:?} -> {:?} ({})",
            self.field, self.declared_type, self.raw_value, self.fallback, self.reason
        )
    }
}

/// Why a raw line was skipped without producing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The line could not be decoded into fields at all.
    Undecodable { detail: String },
    /// Decoded field count differs from the schema's.
    FieldCountMismatch { found: usize, expected: usize },
    /// The record carries a field the schema does not declare.
    UnknownField { field: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Undecodable { detail } => write!(f, "line could not be decoded: {detail}"),
            SkipReason::FieldCountMismatch { found, expected } => {
                write!(f, "row has {found} elements instead of {expected}")
            }
            SkipReason::UnknownField { field } => write!(f, "field {field} is not in the schema"),
        }
    }
}

impl std::error::Error for SkipReason {}

/// A skipped line with its position in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number in the source file, header included
    pub line: u64,
    pub reason: SkipReason,
}

/// Diagnostics attached to one accepted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDiagnostics {
    pub line: u64,
    pub fields: Vec<Diagnostic>,
}

/// Collects skips and fallbacks for batch reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticLog {
    skipped: Vec<SkippedLine>,
    fallbacks: Vec<LineDiagnostics>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, line: u64, reason: SkipReason) {
        self.skipped.push(SkippedLine { line, reason });
    }

    /// Record the fallbacks of one line; empty lists are ignored.
    pub fn record_fallbacks(&mut self, line: u64, fields: Vec<Diagnostic>) {
        if !fields.is_empty() {
            self.fallbacks.push(LineDiagnostics { line, fields });
        }
    }

    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// Total number of substituted field values.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.iter().map(|l| l.fields.len()).sum()
    }

    pub fn skipped(&self) -> &[SkippedLine] {
        &self.skipped
    }

    pub fn fallbacks(&self) -> &[LineDiagnostics] {
        &self.fallbacks
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty() && self.fallbacks.is_empty()
    }

    /// Export as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write [`DiagnosticLog::to_json`] output to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiagnosticLog({} skipped, {} fallbacks)",
            self.skip_count(),
            self.fallback_count()
        )
    }
}
