//! # Ingestbeam
//!
//! A **schema-driven normalizer** for delimited text records. Each source file is
//! matched to a table schema, every line is split into fields, each field is
//! coerced to its declared type, an ingestion timestamp is stamped on, and the
//! result is handed to a sink for a columnar bulk load.
//!
//! ## Key Features
//!
//! - **Typed coercion** - `STRING`, `INTEGER`, `FLOAT`, `DATETIME` and `TIMESTAMP`
//!   with a default for every type instead of a failed row
//! - **Skip, don't crash** - lines with the wrong field count are reported and skipped
//! - **Diagnostics as data** - every fallback and skip is logged and collected per source
//! - **Ordered schemas** - the destination mirrors the source field order, plus `_RAWTIMESTAMP`
//! - **Sequential and parallel execution** - batches can be normalized on a rayon pool
//! - **Compressed sources** - `.gz` and `.zst` inputs are read transparently
//! - **Pluggable collaborators** - [`SchemaStore`] and [`RecordSink`] traits with
//!   JSON and file-backed implementations included
//!
//! ## Quick Start
//!
//! ```no_run
//! use ingestbeam::*;
//! use ingestbeam::io::jsonl::JsonlSink;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let store = JsonSchemaStore::from_file("schemas.json")?;
//! let sink = JsonlSink::new("out");
//! let cfg = IngestConfig::from_json_file("ingest.json")?;
//!
//! let ingestor = Ingestor::from_config(&cfg, store, sink)?;
//! for result in ingestor.run_all(&cfg.resolve_inputs()?) {
//!     if let Ok(report) = result.result {
//!         println!("{}: {} written, {}", report.destination, report.records_written, report.diagnostics);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## The Per-Line Path
//!
//! 1. [`RecordCodec::decode`] splits the line and keys values by schema column
//! 2. [`Normalizer::normalize`] checks the field count, then coerces each field
//!    through [`CoercionRules::coerce`]
//! 3. [`TimestampEnricher::enrich`] adds `_RAWTIMESTAMP`
//! 4. The batch goes to [`RecordSink::append`]
//!
//! A line is either normalized (possibly with [`Diagnostic`]s for fields that fell
//! back to defaults) or skipped with a [`SkipReason`]. Neither case is an error.
//!
//! ## Module Overview
//!
//! - [`schema`] - field types and ordered table schemas
//! - [`record`] - raw and normalized records
//! - [`codec`] - delimited line encode/decode
//! - [`coerce`] - the per-type coercion table
//! - [`normalize`] - per-line normalization and skip decisions
//! - [`enrich`] / [`project`] - the injected timestamp and the output schema
//! - [`store`] / [`sink`] - schema lookup and record destinations
//! - [`io`] - source reading, compression and file sinks
//! - [`runner`] - batching and execution over many sources
//! - [`config`] / [`logging`] - settings and subscriber setup
//! - [`testing`] - in-memory collaborators for tests

pub mod codec;
pub mod coerce;
pub mod config;
pub mod diagnostics;
pub mod enrich;
pub mod io;
pub mod logging;
pub mod normalize;
pub mod project;
pub mod record;
pub mod runner;
pub mod schema;
pub mod sink;
pub mod store;
pub mod testing;

pub use codec::RecordCodec;
pub use coerce::{Coerced, CoercionRules, default_value};
pub use config::{IngestConfig, NormalizeConfig};
pub use diagnostics::{Diagnostic, DiagnosticLog, SkipReason};
pub use enrich::{Clock, RAW_TIMESTAMP_FIELD, SystemClock, TimestampEnricher};
pub use normalize::{Normalizer, Outcome};
pub use project::{OutputField, OutputSchema, project};
pub use record::{FieldSource, FieldValue, NormalizedRecord, RawRecord};
pub use runner::{ExecMode, Ingestor, SourceReport, SourceResult};
pub use schema::{ColumnList, FieldSchema, FieldType};
pub use sink::{Destination, RecordSink};
pub use store::{JsonSchemaStore, SchemaStore};
