//! Source execution: schema lookup, then lines through decode → normalize →
//! enrich → sink, batch by batch.
//!
//! Each source is independent. A source whose schema cannot be found, whose file
//! cannot be read, or whose sink rejects a batch fails on its own; the other
//! sources of a [`Ingestor::run_all`] call still run. Bad lines never fail a
//! source: they are skipped or patched with defaults and reported.
//!
//! Within a source, lines are normalized in batches of `batch_size`. In
//! [`ExecMode::Parallel`] a batch is spread over a rayon pool; output order always
//! matches input order.

use crate::codec::RecordCodec;
use crate::coerce::CoercionRules;
use crate::config::IngestConfig;
use crate::diagnostics::DiagnosticLog;
use crate::enrich::{Clock, TimestampEnricher};
use crate::io::source::{SourceLines, table_name_for};
use crate::normalize::{Normalizer, Outcome};
use crate::project::project;
use crate::sink::{Destination, RecordSink};
use crate::store::SchemaStore;
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How lines of a source are normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecMode {
    /// One line after another on the calling thread.
    Sequential,
    /// Batches spread over a rayon pool; `None` threads means one per CPU.
    Parallel { threads: Option<usize> },
}

impl Default for ExecMode {
    fn default() -> Self {
        ExecMode::Parallel { threads: None }
    }
}

/// What happened to one source.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub path: PathBuf,
    pub destination: Destination,
    /// Data lines read, header excluded.
    pub lines_read: u64,
    pub records_written: u64,
    pub diagnostics: DiagnosticLog,
}

impl SourceReport {
    pub fn skipped(&self) -> usize {
        self.diagnostics.skip_count()
    }

    pub fn fallbacks(&self) -> usize {
        self.diagnostics.fallback_count()
    }
}

/// Outcome of one source in a multi-source run.
#[derive(Debug)]
pub struct SourceResult {
    pub path: PathBuf,
    pub result: Result<SourceReport>,
}

/// Drives sources from a [`SchemaStore`] into a [`RecordSink`].
pub struct Ingestor<S, K> {
    store: S,
    sink: K,
    dataset: String,
    rules: CoercionRules,
    redact_fields: Vec<String>,
    enricher: TimestampEnricher,
    skip_header_lines: usize,
    batch_size: usize,
    exec: ExecMode,
}

impl<S: SchemaStore, K: RecordSink> Ingestor<S, K> {
    /// Ingestor with default settings: UTF-8, one header line, batches of 1000,
    /// parallel with one thread per CPU.
    pub fn new(store: S, sink: K, dataset: impl Into<String>) -> Self {
        let defaults = IngestConfig::default();
        Self {
            store,
            sink,
            dataset: dataset.into(),
            rules: CoercionRules::default(),
            redact_fields: Vec::new(),
            enricher: TimestampEnricher::default(),
            skip_header_lines: defaults.skip_header_lines,
            batch_size: defaults.batch_size,
            exec: defaults.exec,
        }
    }

    /// Ingestor configured from `cfg`.
    ///
    /// # Errors
    /// Fails if `cfg` does not validate.
    pub fn from_config(cfg: &IngestConfig, store: S, sink: K) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(store, sink, cfg.dataset.clone())
            .with_rules(cfg.normalize.rules()?)
            .with_redacted_fields(cfg.normalize.redact_fields.clone())
            .with_skip_header_lines(cfg.skip_header_lines)
            .with_batch_size(cfg.batch_size)
            .with_exec_mode(cfg.exec))
    }

    #[must_use]
    pub fn with_rules(mut self, rules: CoercionRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_redacted_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields = fields;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.enricher = TimestampEnricher::new(clock);
        self
    }

    #[must_use]
    pub fn with_skip_header_lines(mut self, n: usize) -> Self {
        self.skip_header_lines = n;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    #[must_use]
    pub fn with_exec_mode(mut self, exec: ExecMode) -> Self {
        self.exec = exec;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Ingest every path; one failing source does not stop the others.
    ///
    /// All sources share one thread pool.
    pub fn run_all(&self, paths: &[PathBuf]) -> Vec<SourceResult> {
        info!(sources = paths.len(), dataset = %self.dataset, "START - ingestion");
        let pool = match self.build_pool() {
            Ok(pool) => pool,
            Err(e) => {
                error!(error = ?e, "cannot start ingestion");
                return paths
                    .iter()
                    .map(|path| SourceResult {
                        path: path.clone(),
                        result: Err(anyhow!("{e:#}")),
                    })
                    .collect();
            }
        };
        let results: Vec<SourceResult> = paths
            .iter()
            .map(|path| {
                let result = self.ingest_with(path, pool.as_ref());
                if let Err(e) = &result {
                    error!(path = %path.display(), error = ?e, "source aborted");
                }
                SourceResult {
                    path: path.clone(),
                    result,
                }
            })
            .collect();
        let failed = results.iter().filter(|r| r.result.is_err()).count();
        info!(sources = paths.len(), failed, "END - ingestion");
        results
    }

    /// Ingest one source file into `dataset.<table>`.
    ///
    /// # Errors
    /// Fails when the table cannot be named or found, the file cannot be read, or
    /// the sink fails. Batches appended before the failure stay appended.
    ///
    /// Each call builds its own thread pool; [`Ingestor::run_all`] shares one.
    pub fn ingest_source(&self, path: &Path) -> Result<SourceReport> {
        let pool = self.build_pool()?;
        self.ingest_with(path, pool.as_ref())
    }

    fn ingest_with(&self, path: &Path, pool: Option<&rayon::ThreadPool>) -> Result<SourceReport> {
        let table = table_name_for(path)?;
        info!(
            path = %path.display(),
            table = %table,
            encoding = self.rules.encoding().name(),
            "START - preparing source"
        );

        let schema = self
            .store
            .fetch_schema(&table)
            .with_context(|| format!("error getting information for table [{table}]"))?
            .ok_or_else(|| anyhow!("no table found for [{table}]"))?;
        for (field, ty) in schema.iter().filter(|(_, ty)| !ty.is_known()) {
            warn!(table = %table, field, declared_type = %ty, "unknown field type, values will default");
        }
        let schema = Arc::new(schema);

        let mut lines = SourceLines::open(path, self.skip_header_lines)?;
        let destination = Destination::new(self.dataset.clone(), table);
        let output_schema = project(&schema);
        self.sink
            .ensure_destination(&destination, &output_schema)
            .with_context(|| format!("prepare destination {destination}"))?;

        let codec = RecordCodec::new(schema.columns());
        let normalizer = Normalizer::new(Arc::clone(&schema), self.rules.clone())
            .with_redacted_fields(self.redact_fields.iter().cloned());

        let mut report = SourceReport {
            path: path.to_path_buf(),
            destination,
            lines_read: 0,
            records_written: 0,
            diagnostics: DiagnosticLog::new(),
        };

        loop {
            let batch: Vec<(u64, Vec<u8>)> = lines
                .by_ref()
                .take(self.batch_size)
                .collect::<Result<_>>()?;
            if batch.is_empty() {
                break;
            }
            report.lines_read += batch.len() as u64;

            let outcomes = match pool {
                Some(pool) => pool.install(|| self.process_batch(&normalizer, &codec, &batch, true)),
                None => self.process_batch(&normalizer, &codec, &batch, false),
            };

            let mut records = Vec::with_capacity(outcomes.len());
            for (line, outcome) in outcomes {
                match outcome {
                    Outcome::Normalized {
                        record,
                        diagnostics,
                    } => {
                        for d in &diagnostics {
                            warn!(
                                line,
                                field = %d.field,
                                declared_type = %d.declared_type,
                                raw_value = %d.raw_value,
                                fallback = %d.fallback,
                                reason = %d.reason,
                                "cannot convert value, returning default"
                            );
                        }
                        report.diagnostics.record_fallbacks(line, diagnostics);
                        records.push(record);
                    }
                    Outcome::Skipped(reason) => {
                        warn!(line, reason = %reason, "skipping line");
                        report.diagnostics.record_skip(line, reason);
                    }
                }
            }

            let written = self
                .sink
                .append(&report.destination, &records)
                .with_context(|| format!("append to {}", report.destination))?;
            report.records_written += written as u64;
            debug!(
                destination = %report.destination,
                lines = batch.len(),
                written,
                "batch appended"
            );
        }

        info!(
            path = %path.display(),
            destination = %report.destination,
            lines_read = report.lines_read,
            records_written = report.records_written,
            skipped = report.skipped(),
            fallbacks = report.fallbacks(),
            "END - preparing source"
        );
        Ok(report)
    }

    fn build_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        let ExecMode::Parallel { threads } = self.exec else {
            return Ok(None);
        };
        let threads = threads.unwrap_or_else(|| num_cpus::get().max(2));
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map(Some)
            .context("build normalization thread pool")
    }

    /// Normalize and enrich one batch, keeping line order.
    fn process_batch(
        &self,
        normalizer: &Normalizer,
        codec: &RecordCodec,
        batch: &[(u64, Vec<u8>)],
        parallel: bool,
    ) -> Vec<(u64, Outcome)> {
        let one = |(line, bytes): &(u64, Vec<u8>)| {
            let outcome = match normalizer.normalize_line(codec, bytes) {
                Outcome::Normalized {
                    record,
                    diagnostics,
                } => Outcome::Normalized {
                    record: self.enricher.enrich(record),
                    diagnostics,
                },
                skipped => skipped,
            };
            (*line, outcome)
        };
        if parallel {
            batch.par_iter().map(one).collect()
        } else {
            batch.iter().map(one).collect()
        }
    }
}
