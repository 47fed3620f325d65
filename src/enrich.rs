//! Ingestion timestamp enrichment.

use crate::record::{FieldValue, NormalizedRecord};
use chrono::Utc;
use std::sync::Arc;

/// Reserved name of the injected ingestion timestamp field.
pub const RAW_TIMESTAMP_FIELD: &str = "_RAWTIMESTAMP";

/// Source of "now" as UTC epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Stamps records with the time they were ingested.
#[derive(Clone)]
pub struct TimestampEnricher {
    clock: Arc<dyn Clock>,
}

impl Default for TimestampEnricher {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TimestampEnricher {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Add `_RAWTIMESTAMP` with the current UTC epoch seconds; other keys are untouched.
    pub fn enrich(&self, mut record: NormalizedRecord) -> NormalizedRecord {
        record.insert(
            RAW_TIMESTAMP_FIELD,
            FieldValue::Timestamp(self.clock.now_epoch_seconds()),
        );
        record
    }
}

impl std::fmt::Debug for TimestampEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampEnricher").finish_non_exhaustive()
    }
}
