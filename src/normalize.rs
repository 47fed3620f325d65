//! Record normalization: one raw record plus the source schema in, one typed
//! record (or a skip) out.
//!
//! A record is either normalized whole, possibly with some fields replaced by
//! their defaults, or rejected whole before any output exists. Rejection is an
//! [`Outcome::Skipped`] value, never an error; the source keeps going.

use crate::codec::RecordCodec;
use crate::coerce::CoercionRules;
use crate::diagnostics::{Diagnostic, REDACTED, SkipReason};
use crate::record::{NormalizedRecord, RawRecord};
use crate::schema::FieldSchema;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Normalized {
        record: NormalizedRecord,
        /// One entry per field that fell back to its default.
        diagnostics: Vec<Diagnostic>,
    },
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    /// The normalized record, if any.
    pub fn record(&self) -> Option<&NormalizedRecord> {
        match self {
            Outcome::Normalized { record, .. } => Some(record),
            Outcome::Skipped(_) => None,
        }
    }
}

/// Applies the coercion table to records of one source.
///
/// Cheap to clone; the schema is shared.
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: Arc<FieldSchema>,
    rules: CoercionRules,
    redact: Arc<HashSet<String>>,
}

impl Normalizer {
    pub fn new(schema: Arc<FieldSchema>, rules: CoercionRules) -> Self {
        Self {
            schema,
            rules,
            redact: Arc::new(HashSet::new()),
        }
    }

    /// Report raw values of these fields as [`REDACTED`] in diagnostics.
    #[must_use]
    pub fn with_redacted_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact = Arc::new(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Decode `line` with `codec` and normalize it.
    ///
    /// A line the codec cannot split is skipped as [`SkipReason::Undecodable`].
    pub fn normalize_line(&self, codec: &RecordCodec, line: &[u8]) -> Outcome {
        match codec.decode(line) {
            Ok(raw) => self.normalize(&raw),
            Err(e) => Outcome::Skipped(SkipReason::Undecodable {
                detail: format!("{e:#}"),
            }),
        }
    }

    /// Coerce every field of `raw` per its declared type.
    ///
    /// Skips when the field count differs from the schema's or when `raw`
    /// carries a field the schema does not declare.
    pub fn normalize(&self, raw: &RawRecord) -> Outcome {
        if raw.len() != self.schema.len() {
            return Outcome::Skipped(SkipReason::FieldCountMismatch {
                found: raw.len(),
                expected: self.schema.len(),
            });
        }
        // Resolve every key before producing anything.
        let mut typed = Vec::with_capacity(raw.len());
        for (name, value) in raw.iter() {
            let Some(ty) = self.schema.get(name) else {
                return Outcome::Skipped(SkipReason::UnknownField {
                    field: name.to_string(),
                });
            };
            typed.push((name, value, ty));
        }

        let mut record = NormalizedRecord::with_capacity(raw.len() + 1);
        let mut diagnostics = Vec::new();
        for (name, value, ty) in typed {
            let coerced = self.rules.coerce(ty, value);
            if let Some(reason) = coerced.fallback_reason {
                let shown = if self.redact.contains(name) {
                    REDACTED.to_string()
                } else {
                    String::from_utf8_lossy(value).into_owned()
                };
                diagnostics.push(Diagnostic::new(
                    name,
                    ty,
                    shown,
                    coerced.value.render().into_owned(),
                    reason,
                ));
            }
            record.insert(name, coerced.value);
        }
        Outcome::Normalized {
            record,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn normalizer(fields: &[(&str, &str)]) -> Normalizer {
        let schema = FieldSchema::new(fields.iter().copied()).unwrap();
        Normalizer::new(Arc::new(schema), CoercionRules::default())
    }

    #[test]
    fn rejects_keys_outside_schema() {
        let n = normalizer(&[("a", "INTEGER")]);
        let raw = RawRecord::from_pairs([("b", "1")]);
        assert_eq!(
            n.normalize(&raw),
            Outcome::Skipped(SkipReason::UnknownField { field: "b".into() })
        );
    }

    #[test]
    fn foreign_key_after_valid_ones_still_skips_whole_record() {
        let n = normalizer(&[("a", "INTEGER"), ("b", "STRING")]);
        let raw = RawRecord::from_pairs([("a", "not a number"), ("c", "x")]);
        let outcome = n.normalize(&raw);
        assert_eq!(
            outcome,
            Outcome::Skipped(SkipReason::UnknownField { field: "c".into() })
        );
        assert!(outcome.record().is_none());
    }

    #[test]
    fn redacts_sensitive_raw_values() {
        let n = normalizer(&[("ssn", "INTEGER")]).with_redacted_fields(["ssn"]);
        let raw = RawRecord::from_pairs([("ssn", "123-45-6789")]);
        let Outcome::Normalized { record, diagnostics } = n.normalize(&raw) else {
            panic!("expected a record");
        };
        assert_eq!(record.get("ssn"), Some(&FieldValue::Integer(0)));
        assert_eq!(diagnostics[0].raw_value, REDACTED);
        assert_eq!(diagnostics[0].fallback, "0");
    }
}
