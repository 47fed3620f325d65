use anyhow::Result;
use ingestbeam::testing::FixedClock;
use ingestbeam::{
    CoercionRules, FieldSchema, FieldValue, Normalizer, Outcome, RAW_TIMESTAMP_FIELD, RawRecord,
    RecordCodec, SkipReason, TimestampEnricher,
};
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

struct Line {
    codec: RecordCodec,
    normalizer: Normalizer,
    enricher: TimestampEnricher,
}

impl Line {
    fn new(fields: &[(&str, &str)]) -> Result<Self> {
        let schema = Arc::new(FieldSchema::new(fields.iter().copied())?);
        Ok(Self {
            codec: RecordCodec::new(schema.columns()),
            normalizer: Normalizer::new(Arc::clone(&schema), CoercionRules::default()),
            enricher: TimestampEnricher::new(Arc::new(FixedClock(NOW))),
        })
    }

    fn run(&self, line: &str) -> Outcome {
        match self.normalizer.normalize_line(&self.codec, line.as_bytes()) {
            Outcome::Normalized {
                record,
                diagnostics,
            } => Outcome::Normalized {
                record: self.enricher.enrich(record),
                diagnostics,
            },
            skipped => skipped,
        }
    }
}

#[test]
fn typed_record_gets_ingestion_timestamp() -> Result<()> {
    let line = Line::new(&[("id", "INTEGER"), ("name", "STRING")])?;
    let Outcome::Normalized {
        record,
        diagnostics,
    } = line.run("42,Alice")
    else {
        panic!("expected a record");
    };
    assert!(diagnostics.is_empty());
    assert_eq!(
        record.keys().collect::<Vec<_>>(),
        vec!["id", "name", RAW_TIMESTAMP_FIELD]
    );
    assert_eq!(record.get("id"), Some(&FieldValue::Integer(42)));
    assert_eq!(record.get("name"), Some(&FieldValue::String("Alice".into())));
    assert_eq!(record.get(RAW_TIMESTAMP_FIELD), Some(&FieldValue::Timestamp(NOW)));
    assert_eq!(
        serde_json::to_string(&record)?,
        format!(r#"{{"id":42,"name":"Alice","_RAWTIMESTAMP":{NOW}}}"#)
    );
    Ok(())
}

#[test]
fn bad_integer_falls_back_with_a_diagnostic() -> Result<()> {
    let line = Line::new(&[("id", "INTEGER")])?;
    let Outcome::Normalized {
        record,
        diagnostics,
    } = line.run("abc")
    else {
        panic!("expected a record");
    };
    assert_eq!(record.get("id"), Some(&FieldValue::Integer(0)));
    assert!(record.contains(RAW_TIMESTAMP_FIELD));
    assert_eq!(diagnostics.len(), 1);
    let d = &diagnostics[0];
    assert_eq!(d.field, "id");
    assert_eq!(d.declared_type, "INTEGER");
    assert_eq!(d.raw_value, "abc");
    assert_eq!(d.fallback, "0");
    Ok(())
}

#[test]
fn short_line_is_skipped() -> Result<()> {
    let line = Line::new(&[("a", "INTEGER"), ("b", "STRING")])?;
    let outcome = line.run("1");
    assert!(outcome.is_skipped());
    assert!(outcome.record().is_none());
    assert_eq!(
        outcome,
        Outcome::Skipped(SkipReason::FieldCountMismatch {
            found: 1,
            expected: 2
        })
    );
    Ok(())
}

#[test]
fn long_and_blank_lines_are_skipped() -> Result<()> {
    let line = Line::new(&[("a", "INTEGER"), ("b", "STRING")])?;
    assert_eq!(
        line.run("1,x,extra"),
        Outcome::Skipped(SkipReason::FieldCountMismatch {
            found: 3,
            expected: 2
        })
    );
    assert!(line.run("").is_skipped());
    Ok(())
}

#[test]
fn timestamp_field_parses_date_or_falls_back() -> Result<()> {
    let line = Line::new(&[("t", "TIMESTAMP")])?;
    let ok = line.run("2020-01-01");
    assert_eq!(
        ok.record().and_then(|r| r.get("t")),
        Some(&FieldValue::Timestamp(1_577_836_800))
    );
    let bad = line.run("not-a-date");
    assert_eq!(
        bad.record().and_then(|r| r.get("t")),
        Some(&FieldValue::Timestamp(0))
    );
    Ok(())
}

#[test]
fn empty_values_default_silently() -> Result<()> {
    let line = Line::new(&[("n", "INTEGER"), ("f", "FLOAT"), ("s", "STRING"), ("d", "DATETIME")])?;
    let Outcome::Normalized {
        record,
        diagnostics,
    } = line.run(",,,")
    else {
        panic!("expected a record");
    };
    assert!(diagnostics.is_empty());
    assert_eq!(record.get("n"), Some(&FieldValue::Integer(0)));
    assert_eq!(record.get("f"), Some(&FieldValue::Float(0.0)));
    assert_eq!(record.get("s"), Some(&FieldValue::String(String::new())));
    assert_eq!(record.get("d"), Some(&FieldValue::Timestamp(0)));
    Ok(())
}

#[test]
fn raw_record_with_foreign_key_is_skipped() -> Result<()> {
    let schema = Arc::new(FieldSchema::new([("a", "INTEGER"), ("b", "INTEGER")])?);
    let n = Normalizer::new(schema, CoercionRules::default());
    let raw = RawRecord::from_pairs([("a", "1"), ("c", "2")]);
    assert_eq!(
        n.normalize(&raw),
        Outcome::Skipped(SkipReason::UnknownField { field: "c".into() })
    );
    Ok(())
}

#[test]
fn unknown_declared_type_is_reported() -> Result<()> {
    let line = Line::new(&[("g", "GEOGRAPHY")])?;
    let Outcome::Normalized {
        record,
        diagnostics,
    } = line.run("POINT(1 2)")
    else {
        panic!("expected a record");
    };
    assert_eq!(record.get("g"), Some(&FieldValue::String(String::new())));
    assert_eq!(diagnostics[0].declared_type, "GEOGRAPHY");
    Ok(())
}
