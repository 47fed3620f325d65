use anyhow::Result;
use ingestbeam::io::csv::CsvSink;
use ingestbeam::testing::MemorySink;
use ingestbeam::{Destination, FieldSchema, FieldValue, NormalizedRecord, RecordSink, project};
use std::fs;

fn schema() -> Result<FieldSchema> {
    FieldSchema::new([("id", "INTEGER"), ("name", "STRING")])
}

fn record(id: i64, name: &str, ts: i64) -> NormalizedRecord {
    let mut r = NormalizedRecord::new();
    r.insert("id", FieldValue::Integer(id));
    r.insert("name", FieldValue::String(name.into()));
    r.insert("_RAWTIMESTAMP", FieldValue::Timestamp(ts));
    r
}

#[cfg(feature = "io-jsonl")]
#[test]
fn jsonl_sink_writes_schema_once_and_appends_lines() -> Result<()> {
    use ingestbeam::OutputSchema;
    use ingestbeam::io::jsonl::JsonlSink;

    let tmp = tempfile::tempdir()?;
    let sink = JsonlSink::new(tmp.path().join("out"));
    let dest = Destination::new("rawdata", "users");
    let out = project(&schema()?);

    sink.ensure_destination(&dest, &out)?;
    assert_eq!(sink.append(&dest, &[record(1, "Alice", 10)])?, 1);
    sink.ensure_destination(&dest, &out)?;
    assert_eq!(sink.append(&dest, &[record(2, "Bob, Jr.", 10)])?, 1);

    let written: OutputSchema = serde_json::from_str(&fs::read_to_string(sink.schema_path(&dest))?)?;
    assert_eq!(written, out);

    let data = fs::read_to_string(sink.data_path(&dest))?;
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"id":1,"name":"Alice","_RAWTIMESTAMP":10}"#,
            r#"{"id":2,"name":"Bob, Jr.","_RAWTIMESTAMP":10}"#,
        ]
    );
    Ok(())
}

#[cfg(feature = "io-jsonl")]
#[test]
fn jsonl_sink_rejects_schema_change() -> Result<()> {
    use ingestbeam::io::jsonl::JsonlSink;

    let tmp = tempfile::tempdir()?;
    let sink = JsonlSink::new(tmp.path());
    let dest = Destination::new("rawdata", "users");
    sink.ensure_destination(&dest, &project(&schema()?))?;
    let other = FieldSchema::new([("id", "STRING")])?;
    assert!(sink.ensure_destination(&dest, &project(&other)).is_err());
    Ok(())
}

#[test]
fn csv_sink_writes_header_then_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = CsvSink::new(tmp.path());
    let dest = Destination::new("rawdata", "users");
    let out = project(&schema()?);

    sink.ensure_destination(&dest, &out)?;
    sink.append(&dest, &[record(1, "Alice", 5), record(2, "Bob, Jr.", 5)])?;
    // Re-preparing an existing destination must not repeat the header.
    sink.ensure_destination(&dest, &out)?;
    sink.append(&dest, &[record(3, "", 6)])?;

    let data = fs::read_to_string(sink.data_path(&dest))?;
    assert_eq!(
        data,
        "id,name,_RAWTIMESTAMP\n1,Alice,5\n2,\"Bob, Jr.\",5\n3,,6\n"
    );
    Ok(())
}

#[test]
fn csv_sink_requires_prepared_destination_and_matching_header() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = Destination::new("rawdata", "users");
    let sink = CsvSink::new(tmp.path());
    assert!(sink.append(&dest, &[record(1, "a", 1)]).is_err());

    sink.ensure_destination(&dest, &project(&schema()?))?;
    let fresh = CsvSink::new(tmp.path());
    let other = FieldSchema::new([("id", "INTEGER")])?;
    assert!(fresh.ensure_destination(&dest, &project(&other)).is_err());
    Ok(())
}

#[test]
fn memory_sink_tracks_destinations_and_failures() -> Result<()> {
    let sink = MemorySink::new();
    let dest = Destination::new("ds", "t");
    assert!(sink.append(&dest, &[]).is_err());

    sink.ensure_destination(&dest, &project(&schema()?))?;
    sink.append(&dest, &[record(1, "x", 0)])?;
    assert_eq!(sink.destinations(), vec!["ds.t"]);
    assert_eq!(sink.records("ds.t").len(), 1);
    assert_eq!(sink.append_calls("ds.t"), 1);

    sink.fail_appends_to("ds.t");
    assert!(sink.append(&dest, &[record(2, "y", 0)]).is_err());
    assert_eq!(sink.records("ds.t").len(), 1);
    Ok(())
}
