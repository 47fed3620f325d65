use anyhow::Result;
use ingestbeam::testing::SourceDir;
use ingestbeam::{ExecMode, IngestConfig};
use std::path::PathBuf;

#[test]
fn empty_document_gives_defaults() -> Result<()> {
    let cfg = IngestConfig::from_json_str("{}")?;
    assert_eq!(cfg, IngestConfig::default());
    assert_eq!(cfg.dataset, "rawdata");
    assert_eq!(cfg.skip_header_lines, 1);
    assert_eq!(cfg.exec, ExecMode::Parallel { threads: None });
    assert_eq!(cfg.normalize.encoding, "utf-8");
    Ok(())
}

#[test]
fn input_files_accept_string_or_list() -> Result<()> {
    let joined = IngestConfig::from_json_str(r#"{"input_files": "a.csv, b.csv"}"#)?;
    let listed = IngestConfig::from_json_str(r#"{"input_files": ["a.csv", "b.csv"]}"#)?;
    assert_eq!(joined.input_files, vec!["a.csv", "b.csv"]);
    assert_eq!(joined.input_files, listed.input_files);
    Ok(())
}

#[test]
fn full_document_parses() -> Result<()> {
    let cfg = IngestConfig::from_json_str(
        r#"{
            "input_dir": "landing",
            "dataset": "staging",
            "skip_header_lines": 0,
            "batch_size": 10,
            "exec": { "mode": "sequential" },
            "normalize": { "encoding": "latin1", "time_format": "%d/%m/%Y", "redact_fields": ["ssn"] }
        }"#,
    )?;
    assert_eq!(cfg.input_dir, Some(PathBuf::from("landing")));
    assert_eq!(cfg.exec, ExecMode::Sequential);
    assert_eq!(cfg.normalize.redact_fields, vec!["ssn"]);
    let rules = cfg.normalize.rules()?;
    assert_eq!(rules.time_formats()[0], "%d/%m/%Y");

    let threaded = IngestConfig::from_json_str(r#"{"exec": {"mode": "parallel", "threads": 3}}"#)?;
    assert_eq!(threaded.exec, ExecMode::Parallel { threads: Some(3) });
    Ok(())
}

#[test]
fn invalid_settings_are_rejected() {
    for doc in [
        r#"{"dataset": " "}"#,
        r#"{"batch_size": 0}"#,
        r#"{"exec": {"mode": "parallel", "threads": 0}}"#,
        r#"{"normalize": {"encoding": "no-such-charset"}}"#,
        r#"{"exec": {"mode": "turbo"}}"#,
    ] {
        assert!(IngestConfig::from_json_str(doc).is_err(), "{doc}");
    }
}

#[test]
fn config_file_resolves_inputs_relative_to_input_dir() -> Result<()> {
    let dir = SourceDir::new()?;
    dir.write("orders_1.csv", "id\n")?;
    dir.write("orders_2.csv", "id\n")?;
    let cfg_path = dir.write(
        "ingest.json",
        serde_json::json!({
            "input_dir": dir.path(),
            "input_files": "orders_*.csv,users.csv",
        })
        .to_string(),
    )?;
    let cfg = IngestConfig::from_json_file(&cfg_path)?;
    let inputs = cfg.resolve_inputs()?;
    assert_eq!(
        inputs,
        vec![
            dir.path().join("orders_1.csv"),
            dir.path().join("orders_2.csv"),
            dir.path().join("users.csv"),
        ]
    );
    assert!(IngestConfig::from_json_file(dir.path().join("absent.json")).is_err());
    Ok(())
}
