use anyhow::Result;
use ingestbeam::{CoercionRules, FieldType, FieldValue, default_value};

fn coerce(ty: FieldType, raw: &str) -> FieldValue {
    CoercionRules::default().coerce(&ty, raw.as_bytes()).value
}

#[test]
fn empty_input_yields_the_tabulated_default() {
    let rules = CoercionRules::default();
    let mut types = FieldType::KNOWN.to_vec();
    types.push(FieldType::Unknown("GEOGRAPHY".into()));
    for ty in &types {
        let c = rules.coerce(ty, b"");
        assert_eq!(c.value, default_value(ty), "{ty}");
        assert!(!c.fell_back(), "{ty}");
    }
    assert_eq!(default_value(&FieldType::String), FieldValue::String(String::new()));
    assert_eq!(default_value(&FieldType::Integer), FieldValue::Integer(0));
    assert_eq!(default_value(&FieldType::Float), FieldValue::Float(0.0));
    assert_eq!(default_value(&FieldType::DateTime), FieldValue::Timestamp(0));
    assert_eq!(default_value(&FieldType::Timestamp), FieldValue::Timestamp(0));
}

#[test]
fn malformed_input_falls_back_instead_of_failing() {
    let rules = CoercionRules::default();
    for (ty, raw) in [
        (FieldType::Integer, "abc"),
        (FieldType::Integer, "4.5"),
        (FieldType::Integer, "99999999999999999999"),
        (FieldType::Float, "one point five"),
        (FieldType::DateTime, "yesterday"),
        (FieldType::Timestamp, "not-a-date"),
        (FieldType::Timestamp, "2020-13-45"),
    ] {
        let c = rules.coerce(&ty, raw.as_bytes());
        assert_eq!(c.value, default_value(&ty), "{ty} {raw:?}");
        assert!(c.fell_back(), "{ty} {raw:?}");
    }
}

#[test]
fn numbers_parse_with_surrounding_whitespace() {
    assert_eq!(coerce(FieldType::Integer, "42"), FieldValue::Integer(42));
    assert_eq!(coerce(FieldType::Integer, " -7 "), FieldValue::Integer(-7));
    assert_eq!(coerce(FieldType::Float, "2.5"), FieldValue::Float(2.5));
    assert_eq!(coerce(FieldType::Float, "1e3"), FieldValue::Float(1000.0));
    assert_eq!(coerce(FieldType::Float, "7"), FieldValue::Float(7.0));
}

#[test]
fn timestamps_try_each_format_in_order() {
    assert_eq!(
        coerce(FieldType::Timestamp, "2020-01-01"),
        FieldValue::Timestamp(1_577_836_800)
    );
    assert_eq!(
        coerce(FieldType::Timestamp, "2020-01-01 12:30:15"),
        FieldValue::Timestamp(1_577_836_800 + 12 * 3600 + 30 * 60 + 15)
    );
    assert_eq!(
        coerce(FieldType::DateTime, "1970-01-02"),
        FieldValue::Timestamp(86_400)
    );
    assert_eq!(coerce(FieldType::Timestamp, "not-a-date"), FieldValue::Timestamp(0));
}

#[test]
fn custom_primary_format_wins_before_fallbacks() -> Result<()> {
    let rules = CoercionRules::from_label("utf-8", "%d/%m/%Y %H:%M")?;
    assert_eq!(rules.time_formats()[0], "%d/%m/%Y %H:%M");
    assert_eq!(
        rules.coerce(&FieldType::Timestamp, b"02/01/1970 00:00").value,
        FieldValue::Timestamp(86_400)
    );
    assert_eq!(
        rules.coerce(&FieldType::Timestamp, b"1970-01-02").value,
        FieldValue::Timestamp(86_400)
    );
    Ok(())
}

#[test]
fn strings_drop_undecodable_bytes() {
    assert_eq!(
        coerce(FieldType::String, "plain text"),
        FieldValue::String("plain text".into())
    );
    let c = CoercionRules::default().coerce(&FieldType::String, b"caf\xe9!");
    assert_eq!(c.value, FieldValue::String("caf!".into()));
    assert!(!c.fell_back());
}

#[test]
fn strings_decode_with_the_configured_encoding() -> Result<()> {
    let rules = CoercionRules::from_label("latin1", "%Y-%m-%d")?;
    assert_eq!(
        rules.coerce(&FieldType::String, b"caf\xe9").value,
        FieldValue::String("café".into())
    );
    Ok(())
}

#[test]
fn unknown_encoding_label_is_rejected() {
    assert!(CoercionRules::from_label("klingon-8", "%Y").is_err());
}

#[test]
fn unknown_type_always_yields_empty_string() {
    let c = CoercionRules::default().coerce(&FieldType::Unknown("BLOB".into()), b"xyz");
    assert_eq!(c.value, FieldValue::String(String::new()));
    assert!(c.fell_back());
}

#[test]
fn default_primary_format_accepts_utc_zone_names() {
    let noon = 1_577_836_800 + 12 * 3600;
    for raw in [
        "2020-01-01 12:00:00 UTC",
        "2020-01-01 12:00:00 GMT",
        "2020-01-01 12:00:00 Z",
    ] {
        let c = CoercionRules::default().coerce(&FieldType::Timestamp, raw.as_bytes());
        assert_eq!(c.value, FieldValue::Timestamp(noon), "{raw}");
        assert!(!c.fell_back(), "{raw}");
    }
}

#[test]
fn foreign_zone_name_falls_back_with_reason() {
    let rules = CoercionRules::default();
    for ty in [FieldType::Timestamp, FieldType::DateTime] {
        let c = rules.coerce(&ty, b"2020-01-01 12:00:00 PST");
        assert_eq!(c.value, FieldValue::Timestamp(0), "{ty}");
        assert!(c.fell_back(), "{ty}");
    }
}

#[test]
fn non_finite_floats_fall_back() {
    let rules = CoercionRules::default();
    for raw in ["nan", "NaN", "inf", "-infinity"] {
        let c = rules.coerce(&FieldType::Float, raw.as_bytes());
        assert_eq!(c.value, FieldValue::Float(0.0), "{raw}");
        assert!(c.fell_back(), "{raw}");
    }
}
