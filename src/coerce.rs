//! The type coercion table.
//!
//! Every [`FieldType`] maps to exactly one coercion rule and one default value:
//!
//! | Declared type | Coercion on non-empty value                           | Default |
//! |---------------|-------------------------------------------------------|---------|
//! | `STRING`      | decode with the configured encoding, drop bad bytes   | `""`    |
//! | `INTEGER`     | parse as `i64`                                        | `0`     |
//! | `FLOAT`       | parse as `f64`                                        | `0.0`   |
//! | `DATETIME`    | try each time format in order, epoch seconds (UTC)    | `0`     |
//! | `TIMESTAMP`   | same format list, integer epoch seconds (UTC)         | `0`     |
//! | unknown       | none; always the default                              | `""`    |
//!
//! An empty raw value short-circuits to the default without parsing. A failed
//! parse also yields the default, together with the reason, so the caller can
//! report it; coercion itself never fails.
//!
//! A `%Z` in a time format matches only `UTC`, `GMT` or `Z`. Any other zone name
//! fails that format, so a value is never silently shifted into the wrong zone.

use crate::record::FieldValue;
use crate::schema::FieldType;
use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::{DecoderResult, Encoding, UTF_8};

/// Primary time format used when none is configured.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Formats tried after the primary one, in order.
pub const FALLBACK_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

/// Zone names a `%Z` in a time format accepts; all of them mean UTC.
pub const UTC_ZONE_NAMES: [&str; 3] = ["UTC", "GMT", "Z"];

/// Settings the coercion rules depend on.
#[derive(Debug, Clone)]
pub struct CoercionRules {
    encoding: &'static Encoding,
    time_formats: Vec<String>,
    /// Per configured format, the concrete formats to try (`%Z` replaced by each UTC name).
    time_patterns: Vec<Vec<String>>,
}

impl Default for CoercionRules {
    fn default() -> Self {
        Self::new(UTF_8, DEFAULT_TIME_FORMAT)
    }
}

impl CoercionRules {
    /// Rules for `encoding`, trying `time_format` first and then the fallback formats.
    pub fn new(encoding: &'static Encoding, time_format: &str) -> Self {
        let mut time_formats = vec![time_format.to_string()];
        time_formats.extend(FALLBACK_TIME_FORMATS.iter().map(|f| f.to_string()));
        let time_patterns = time_formats.iter().map(|f| expand_zone_names(f)).collect();
        Self {
            encoding,
            time_formats,
            time_patterns,
        }
    }

    /// Resolve an encoding label such as `"utf-8"` or `"latin1"`.
    ///
    /// # Errors
    /// Fails on labels the WHATWG encoding standard does not know.
    pub fn from_label(label: &str, time_format: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| anyhow!("unknown text encoding {label:?}"))?;
        Ok(Self::new(encoding, time_format))
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn time_formats(&self) -> &[String] {
        &self.time_formats
    }

    /// Coerce one raw value according to `ty`.
    pub fn coerce(&self, ty: &FieldType, raw: &[u8]) -> Coerced {
        if raw.is_empty() {
            return Coerced::ok(default_value(ty));
        }
        let parsed = match ty {
            FieldType::String => Ok(FieldValue::String(decode_ignoring_errors(raw, self.encoding))),
            FieldType::Integer => as_text(raw).and_then(parse_integer),
            FieldType::Float => as_text(raw).and_then(parse_float),
            FieldType::DateTime | FieldType::Timestamp => as_text(raw)
                .and_then(|s| self.parse_epoch_seconds(s))
                .map(FieldValue::Timestamp),
            FieldType::Unknown(name) => Err(format!("unknown field type {name}")),
        };
        match parsed {
            Ok(value) => Coerced::ok(value),
            Err(reason) => Coerced::fallback(default_value(ty), reason),
        }
    }

    /// Try every configured format in order; the first that parses wins.
    fn parse_epoch_seconds(&self, s: &str) -> Result<i64, String> {
        let s = s.trim();
        self.time_patterns
            .iter()
            .flatten()
            .find_map(|fmt| parse_with_format(s, fmt))
            .ok_or_else(|| format!("matches none of the time formats {:?}", self.time_formats))
    }
}

/// Default for `ty`, used for empty values and failed coercions.
pub fn default_value(ty: &FieldType) -> FieldValue {
    match ty {
        FieldType::String | FieldType::Unknown(_) => FieldValue::String(String::new()),
        FieldType::Integer => FieldValue::Integer(0),
        FieldType::Float => FieldValue::Float(0.0),
        // 1970-01-01 00:00:00 UTC
        FieldType::DateTime | FieldType::Timestamp => FieldValue::Timestamp(0),
    }
}

/// Outcome of coercing one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: FieldValue,
    /// Why the default was substituted, when it was.
    pub fallback_reason: Option<String>,
}

impl Coerced {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            fallback_reason: None,
        }
    }

    fn fallback(value: FieldValue, reason: String) -> Self {
        Self {
            value,
            fallback_reason: Some(reason),
        }
    }

    pub fn fell_back(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

fn as_text(raw: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(raw).map_err(|e| format!("value is not valid UTF-8: {e}"))
}

fn parse_integer(s: &str) -> Result<FieldValue, String> {
    s.trim()
        .parse::<i64>()
        .map(FieldValue::Integer)
        .map_err(|e| format!("invalid integer: {e}"))
}

/// Non-finite values (`nan`, `inf`) are rejected; sinks cannot represent them.
fn parse_float(s: &str) -> Result<FieldValue, String> {
    let v = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid float: {e}"))?;
    if !v.is_finite() {
        return Err("float is not finite".to_string());
    }
    Ok(FieldValue::Float(v))
}

/// Expand every `%Z` in `fmt` into each of [`UTC_ZONE_NAMES`] as literal text.
///
/// chrono skips any word for `%Z`, which would read `12:00 PST` as `12:00 UTC`.
/// With literal names, a foreign zone fails the format instead.
fn expand_zone_names(fmt: &str) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut chars = fmt.chars();
    let mut has_zone = false;
    while let Some(c) = chars.next() {
        if c != '%' {
            parts.iter_mut().for_each(|p| p.push(c));
            continue;
        }
        match chars.next() {
            Some('Z') => {
                has_zone = true;
                parts = parts
                    .iter()
                    .flat_map(|p| UTC_ZONE_NAMES.iter().map(move |z| format!("{p}{z}")))
                    .collect();
            }
            Some(next) => parts.iter_mut().for_each(|p| {
                p.push('%');
                p.push(next);
            }),
            None => parts.iter_mut().for_each(|p| p.push('%')),
        }
    }
    if has_zone { parts } else { vec![fmt.to_string()] }
}

/// Parse `s` with one strftime-style format, as UTC epoch seconds.
///
/// Date-only formats are accepted and resolve to midnight.
fn parse_with_format(s: &str, fmt: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(s, fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Decode `raw` with `encoding`, dropping malformed byte sequences.
pub fn decode_ignoring_errors(raw: &[u8], encoding: &'static Encoding) -> String {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = String::with_capacity(raw.len());
    let mut input = raw;
    loop {
        let (result, read) = decoder.decode_to_string_without_replacement(input, &mut out, true);
        input = &input[read..];
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::Malformed(_, _) => continue,
            DecoderResult::OutputFull => {
                let need = decoder
                    .max_utf8_buffer_length_without_replacement(input.len())
                    .unwrap_or(input.len() * 3 + 16);
                out.reserve(need);
            }
        }
    }
    out
}
