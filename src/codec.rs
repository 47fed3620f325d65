//! Delimited line codec.
//!
//! Converts between one raw delimited line and a field-keyed record for a fixed
//! [`ColumnList`]. Both directions are built on the `csv` crate with the quoting
//! rules of the source files: comma delimiter, double-quote quoting, quotes only
//! where a value needs them.
//!
//! # Design notes
//! - Lines are handled as bytes; decoding text is the normalizer's job.
//! - `decode` never checks the field count. Extra values land in the record's
//!   overflow and missing ones are simply absent, so the normalizer sees the
//!   real count and can reject the line.

use crate::record::{FieldSource, RawRecord};
use crate::schema::ColumnList;
use anyhow::{Context, Result, anyhow};
use csv::{ByteRecord, QuoteStyle, ReaderBuilder, WriterBuilder};

/// Encoder/decoder for one source's lines.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    columns: ColumnList,
    delimiter: u8,
    quote: u8,
}

impl RecordCodec {
    /// Codec with the default comma delimiter and double-quote quoting.
    pub fn new(columns: ColumnList) -> Self {
        Self {
            columns,
            delimiter: b',',
            quote: b'"',
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Serialize `record` as one line in column order.
    ///
    /// Values are quoted only where necessary and the line terminator is stripped.
    ///
    /// # Errors
    /// Fails if `record` lacks any column, or if the writer fails.
    pub fn encode<R: FieldSource + ?Sized>(&self, record: &R) -> Result<String> {
        let mut row = ByteRecord::with_capacity(64, self.columns.len());
        for col in &self.columns {
            let v = record
                .field_bytes(col)
                .ok_or_else(|| anyhow!("record has no value for column {col}"))?;
            row.push_field(&v);
        }

        self.write_line(&row)
    }

    /// The column names as one line, quoted like any other line.
    ///
    /// # Errors
    /// Fails if the writer fails.
    pub fn encode_header(&self) -> Result<String> {
        let row: ByteRecord = self.columns.iter().map(String::as_bytes).collect();
        self.write_line(&row)
    }

    fn write_line(&self, row: &ByteRecord) -> Result<String> {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::with_capacity(row.as_slice().len() + 8));
        wtr.write_byte_record(row).context("write delimited line")?;
        let buf = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush delimited line: {}", e.error()))?;

        let mut line = String::from_utf8_lossy(&buf).into_owned();
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    /// Split `line` into fields and key them by column, in order.
    ///
    /// A blank line yields an empty record.
    ///
    /// # Errors
    /// Fails if the line cannot be parsed as delimited text.
    pub fn decode(&self, line: &[u8]) -> Result<RawRecord> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .from_reader(line);

        let mut row = ByteRecord::new();
        let mut out = RawRecord::new();
        if !rdr.read_byte_record(&mut row).context("parse delimited line")? {
            return Ok(out);
        }
        for (i, value) in row.iter().enumerate() {
            match self.columns.get(i) {
                Some(col) => out.insert(col.clone(), value.to_vec()),
                None => out.push_overflow(value.to_vec()),
            }
        }
        Ok(out)
    }
}
