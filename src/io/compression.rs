//! Transparent decompression of source files.
//!
//! Sources are often shipped compressed. [`auto_detect_reader`] picks a codec by
//! file extension first and falls back to magic bytes, so `orders.csv.gz` and a
//! gzip stream misnamed `orders.csv` both read as plain text.
//!
//! ## Built-in Codecs
//!
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//!
//! With no compression feature enabled, detection always falls through and the
//! reader is returned as-is, buffered.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A decompression codec for source streams.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions with the leading dot.
    fn extensions(&self) -> &[&str];

    /// Signature at the start of a stream, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` so it yields decompressed bytes.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

fn codecs() -> Vec<Box<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Box::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Box::new(ZstdCodec),
    ]
}

/// Name of the codec that would be used for `path`, judged by extension only.
pub fn codec_name_for(path: impl AsRef<Path>) -> Option<String> {
    let lower = path.as_ref().to_string_lossy().to_lowercase();
    codecs()
        .into_iter()
        .find(|c| c.extensions().iter().any(|ext| lower.ends_with(ext)))
        .map(|c| c.name().to_string())
}

/// Wrap `reader` with decompression if `path_hint` or the stream's leading bytes call for it.
///
/// # Errors
/// Fails if the chosen codec cannot initialize on the stream.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn BufRead>> {
    let lower = path_hint.as_ref().to_string_lossy().to_lowercase();
    let all = codecs();

    if let Some(codec) = all
        .iter()
        .find(|c| c.extensions().iter().any(|ext| lower.ends_with(ext)))
    {
        let inner = codec
            .wrap_reader_dyn(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()))?;
        return Ok(Box::new(BufReader::new(inner)));
    }

    let mut buffered = BufReader::new(reader);
    let head = buffered.fill_buf().context("peek stream header")?.to_vec();
    if let Some(codec) = all
        .iter()
        .find(|c| c.magic_bytes().is_some_and(|m| !head.is_empty() && head.starts_with(m)))
    {
        let inner = codec
            .wrap_reader_dyn(Box::new(buffered))
            .with_context(|| format!("wrap reader with {} codec", codec.name()))?;
        return Ok(Box::new(BufReader::new(inner)));
    }

    Ok(Box::new(buffered))
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}
