//! File-facing pieces: reading sources and the bundled sinks.

pub mod compression;
pub mod csv;
pub mod source;

#[cfg_attr(docsrs, doc(cfg(feature = "io-jsonl")))]
#[cfg(feature = "io-jsonl")]
pub mod jsonl;
