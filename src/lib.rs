//! # bncsv
//!
//! A streaming codec between numeric CSV and a compact binary format.
//!
//! ## What is bncsv?
//!
//! bncsv takes CSV whose every cell is a plain decimal number (`42.91`, `-7`,
//! `0.005`) and stores it as a stream of variable-length integers plus a small
//! header and trailer. Decoding gives back the original text byte for byte:
//! the same digits, the same trailing zeros, the same row terminator, even
//! `-0`.
//!
//! ## Key Features
//!
//! - **Lossless**: numbers are kept as digit strings, never as floats
//! - **Streaming**: both directions work chunk by chunk in constant memory;
//!   chunk boundaries can fall anywhere, including inside a number
//! - **Compact**: the fraction digit count of each column is stored once, so a
//!   typical two-decimal price costs two or three bytes
//! - **Strict**: exponents, leading `+`, leading zeros, empty cells and ragged
//!   rows are errors, reported with row, column and byte offset
//! - **Arbitrary precision**: cells wider than 36 digits go through
//!   [`num_bigint`]
//!
//! ## Quick Start
//!
//! ```rust
//! use bncsv::{decode_to_vec, encode_to_vec};
//!
//! let csv = b"42.91,46.02,87.53\n65.55,31.57,3.79\n28.15,42.25,61.99\n13.86,22.85,94.43\n";
//! let binary = encode_to_vec(csv).unwrap();
//! assert!(binary.len() < csv.len());
//! assert_eq!(decode_to_vec(&binary).unwrap(), csv);
//! ```
//!
//! ### Streaming Between Readers and Writers
//!
//! Any [`std::io::Read`] becomes a source through [`ReadSource`]; any
//! [`std::io::Write`] is a sink.
//!
//! ```rust
//! use bncsv::{decode, encode, ReadSource};
//! use std::io::Cursor;
//!
//! let csv = Cursor::new(b"1.5,-2.25\r\n3.0,4.75\r\n".to_vec());
//! let mut binary = Vec::new();
//! let stats = encode(ReadSource::with_chunk_size(csv, 4), &mut binary).unwrap();
//! assert_eq!(stats.rows, 2);
//!
//! let mut text = Vec::new();
//! decode(ReadSource::new(Cursor::new(binary)), &mut text).unwrap();
//! assert_eq!(text, b"1.5,-2.25\r\n3.0,4.75\r\n");
//! ```
//!
//! ### Custom Options
//!
//! ```rust
//! use bncsv::{encode_with_options, CodecOptions};
//!
//! let options = CodecOptions::new()
//!     .with_chunk_size(64)
//!     .with_max_field_len(16);
//! let mut binary = Vec::new();
//! let err = encode_with_options(&b"12345678901234567\n"[..], &mut binary, &options);
//! assert!(err.is_err());
//! ```
//!
//! ## Accepted Numbers
//!
//! | Text | Accepted | Why |
//! |------|----------|-----|
//! | `0`, `-12`, `3.50`, `-0.00` | yes | |
//! | `+1` | no | leading plus |
//! | `1e5` | no | exponent |
//! | `007`, `-01.5` | no | leading zero |
//! | `.5`, `5.` | no | missing digits |
//! | empty cell | no | |
//!
//! The wire layout is documented in the [`format`] module.
//!
//! ## Logging
//!
//! The codec emits [`tracing`] `debug` events when a header is written or read
//! and when a stream completes. Install any subscriber to see them.

mod decoder;
mod encoder;
pub mod error;
pub mod format;
pub mod io;
mod number;
pub mod options;
mod stats;
mod token;
mod varint;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Error, NumericFormatError, Result};
pub use format::{read_header, FormatInfo, Header, Scales, Terminator, MAGIC, VERSION};
pub use io::{ChunkSink, ChunkSource, IterSource, ReadSource};
pub use number::{CanonicalNumber, Magnitude, MAX_SCALE};
pub use options::{CodecOptions, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FIELD_LEN};
pub use stats::CodecStats;
pub use token::{Field, FieldEnd, FieldRef, Tokenizer};

/// Encode numeric CSV from `source` into bncsv on `sink`.
///
/// # Examples
///
/// ```rust
/// use bncsv::encode;
///
/// let mut binary = Vec::new();
/// let stats = encode(&b"1,2\n3,4\n"[..], &mut binary).unwrap();
/// assert_eq!(stats.rows, 2);
/// assert_eq!(stats.columns, 2);
/// assert_eq!(stats.bytes_out, binary.len() as u64);
/// ```
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for bytes or structure that are not
/// numeric CSV, [`Error::UnsupportedNumericFormat`] for cells that are not
/// supported numbers, [`Error::ShapeMismatch`] for rows whose width differs
/// from the first row, and [`Error::Io`] when the source or sink fails.
/// Rows before the failing one may already have reached the sink.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode<S, K>(source: S, sink: K) -> Result<CodecStats>
where
    S: ChunkSource,
    K: ChunkSink,
{
    encode_with_options(source, sink, &CodecOptions::default())
}

/// Encode numeric CSV with custom options.
///
/// # Errors
///
/// Same as [`encode`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode_with_options<S, K>(source: S, sink: K, options: &CodecOptions) -> Result<CodecStats>
where
    S: ChunkSource,
    K: ChunkSink,
{
    let mut tokens = Tokenizer::new(source, options);
    let mut encoder = Encoder::new(sink, options);
    while let Some(field) = tokens.next_field() {
        encoder.push_field_ref(field?)?;
    }
    let mut stats = encoder.finish()?;
    stats.bytes_in = tokens.bytes_read();
    Ok(stats)
}

/// Decode a bncsv stream from `source` back to CSV on `sink`.
///
/// # Examples
///
/// ```rust
/// use bncsv::{decode, encode_to_vec};
///
/// let binary = encode_to_vec(b"-0,0.10\n").unwrap();
/// let mut text = Vec::new();
/// decode(binary.as_slice(), &mut text).unwrap();
/// assert_eq!(text, b"-0,0.10\n");
/// ```
///
/// # Errors
///
/// Returns [`Error::UnsupportedVersion`] for streams written by another format
/// version, [`Error::Corruption`] for anything else that is not a valid
/// stream, and [`Error::Io`] when the source or sink fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode<S, K>(source: S, sink: K) -> Result<CodecStats>
where
    S: ChunkSource,
    K: ChunkSink,
{
    decode_with_options(source, sink, &CodecOptions::default())
}

/// Decode a bncsv stream with custom options.
///
/// `max_field_len` must be at least as large as it was when encoding, since it
/// bounds the varints the decoder accepts.
///
/// # Errors
///
/// Same as [`decode`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode_with_options<S, K>(mut source: S, sink: K, options: &CodecOptions) -> Result<CodecStats>
where
    S: ChunkSource,
    K: ChunkSink,
{
    let mut decoder = Decoder::new(sink, options);
    let mut chunk = Vec::new();
    while source.fill_chunk(&mut chunk)? {
        decoder.feed(&chunk)?;
    }
    decoder.finish()
}

/// Encode an in-memory CSV document.
///
/// # Errors
///
/// Same as [`encode`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode_to_vec(csv: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(csv.len() / 2 + 32);
    encode(csv, &mut out)?;
    Ok(out)
}

/// Decode an in-memory bncsv stream.
///
/// # Errors
///
/// Same as [`decode`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode_to_vec(binary: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(binary.len() * 2);
    decode(binary, &mut out)?;
    Ok(out)
}
