//! The bncsv wire format, version 1.
//!
//! This module documents the binary layout and holds the pieces shared by the
//! encoder and the decoder: magic, version, flag bits, the header with its
//! per-column scale table, and the trailer.
//!
//! # Overview
//!
//! A bncsv stream is a fixed 12-byte header, an optional scale table, a flat
//! run of records and a 9-byte trailer:
//!
//! ```text
//! +--------------+----------------+-------------+-------------+
//! | header (12)  | scales (0..n)  | records ... | trailer (9) |
//! +--------------+----------------+-------------+-------------+
//! ```
//!
//! ## Header
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic, `BNCS` |
//! | 4 | 1 | version, currently `1` |
//! | 5 | 1 | flags: bit 0 `UNIFORM_SCALE`, bit 1 `CRLF`; other bits zero |
//! | 6 | 4 | column count, little endian |
//! | 10 | 1 | shared scale when `UNIFORM_SCALE` is set, zero otherwise |
//! | 11 | 1 | reserved, zero |
//!
//! When `UNIFORM_SCALE` is clear a table of one scale byte per column follows.
//! Column scales are taken from the first row of the CSV: when every cell of
//! that row has the same number of fraction digits the table collapses into
//! the single shared byte, so a table whose entries are all equal is invalid.
//!
//! `CRLF` records that rows end in `\r\n` instead of `\n`.
//!
//! ## Records
//!
//! One record per cell, row after row. There are no row delimiters: the
//! record index modulo the column count gives the column. Each record is
//!
//! ```text
//! varint( magnitude << 2 | EXPLICIT_SCALE << 1 | NEGATIVE )  [scale byte]
//! ```
//!
//! where `magnitude` is the cell's digits read as one integer (`-12.50` has
//! magnitude `1250`), `NEGATIVE` keeps the sign (so `-0` survives), and the
//! scale byte is present only when `EXPLICIT_SCALE` is set, i.e. when the cell's
//! fraction digit count differs from its column's scale in the header. A scale
//! byte equal to the column's scale is invalid, which leaves every table exactly
//! one encoding.
//!
//! The varint is LEB128: seven bits per byte, low group first, high bit set on
//! all but the last byte. Encodings must be minimal.
//!
//! ## Trailer
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | end flags: bit 0 `TRAILING_TERMINATOR`; other bits zero |
//! | 1 | 8 | row count, little endian |
//!
//! The trailer is what keeps encoding single-pass: neither the row count nor
//! whether the text ended with a terminator is known until the input runs out.
//!
//! ## Empty documents
//!
//! Empty CSV encodes to a header with zero columns and `UNIFORM_SCALE` set,
//! followed by a trailer with zero rows and no flags: 21 bytes.
//!
//! ## Example
//!
//! ```text
//! CSV:     1.5,-2.25\n
//! header:  42 4e 43 53  01  00  02 00 00 00  00  00
//! scales:  01 02
//! records: 3c            15 << 2
//!          85 07         225 << 2 | NEGATIVE
//! trailer: 01  01 00 00 00 00 00 00 00
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stream magic, the first four bytes of every bncsv stream.
pub const MAGIC: [u8; 4] = *b"BNCS";

/// The format version written by this crate and the only one it reads.
pub const VERSION: u8 = 1;

/// Length of the fixed part of the header.
pub const HEADER_LEN: usize = 12;

/// Length of the trailer.
pub const TRAILER_LEN: usize = 9;

pub(crate) const FLAG_UNIFORM_SCALE: u8 = 0b01;
pub(crate) const FLAG_CRLF: u8 = 0b10;
const KNOWN_FLAGS: u8 = FLAG_UNIFORM_SCALE | FLAG_CRLF;

pub(crate) const END_TRAILING_TERMINATOR: u8 = 0b1;

pub(crate) const RECORD_NEGATIVE: u8 = 0b01;
pub(crate) const RECORD_EXPLICIT_SCALE: u8 = 0b10;
pub(crate) const RECORD_FLAG_BITS: u32 = 2;

/// Row terminator of a CSV document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminator {
    #[default]
    Lf,
    CrLf,
}

impl Terminator {
    /// Returns the bytes of this terminator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bncsv::Terminator;
    ///
    /// assert_eq!(Terminator::Lf.as_bytes(), b"\n");
    /// assert_eq!(Terminator::CrLf.as_bytes(), b"\r\n");
    /// ```
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Lf => b"\n",
            Terminator::CrLf => b"\r\n",
        }
    }
}

/// Default fraction digit count of each column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scales {
    Uniform(u8),
    PerColumn(Vec<u8>),
}

impl Scales {
    /// Collapses a row of scales into `Uniform` when they all agree.
    pub fn from_row(scales: &[u8]) -> Self {
        match scales.split_first() {
            None => Scales::Uniform(0),
            Some((&first, rest)) if rest.iter().all(|&s| s == first) => Scales::Uniform(first),
            Some(_) => Scales::PerColumn(scales.to_vec()),
        }
    }

    #[inline]
    pub fn get(&self, column: usize) -> u8 {
        match self {
            Scales::Uniform(scale) => *scale,
            Scales::PerColumn(scales) => scales.get(column).copied().unwrap_or(0),
        }
    }
}

/// Decoded bncsv header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub columns: u32,
    pub terminator: Terminator,
    pub scales: Scales,
}

impl Header {
    pub fn new(columns: u32, terminator: Terminator, scales: Scales) -> Self {
        Header {
            version: VERSION,
            columns,
            terminator,
            scales,
        }
    }

    /// Total header length including the scale table.
    pub fn encoded_len(&self) -> usize {
        match &self.scales {
            Scales::Uniform(_) => HEADER_LEN,
            Scales::PerColumn(scales) => HEADER_LEN + scales.len(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let mut flags = 0;
        let mut shared = 0;
        if let Scales::Uniform(scale) = self.scales {
            flags |= FLAG_UNIFORM_SCALE;
            shared = scale;
        }
        if self.terminator == Terminator::CrLf {
            flags |= FLAG_CRLF;
        }
        out.extend_from_slice(&MAGIC);
        out.push(self.version);
        out.push(flags);
        out.extend_from_slice(&self.columns.to_le_bytes());
        out.push(shared);
        out.push(0);
        if let Scales::PerColumn(scales) = &self.scales {
            out.extend_from_slice(scales);
        }
    }
}

/// Parses a header one byte at a time, failing as early as possible.
#[derive(Debug, Default)]
pub(crate) struct HeaderReader {
    buf: Vec<u8>,
}

impl HeaderReader {
    pub(crate) fn new() -> Self {
        HeaderReader {
            buf: Vec::with_capacity(HEADER_LEN),
        }
    }

    /// Bytes consumed so far.
    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Feeds one byte; returns the header once it is complete.
    pub(crate) fn push(&mut self, byte: u8) -> Result<Option<Header>> {
        let offset = self.buf.len();
        self.buf.push(byte);

        match offset {
            0..=3 if byte != MAGIC[offset] => {
                return Err(Error::corruption(offset as u64, "bad magic, not a bncsv stream"))
            }
            4 if byte != VERSION => return Err(Error::unsupported_version(byte, VERSION)),
            5 if byte & !KNOWN_FLAGS != 0 => {
                return Err(Error::corruption(offset as u64, "unknown header flags"))
            }
            10 if self.buf[5] & FLAG_UNIFORM_SCALE == 0 && byte != 0 => {
                return Err(Error::corruption(
                    offset as u64,
                    "shared scale set without uniform scale flag",
                ))
            }
            11 if byte != 0 => {
                return Err(Error::corruption(offset as u64, "reserved header byte is not zero"))
            }
            _ => {}
        }

        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let flags = self.buf[5];
        let columns = u32::from_le_bytes([self.buf[6], self.buf[7], self.buf[8], self.buf[9]]);
        let terminator = if flags & FLAG_CRLF != 0 {
            Terminator::CrLf
        } else {
            Terminator::Lf
        };
        let scales = if flags & FLAG_UNIFORM_SCALE != 0 {
            Scales::Uniform(self.buf[10])
        } else {
            let Some(table_end) = usize::try_from(columns)
                .ok()
                .and_then(|columns| columns.checked_add(HEADER_LEN))
            else {
                return Err(Error::corruption(6, "column count exceeds address space"));
            };
            if self.buf.len() < table_end {
                return Ok(None);
            }
            let table = &self.buf[HEADER_LEN..table_end];
            if table.windows(2).all(|pair| pair[0] == pair[1]) {
                return Err(Error::corruption(
                    (table_end - 1) as u64,
                    "uniform scale table without uniform scale flag",
                ));
            }
            Scales::PerColumn(table.to_vec())
        };

        Ok(Some(Header {
            version: self.buf[4],
            columns,
            terminator,
            scales,
        }))
    }
}

/// End-of-stream facts that are only known once the input is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Trailer {
    pub trailing_terminator: bool,
    pub rows: u64,
}

impl Trailer {
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(if self.trailing_terminator {
            END_TRAILING_TERMINATOR
        } else {
            0
        });
        out.extend_from_slice(&self.rows.to_le_bytes());
    }

    /// Parses a trailer found at byte `offset` of the stream.
    pub(crate) fn parse(bytes: &[u8; TRAILER_LEN], offset: u64) -> Result<Self> {
        let flags = bytes[0];
        if flags & !END_TRAILING_TERMINATOR != 0 {
            return Err(Error::corruption(offset, "unknown trailer flags"));
        }
        let mut rows = [0u8; 8];
        rows.copy_from_slice(&bytes[1..]);
        Ok(Trailer {
            trailing_terminator: flags & END_TRAILING_TERMINATOR != 0,
            rows: u64::from_le_bytes(rows),
        })
    }
}

/// Layout summary of a bncsv stream, readable without decoding it.
///
/// # Examples
///
/// ```rust
/// use bncsv::{encode_to_vec, read_header, Terminator};
///
/// let binary = encode_to_vec(b"1.5,2.25\r\n3.5,4.25\r\n").unwrap();
/// let info = read_header(&binary).unwrap();
/// assert_eq!(info.columns, 2);
/// assert_eq!(info.terminator, Terminator::CrLf);
/// assert_eq!(info.uniform_scale, None);
/// assert_eq!(info.column_scales, vec![1, 2]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub version: u8,
    pub columns: u32,
    pub terminator: Terminator,
    pub uniform_scale: Option<u8>,
    /// Per-column scales; empty when `uniform_scale` is set.
    pub column_scales: Vec<u8>,
    pub header_len: usize,
}

impl From<&Header> for FormatInfo {
    fn from(header: &Header) -> Self {
        let (uniform_scale, column_scales) = match &header.scales {
            Scales::Uniform(scale) => (Some(*scale), Vec::new()),
            Scales::PerColumn(scales) => (None, scales.clone()),
        };
        FormatInfo {
            version: header.version,
            columns: header.columns,
            terminator: header.terminator,
            uniform_scale,
            column_scales,
            header_len: header.encoded_len(),
        }
    }
}

/// Reads the header at the start of `bytes`.
///
/// Only the header is examined; records and trailer are not validated.
///
/// # Errors
///
/// Returns [`Error::UnsupportedVersion`] for an unknown version and
/// [`Error::Corruption`] for a bad or truncated header.
pub fn read_header(bytes: &[u8]) -> Result<FormatInfo> {
    let mut reader = HeaderReader::new();
    for &byte in bytes {
        if let Some(header) = reader.push(byte)? {
            return Ok(FormatInfo::from(&header));
        }
    }
    Err(Error::corruption(reader.len() as u64, "truncated header"))
}
