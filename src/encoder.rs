//! CSV to bncsv encoding.
//!
//! [`Encoder`] is a push state machine: hand it [`Field`]s in order and it
//! writes the binary stream to a [`ChunkSink`]. Most callers go through
//! [`encode`](crate::encode), which wires a [`Tokenizer`](crate::Tokenizer) to
//! an `Encoder`.
//!
//! Cells are buffered until their row is complete and only then written, so a
//! row that fails (bad number, wrong width) produces no output at all. An
//! encoder that has returned an error keeps returning it. The
//! header goes out with the first complete row, since that row fixes the column
//! count and the default scales.
//!
//! ## Direct Encoder Usage
//!
//! ```rust
//! use bncsv::{decode_to_vec, CodecOptions, Encoder, Field, FieldEnd, Terminator};
//!
//! let mut binary = Vec::new();
//! let mut encoder = Encoder::new(&mut binary, &CodecOptions::default());
//! encoder.push_field(Field {
//!     text: b"-0.5".to_vec(),
//!     row: 0,
//!     column: 0,
//!     end: FieldEnd::Terminator(Terminator::Lf),
//! }).unwrap();
//! let stats = encoder.finish().unwrap();
//! assert_eq!(stats.rows, 1);
//! assert_eq!(decode_to_vec(&binary).unwrap(), b"-0.5\n");
//! ```

use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{
    Header, Scales, Terminator, Trailer, RECORD_EXPLICIT_SCALE, RECORD_FLAG_BITS, RECORD_NEGATIVE,
};
use crate::io::{ChunkSink, ChunkWriter};
use crate::number::{CanonicalNumber, Magnitude};
use crate::options::CodecOptions;
use crate::stats::CodecStats;
use crate::token::{Field, FieldEnd, FieldRef};
use crate::varint;

/// Streaming bncsv encoder.
pub struct Encoder<K> {
    out: ChunkWriter<K>,
    row: Vec<CanonicalNumber>,
    /// Set once the first row is complete.
    header: Option<Header>,
    rows: u64,
    trailing_terminator: bool,
    bytes_in: u64,
    scratch: Vec<u8>,
    /// First error returned; every later call repeats it.
    failed: Option<Error>,
}

impl<K: ChunkSink> Encoder<K> {
    pub fn new(sink: K, options: &CodecOptions) -> Self {
        Encoder {
            out: ChunkWriter::new(sink, options.chunk_size),
            row: Vec::new(),
            header: None,
            rows: 0,
            trailing_terminator: false,
            bytes_in: 0,
            scratch: Vec::with_capacity(64),
            failed: None,
        }
    }

    /// Adds one cell. Writes the row when `field.end` closes it.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedNumericFormat`] when the cell is not a supported
    /// number, [`Error::ShapeMismatch`] when the row is wider or narrower than
    /// the first one, and [`Error::Io`] when the sink fails. After any error
    /// the encoder is spent: later calls return the same error.
    pub fn push_field(&mut self, field: Field) -> Result<()> {
        self.push_field_ref(FieldRef::from(&field))
    }

    /// [`push_field`](Self::push_field) for a cell borrowed from a
    /// [`Tokenizer`](crate::Tokenizer).
    ///
    /// # Errors
    ///
    /// Same as [`push_field`](Self::push_field).
    pub fn push_field_ref(&mut self, field: FieldRef<'_>) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.push(field).map_err(|err| {
            self.failed = Some(err.clone());
            err
        })
    }

    fn push(&mut self, field: FieldRef<'_>) -> Result<()> {
        let number = CanonicalNumber::parse(field.text)
            .map_err(|reason| Error::unsupported_numeric(field.row, field.column, field.text, reason))?;

        if let Some(header) = &self.header {
            let expected = header.columns as usize;
            let found = self.row.len() + 1;
            if found > expected || (found == expected && !field.end.ends_row()) {
                return Err(Error::shape_mismatch(field.row, expected, expected + 1));
            }
            if field.end.ends_row() && found < expected {
                return Err(Error::shape_mismatch(field.row, expected, found));
            }
        }

        self.bytes_in += field.text.len() as u64;
        self.row.push(number);

        match field.end {
            FieldEnd::Delimiter => {
                self.bytes_in += 1;
                Ok(())
            }
            FieldEnd::Terminator(terminator) => {
                self.bytes_in += terminator.as_bytes().len() as u64;
                self.trailing_terminator = true;
                self.end_row(terminator)
            }
            FieldEnd::EndOfStream => {
                self.trailing_terminator = false;
                self.end_row(Terminator::default())
            }
        }
    }

    fn end_row(&mut self, terminator: Terminator) -> Result<()> {
        if self.header.is_none() {
            self.write_header(terminator)?;
        }
        let Some(header) = &self.header else {
            return Ok(());
        };

        self.scratch.clear();
        for (column, number) in self.row.iter().enumerate() {
            write_record(number, header.scales.get(column), &mut self.scratch);
        }
        self.row.clear();
        self.rows += 1;
        self.out.write(&self.scratch)?;
        Ok(())
    }

    fn write_header(&mut self, terminator: Terminator) -> Result<()> {
        let columns = u32::try_from(self.row.len())
            .map_err(|_| Error::shape_mismatch(0, u32::MAX as usize, self.row.len()))?;
        let scales: Vec<u8> = self.row.iter().map(CanonicalNumber::scale).collect();
        let header = Header::new(columns, terminator, Scales::from_row(&scales));

        self.scratch.clear();
        header.write(&mut self.scratch);
        self.out.write(&self.scratch)?;
        debug!(
            columns,
            uniform_scale = matches!(header.scales, Scales::Uniform(_)),
            crlf = terminator == Terminator::CrLf,
            "wrote bncsv header"
        );
        self.header = Some(header);
        Ok(())
    }

    /// Writes the trailer and flushes everything to the sink.
    ///
    /// An encoder that never saw a field writes the empty-document header.
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] when a row is still open (its last field did
    /// not end the row), [`Error::Io`] when the sink fails, or the error an
    /// earlier call already returned.
    pub fn finish(mut self) -> Result<CodecStats> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        if !self.row.is_empty() {
            let expected = self.header.as_ref().map_or(self.row.len(), |h| h.columns as usize);
            return Err(Error::shape_mismatch(self.rows as usize, expected, self.row.len()));
        }
        if self.header.is_none() {
            self.write_header(Terminator::default())?;
        }

        let trailer = Trailer {
            trailing_terminator: self.trailing_terminator,
            rows: self.rows,
        };
        self.scratch.clear();
        trailer.write(&mut self.scratch);
        self.out.write(&self.scratch)?;
        self.out.flush()?;

        let stats = CodecStats {
            rows: self.rows,
            columns: self.header.as_ref().map_or(0, |h| h.columns as usize),
            bytes_in: self.bytes_in,
            bytes_out: self.out.written(),
        };
        debug!(
            rows = stats.rows,
            columns = stats.columns,
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            "encode finished"
        );
        Ok(stats)
    }
}

/// Appends one record: the flagged varint word and, when the scale differs
/// from the column default, the scale byte.
fn write_record(number: &CanonicalNumber, default_scale: u8, out: &mut Vec<u8>) {
    let mut flags = 0u8;
    if number.is_negative() {
        flags |= RECORD_NEGATIVE;
    }
    let explicit = number.scale() != default_scale;
    if explicit {
        flags |= RECORD_EXPLICIT_SCALE;
    }

    match number.magnitude() {
        Magnitude::Small(value) => {
            varint::write_u128((value << RECORD_FLAG_BITS) | u128::from(flags), out)
        }
        Magnitude::Big(value) => {
            let word = (value << RECORD_FLAG_BITS as usize) + u32::from(flags);
            varint::write_big(&word, out)
        }
    }
    if explicit {
        out.push(number.scale());
    }
}
