//! bncsv to CSV decoding.
//!
//! [`Decoder`] is the push-side inverse of [`Encoder`](crate::Encoder): feed it
//! binary chunks in order, then call [`Decoder::finish`]. Text is written to
//! the sink as records complete.
//!
//! ## Overview
//!
//! - **Header**: validated byte by byte, so a wrong magic or version fails on
//!   the first offending byte
//! - **Records**: read through a look-behind window of [`TRAILER_LEN`] bytes; the
//!   bytes still in the window when the input ends are the trailer
//! - **Rows**: the terminator after a row is held back until either another
//!   record arrives or the trailer says the source ended with one
//!
//! Every error carries the byte offset where the stream went wrong, and a
//! decoder that has returned an error keeps returning it.
//!
//! ```rust
//! use bncsv::{encode_to_vec, CodecOptions, Decoder};
//!
//! let binary = encode_to_vec(b"1,2\n3,4").unwrap();
//! let mut text = Vec::new();
//! let mut decoder = Decoder::new(&mut text, &CodecOptions::default());
//! for chunk in binary.chunks(5) {
//!     decoder.feed(chunk).unwrap();
//! }
//! decoder.finish().unwrap();
//! assert_eq!(text, b"1,2\n3,4");
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{
    Header, HeaderReader, Trailer, RECORD_EXPLICIT_SCALE, RECORD_FLAG_BITS, RECORD_NEGATIVE,
    TRAILER_LEN,
};
use crate::io::{ChunkSink, ChunkWriter};
use crate::number::{CanonicalNumber, Magnitude};
use crate::options::CodecOptions;
use crate::stats::CodecStats;
use crate::varint::{VarintError, VarintReader, Word};

#[derive(Debug)]
enum RecordState {
    AwaitingRecord,
    AccumulatingVarint,
    AwaitingScale { negative: bool, magnitude: Magnitude },
}

/// Streaming bncsv decoder.
pub struct Decoder<K> {
    out: ChunkWriter<K>,
    header_reader: HeaderReader,
    header: Option<Header>,
    tail: VecDeque<u8>,
    varint: VarintReader,
    state: RecordState,
    /// Offset of the next byte handed to the record parser.
    position: u64,
    column: usize,
    rows: u64,
    /// A row is complete but its terminator is not written yet.
    row_pending: bool,
    bytes_in: u64,
    text: Vec<u8>,
    /// First error returned; every later call repeats it.
    failed: Option<Error>,
}

impl<K: ChunkSink> Decoder<K> {
    pub fn new(sink: K, options: &CodecOptions) -> Self {
        Decoder {
            out: ChunkWriter::new(sink, options.chunk_size),
            header_reader: HeaderReader::new(),
            header: None,
            tail: VecDeque::with_capacity(TRAILER_LEN + 1),
            varint: VarintReader::new(options.max_varint_len()),
            state: RecordState::AwaitingRecord,
            position: 0,
            column: 0,
            rows: 0,
            row_pending: false,
            bytes_in: 0,
            text: Vec::with_capacity(64),
            failed: None,
        }
    }

    /// Decoded header, once all of it has arrived.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Feeds the next chunk of the binary stream.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedVersion`] for an unknown header version,
    /// [`Error::Corruption`] for invalid header or record bytes, and
    /// [`Error::Io`] when the sink fails. After any error the decoder is
    /// spent: later calls return the same error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.feed_bytes(chunk).map_err(|err| {
            self.failed = Some(err.clone());
            err
        })
    }

    fn feed_bytes(&mut self, chunk: &[u8]) -> Result<()> {
        for &byte in chunk {
            self.bytes_in += 1;
            if self.header.is_none() {
                self.position += 1;
                if let Some(header) = self.header_reader.push(byte)? {
                    debug!(
                        version = header.version,
                        columns = header.columns,
                        "read bncsv header"
                    );
                    self.header = Some(header);
                }
                continue;
            }

            self.tail.push_back(byte);
            if self.tail.len() > TRAILER_LEN {
                if let Some(byte) = self.tail.pop_front() {
                    self.record_byte(byte)?;
                }
            }
        }
        Ok(())
    }

    fn record_byte(&mut self, byte: u8) -> Result<()> {
        let offset = self.position;
        self.position += 1;

        let columns = self.header.as_ref().map_or(0, |h| h.columns as usize);
        if columns == 0 {
            return Err(Error::corruption(offset, "record data in a zero-column stream"));
        }

        match std::mem::replace(&mut self.state, RecordState::AwaitingRecord) {
            RecordState::AwaitingScale {
                negative,
                magnitude,
            } => {
                if byte == self.column_scale() {
                    return Err(Error::corruption(
                        offset,
                        "explicit scale equals the column scale",
                    ));
                }
                self.emit(negative, &magnitude, byte, columns)
            }
            RecordState::AwaitingRecord | RecordState::AccumulatingVarint => {
                let word = match self.varint.push(byte) {
                    Ok(Some(word)) => word,
                    Ok(None) => {
                        self.state = RecordState::AccumulatingVarint;
                        return Ok(());
                    }
                    Err(VarintError::TooLong) => {
                        return Err(Error::corruption(offset, "varint longer than any valid cell"))
                    }
                    Err(VarintError::NonMinimal) => {
                        return Err(Error::corruption(offset, "non-minimal varint"))
                    }
                };

                let (flags, magnitude) = split_word(word);
                let negative = flags & RECORD_NEGATIVE != 0;
                if flags & RECORD_EXPLICIT_SCALE != 0 {
                    self.state = RecordState::AwaitingScale {
                        negative,
                        magnitude,
                    };
                    return Ok(());
                }
                let scale = self.column_scale();
                self.emit(negative, &magnitude, scale, columns)
            }
        }
    }

    fn column_scale(&self) -> u8 {
        self.header
            .as_ref()
            .map_or(0, |h| h.scales.get(self.column))
    }

    /// Renders one cell and the separator that precedes it.
    fn emit(&mut self, negative: bool, magnitude: &Magnitude, scale: u8, columns: usize) -> Result<()> {
        self.text.clear();
        if self.row_pending {
            self.write_terminator_into_text();
            self.row_pending = false;
        }
        CanonicalNumber::from_magnitude(negative, magnitude, scale).write_text(&mut self.text);

        self.column += 1;
        if self.column == columns {
            self.column = 0;
            self.rows += 1;
            self.row_pending = true;
        } else {
            self.text.push(b',');
        }
        self.out.write(&self.text)?;
        Ok(())
    }

    fn write_terminator_into_text(&mut self) {
        if let Some(header) = &self.header {
            self.text.extend_from_slice(header.terminator.as_bytes());
        }
    }

    /// Validates the end of the stream and flushes the remaining text.
    ///
    /// # Errors
    ///
    /// [`Error::Corruption`] for a truncated header, record or trailer, a
    /// partial final row, or a trailer that disagrees with the records seen;
    /// or the error an earlier [`feed`](Self::feed) already returned.
    pub fn finish(mut self) -> Result<CodecStats> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        let Some(header) = self.header.take() else {
            return Err(Error::corruption(self.position, "truncated header"));
        };
        let trailer_offset = self.position;
        if self.tail.len() < TRAILER_LEN {
            return Err(Error::corruption(trailer_offset, "truncated trailer"));
        }
        if !matches!(self.state, RecordState::AwaitingRecord) || !self.varint.is_empty() {
            return Err(Error::corruption(trailer_offset, "truncated record"));
        }
        if self.column != 0 {
            return Err(Error::corruption(
                trailer_offset,
                "partial final row: record count is not a multiple of the column count",
            ));
        }

        let mut bytes = [0u8; TRAILER_LEN];
        for (slot, byte) in bytes.iter_mut().zip(self.tail.iter()) {
            *slot = *byte;
        }
        let trailer = Trailer::parse(&bytes, trailer_offset)?;
        if trailer.rows != self.rows {
            return Err(Error::corruption(
                trailer_offset,
                &format!(
                    "trailer declares {} rows but the stream holds {}",
                    trailer.rows, self.rows
                ),
            ));
        }
        if trailer.trailing_terminator {
            if self.rows == 0 {
                return Err(Error::corruption(
                    trailer_offset,
                    "trailing terminator flag on an empty document",
                ));
            }
            self.out.write(header.terminator.as_bytes())?;
        }
        self.out.flush()?;

        let stats = CodecStats {
            rows: self.rows,
            columns: header.columns as usize,
            bytes_in: self.bytes_in,
            bytes_out: self.out.written(),
        };
        debug!(
            rows = stats.rows,
            columns = stats.columns,
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            "decode finished"
        );
        Ok(stats)
    }
}

/// Splits a record word into its flag bits and the magnitude above them.
fn split_word(word: Word) -> (u8, Magnitude) {
    let mask = (1u8 << RECORD_FLAG_BITS) - 1;
    match word {
        Word::Small(value) => (
            (value as u8) & mask,
            Magnitude::Small(value >> RECORD_FLAG_BITS),
        ),
        Word::Big(value) => {
            let flags = value.to_radix_le(128).first().copied().unwrap_or(0) & mask;
            (flags, Magnitude::Big(value >> RECORD_FLAG_BITS as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode_to_vec;

    fn decode_chunks(binary: &[u8], chunk: usize) -> Result<Vec<u8>> {
        let mut text = Vec::new();
        let mut decoder = Decoder::new(&mut text, &CodecOptions::new().with_chunk_size(3));
        for piece in binary.chunks(chunk.max(1)) {
            decoder.feed(piece)?;
        }
        decoder.finish()?;
        Ok(text)
    }

    #[test]
    fn test_decodes_hand_built_stream() {
        let binary = b"BNCS\x01\x00\x02\x00\x00\x00\x00\x00\x01\x02\x3c\x85\x07\x01\x01\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(decode_chunks(binary, 1).unwrap(), b"1.5,-2.25\n");
    }

    #[test]
    fn test_explicit_scale_record() {
        // uniform scale 1, second record carries explicit scale 2
        let binary = b"BNCS\x01\x01\x02\x00\x00\x00\x01\x00\x3c\xda\x04\x02\x00\x01\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(decode_chunks(binary, 4).unwrap(), b"1.5,1.50");
    }

    #[test]
    fn test_empty_stream() {
        let binary = encode_to_vec(b"").unwrap();
        assert_eq!(decode_chunks(&binary, 1).unwrap(), b"");
    }

    #[test]
    fn test_no_input_is_truncated_header() {
        assert_eq!(
            decode_chunks(b"", 1).unwrap_err(),
            Error::corruption(0, "truncated header")
        );
    }

    #[test]
    fn test_missing_trailer() {
        let binary = encode_to_vec(b"1,2\n").unwrap();
        let cut = &binary[..binary.len() - 9];
        assert!(matches!(
            decode_chunks(cut, 1).unwrap_err(),
            Error::Corruption { .. }
        ));
    }

    #[test]
    fn test_truncated_varint() {
        // a dangling continuation byte before the trailer
        let mut binary = b"BNCS\x01\x01\x01\x00\x00\x00\x00\x00".to_vec();
        binary.push(0x80);
        binary.extend_from_slice(b"\x00\x00\x00\x00\x00\x00\x00\x00\x00");
        assert_eq!(
            decode_chunks(&binary, 1).unwrap_err(),
            Error::corruption(13, "truncated record")
        );
    }

    #[test]
    fn test_partial_row() {
        let mut binary = b"BNCS\x01\x01\x02\x00\x00\x00\x00\x00".to_vec();
        binary.push(0x04);
        binary.extend_from_slice(b"\x00\x00\x00\x00\x00\x00\x00\x00\x00");
        assert!(matches!(
            decode_chunks(&binary, 2).unwrap_err(),
            Error::Corruption { offset: 13, ref msg } if msg.contains("partial final row")
        ));
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut binary = encode_to_vec(b"1\n2\n").unwrap();
        let len = binary.len();
        binary[len - 8] = 3;
        assert!(matches!(
            decode_chunks(&binary, 7).unwrap_err(),
            Error::Corruption { ref msg, .. } if msg.contains("declares 3 rows")
        ));
    }

    #[test]
    fn test_records_in_zero_column_stream() {
        let mut binary = encode_to_vec(b"").unwrap();
        binary.insert(12, 0x00);
        assert_eq!(
            decode_chunks(&binary, 1).unwrap_err(),
            Error::corruption(12, "record data in a zero-column stream")
        );
    }

    #[test]
    fn test_terminator_flag_on_empty_document() {
        let mut binary = encode_to_vec(b"").unwrap();
        binary[12] = 0x01;
        assert!(matches!(
            decode_chunks(&binary, 1).unwrap_err(),
            Error::Corruption { ref msg, .. } if msg.contains("empty document")
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut binary = encode_to_vec(b"1\n").unwrap();
        binary[4] = 2;
        assert_eq!(
            decode_chunks(&binary, 1).unwrap_err(),
            Error::unsupported_version(2, 1)
        );
    }

    #[test]
    fn test_overlong_varint_limit() {
        let options = CodecOptions::new().with_max_field_len(3);
        let mut binary = b"BNCS\x01\x01\x01\x00\x00\x00\x00\x00".to_vec();
        binary.extend_from_slice(&[0xff; 8]);
        binary.push(0x01);
        binary.extend_from_slice(b"\x00\x01\x00\x00\x00\x00\x00\x00\x00");
        let mut text = Vec::new();
        let mut decoder = Decoder::new(&mut text, &options);
        assert!(matches!(
            decoder.feed(&binary).unwrap_err(),
            Error::Corruption { ref msg, .. } if msg.contains("varint longer")
        ));
    }

    #[test]
    fn test_error_is_sticky() {
        let mut binary = encode_to_vec(b"1\n").unwrap();
        binary[4] = 9;
        let mut text = Vec::new();
        let mut decoder = Decoder::new(&mut text, &CodecOptions::default());
        let err = decoder.feed(&binary[..5]).unwrap_err();
        assert_eq!(err, Error::unsupported_version(9, 1));
        assert_eq!(decoder.feed(&binary[5..]).unwrap_err(), err);
        assert_eq!(decoder.finish().unwrap_err(), err);
        assert!(text.is_empty());
    }

    #[test]
    fn test_corruption_is_sticky() {
        let mut binary = encode_to_vec(b"1\n2\n").unwrap();
        binary[12] = 0x80;
        binary[13] = 0x00;
        let mut text = Vec::new();
        let mut decoder = Decoder::new(&mut text, &CodecOptions::default());
        let err = decoder.feed(&binary).unwrap_err();
        assert_eq!(err, Error::corruption(13, "non-minimal varint"));
        assert_eq!(decoder.feed(&[]).unwrap_err(), err);
        assert_eq!(decoder.finish().unwrap_err(), err);
    }

    #[test]
    fn test_redundant_scale_byte() {
        // uniform scale 1, second record repeats scale 1 explicitly
        let binary = b"BNCS\x01\x01\x02\x00\x00\x00\x01\x00\x3c\x3e\x01\x00\x01\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(
            decode_chunks(binary, 1).unwrap_err(),
            Error::corruption(14, "explicit scale equals the column scale")
        );
    }

    #[test]
    fn test_header_is_exposed() {
        let binary = encode_to_vec(b"1.5,2.5\n").unwrap();
        let mut text = Vec::new();
        let mut decoder = Decoder::new(&mut text, &CodecOptions::default());
        assert!(decoder.header().is_none());
        decoder.feed(&binary[..12]).unwrap();
        assert_eq!(decoder.header().map(|h| h.columns), Some(2));
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word(Word::Small(901)), (1, Magnitude::Small(225)));
        let big = num_bigint::BigUint::from(u128::MAX) * 4u32 + 3u32;
        let (flags, magnitude) = split_word(Word::Big(big));
        assert_eq!(flags, 3);
        assert_eq!(magnitude, Magnitude::Big(num_bigint::BigUint::from(u128::MAX)));
    }
}
