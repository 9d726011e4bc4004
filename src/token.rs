//! Streaming CSV tokenizer.
//!
//! [`Tokenizer`] pulls chunks from a [`ChunkSource`] and yields one [`Field`]
//! per cell without ever holding more than the current chunk and the current
//! cell. A cell, or the `\r\n` pair that ends a row, may be split across any
//! number of chunks.
//!
//! The tokenizer only checks structure: the byte alphabet, empty cells,
//! terminators and row widths. Whether a cell's digits form a supported number
//! is the canonicalizer's job.
//!
//! Iterating yields owned [`Field`]s. [`Tokenizer::next_field`] lends each cell
//! from one internal buffer instead, which is what the encoder uses.
//!
//! ```rust
//! use bncsv::{CodecOptions, FieldEnd, Tokenizer};
//!
//! let fields: Vec<_> = Tokenizer::new(&b"1,2\n3,4"[..], &CodecOptions::default())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(fields.len(), 4);
//! assert_eq!(fields[3].text, b"4");
//! assert_eq!(fields[3].end, FieldEnd::EndOfStream);
//! ```

use crate::error::{Error, Result};
use crate::format::Terminator;
use crate::io::ChunkSource;
use crate::options::CodecOptions;

/// What followed a cell in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldEnd {
    /// A `,`; more cells follow on the same row.
    Delimiter,
    /// The row ended with this terminator.
    Terminator(Terminator),
    /// The source ended right after the cell, with no terminator.
    EndOfStream,
}

impl FieldEnd {
    pub fn ends_row(self) -> bool {
        !matches!(self, FieldEnd::Delimiter)
    }
}

/// One CSV cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub text: Vec<u8>,
    pub row: usize,
    pub column: usize,
    pub end: FieldEnd,
}

/// One CSV cell borrowed from the tokenizer's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRef<'a> {
    pub text: &'a [u8],
    pub row: usize,
    pub column: usize,
    pub end: FieldEnd,
}

impl FieldRef<'_> {
    pub fn into_field(self) -> Field {
        Field {
            text: self.text.to_vec(),
            row: self.row,
            column: self.column,
            end: self.end,
        }
    }
}

impl<'a> From<&'a Field> for FieldRef<'a> {
    fn from(field: &'a Field) -> Self {
        FieldRef {
            text: &field.text,
            row: field.row,
            column: field.column,
            end: field.end,
        }
    }
}

/// Lazy iterator of [`Field`]s over a chunk source. Fused after the first error.
pub struct Tokenizer<S> {
    source: S,
    chunk: Vec<u8>,
    pos: usize,
    field: Vec<u8>,
    pending_cr: bool,
    row: usize,
    column: usize,
    columns: Option<usize>,
    terminator: Option<Terminator>,
    /// Offset of the next unread byte in the whole stream.
    offset: u64,
    max_field_len: usize,
    done: bool,
}

impl<S: ChunkSource> Tokenizer<S> {
    pub fn new(source: S, options: &CodecOptions) -> Self {
        Tokenizer {
            source,
            chunk: Vec::new(),
            pos: 0,
            field: Vec::with_capacity(32),
            pending_cr: false,
            row: 0,
            column: 0,
            columns: None,
            terminator: None,
            offset: 0,
            max_field_len: options.max_field_len.max(1),
            done: false,
        }
    }

    /// Total bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.offset
    }

    /// Column count fixed by the first row, once it is complete.
    pub fn columns(&self) -> Option<usize> {
        self.columns
    }

    fn malformed(&self, msg: &str) -> Error {
        Error::malformed(self.row, self.column, self.offset.saturating_sub(1), msg)
    }

    /// Validates the current cell and advances the row/column cursor.
    /// Returns the cell's position; its text stays in `self.field`.
    fn emit(&mut self, end: FieldEnd) -> Result<(usize, usize, FieldEnd)> {
        if self.field.is_empty() {
            return Err(self.malformed("empty cell"));
        }
        if let Some(expected) = self.columns {
            if self.column >= expected {
                return Err(Error::shape_mismatch(self.row, expected, self.column + 1));
            }
            if end.ends_row() && self.column + 1 < expected {
                return Err(Error::shape_mismatch(self.row, expected, self.column + 1));
            }
        }
        if let FieldEnd::Terminator(terminator) = end {
            match self.terminator {
                None => self.terminator = Some(terminator),
                Some(first) if first != terminator => {
                    return Err(self.malformed("row terminator differs from the first row"))
                }
                Some(_) => {}
            }
        }

        let position = (self.row, self.column, end);
        if end.ends_row() {
            self.columns.get_or_insert(self.column + 1);
            self.row += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Ok(position)
    }

    /// Handles end of stream; `None` when the input ended on a row boundary.
    fn finish(&mut self) -> Option<Result<(usize, usize, FieldEnd)>> {
        if self.pending_cr {
            return Some(Err(self.malformed("carriage return without line feed")));
        }
        if self.field.is_empty() && self.column == 0 {
            return None;
        }
        Some(self.emit(FieldEnd::EndOfStream))
    }

    fn step(&mut self) -> Option<Result<(usize, usize, FieldEnd)>> {
        loop {
            if self.pos == self.chunk.len() {
                self.pos = 0;
                match self.source.fill_chunk(&mut self.chunk) {
                    Ok(true) => continue,
                    Ok(false) => return self.finish(),
                    Err(e) => return Some(Err(e.into())),
                }
            }

            let byte = self.chunk[self.pos];
            self.pos += 1;
            self.offset += 1;

            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    return Some(self.emit(FieldEnd::Terminator(Terminator::CrLf)));
                }
                return Some(Err(self.malformed("carriage return without line feed")));
            }

            match byte {
                b'0'..=b'9' | b'-' | b'.' => {
                    if self.field.len() == self.max_field_len {
                        return Some(Err(self.malformed(&format!(
                            "cell longer than {} bytes",
                            self.max_field_len
                        ))));
                    }
                    self.field.push(byte);
                }
                b',' => return Some(self.emit(FieldEnd::Delimiter)),
                b'\n' => return Some(self.emit(FieldEnd::Terminator(Terminator::Lf))),
                b'\r' => self.pending_cr = true,
                other => {
                    return Some(Err(self.malformed(&format!(
                        "unexpected byte {:?}",
                        char::from(other)
                    ))))
                }
            }
        }
    }
}

impl<S: ChunkSource> Tokenizer<S> {
    /// Next cell, borrowed until the following call. Fused after an error.
    ///
    /// ```rust
    /// use bncsv::{CodecOptions, Tokenizer};
    ///
    /// let mut tokens = Tokenizer::new(&b"1.5,2\n"[..], &CodecOptions::default());
    /// let first = tokens.next_field().unwrap().unwrap();
    /// assert_eq!(first.text, b"1.5");
    /// assert_eq!(tokens.next_field().unwrap().unwrap().column, 1);
    /// assert!(tokens.next_field().is_none());
    /// ```
    pub fn next_field(&mut self) -> Option<Result<FieldRef<'_>>> {
        if self.done {
            return None;
        }
        self.field.clear();
        match self.step() {
            Some(Ok((row, column, end))) => Some(Ok(FieldRef {
                text: &self.field,
                row,
                column,
                end,
            })),
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<S: ChunkSource> Iterator for Tokenizer<S> {
    type Item = Result<Field>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_field().map(|item| item.map(FieldRef::into_field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::IterSource;

    fn tokenize(input: &[u8]) -> Result<Vec<Field>> {
        Tokenizer::new(input, &CodecOptions::default()).collect()
    }

    fn tokenize_bytewise(input: &[u8]) -> Result<Vec<Field>> {
        let source = IterSource::new(input.chunks(1));
        Tokenizer::new(source, &CodecOptions::default()).collect()
    }

    fn field(text: &str, row: usize, column: usize, end: FieldEnd) -> Field {
        Field {
            text: text.as_bytes().to_vec(),
            row,
            column,
            end,
        }
    }

    #[test]
    fn test_rows_and_columns() {
        let lf = FieldEnd::Terminator(Terminator::Lf);
        let fields = tokenize(b"1.5,-2\n3,4\n").unwrap();
        assert_eq!(
            fields,
            vec![
                field("1.5", 0, 0, FieldEnd::Delimiter),
                field("-2", 0, 1, lf),
                field("3", 1, 0, FieldEnd::Delimiter),
                field("4", 1, 1, lf),
            ]
        );
    }

    #[test]
    fn test_missing_final_terminator() {
        let fields = tokenize(b"1\n2").unwrap();
        assert_eq!(fields[1], field("2", 1, 0, FieldEnd::EndOfStream));
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize(b"").unwrap().is_empty());
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let crlf = FieldEnd::Terminator(Terminator::CrLf);
        let fields = tokenize_bytewise(b"10,20\r\n30,40\r\n").unwrap();
        assert_eq!(fields[1], field("20", 0, 1, crlf));
        assert_eq!(fields[3], field("40", 1, 1, crlf));
    }

    #[test]
    fn test_bytewise_matches_whole() {
        let input = b"42.91,46.02,87.53\n65.55,31.57,3.79\n28.15,42.25,61.99";
        assert_eq!(tokenize(input).unwrap(), tokenize_bytewise(input).unwrap());
    }

    #[test]
    fn test_unexpected_byte() {
        let err = tokenize(b"1,2\n3,x\n").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput {
                row: 1,
                column: 1,
                offset: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_plus_and_exponent_are_malformed() {
        assert!(matches!(
            tokenize(b"+1\n").unwrap_err(),
            Error::MalformedInput { .. }
        ));
        assert!(matches!(
            tokenize(b"1e5\n").unwrap_err(),
            Error::MalformedInput { .. }
        ));
    }

    #[test]
    fn test_empty_cells() {
        let inputs: [&[u8]; 5] = [b"1,,2\n", b"1,\n", b"\n", b"1\n\n", b"1,2,"];
        for input in inputs {
            assert!(
                matches!(tokenize(input).unwrap_err(), Error::MalformedInput { .. }),
                "input {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_lone_carriage_return() {
        assert!(matches!(
            tokenize(b"1\r2\n").unwrap_err(),
            Error::MalformedInput { .. }
        ));
        assert!(matches!(
            tokenize(b"1\r").unwrap_err(),
            Error::MalformedInput { .. }
        ));
    }

    #[test]
    fn test_mixed_terminators() {
        assert!(matches!(
            tokenize(b"1\n2\r\n").unwrap_err(),
            Error::MalformedInput { row: 1, .. }
        ));
    }

    #[test]
    fn test_wide_row() {
        assert_eq!(
            tokenize(b"1,2\n3,4,5\n").unwrap_err(),
            Error::shape_mismatch(1, 2, 3)
        );
    }

    #[test]
    fn test_narrow_row() {
        assert_eq!(
            tokenize(b"1,2\n3\n").unwrap_err(),
            Error::shape_mismatch(1, 2, 1)
        );
        assert_eq!(
            tokenize(b"1,2\n3,4\n5").unwrap_err(),
            Error::shape_mismatch(2, 2, 1)
        );
    }

    #[test]
    fn test_field_length_limit() {
        let options = CodecOptions::new().with_max_field_len(4);
        let ok: Result<Vec<_>> = Tokenizer::new(&b"1234\n"[..], &options).collect();
        assert!(ok.is_ok());
        let err: Result<Vec<_>> = Tokenizer::new(&b"12345\n"[..], &options).collect();
        assert!(matches!(err.unwrap_err(), Error::MalformedInput { .. }));
    }

    #[test]
    fn test_fused_after_error() {
        let mut tokens = Tokenizer::new(&b"1,x,2\n"[..], &CodecOptions::default());
        assert!(tokens.next().unwrap().is_ok());
        assert!(tokens.next().unwrap().is_err());
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_next_field_reuses_one_buffer() {
        let mut tokens = Tokenizer::new(&b"1.5,22,333\n4,5,6\n"[..], &CodecOptions::default());
        let first = tokens.next_field().unwrap().unwrap().text.as_ptr();
        let mut cells = 1;
        while let Some(field) = tokens.next_field() {
            assert_eq!(field.unwrap().text.as_ptr(), first);
            cells += 1;
        }
        assert_eq!(cells, 6);
    }

    #[test]
    fn test_next_field_matches_iterator() {
        let input = b"1,-2.5\r\n3,4\r\n";
        let owned = tokenize(input).unwrap();
        let mut tokens = Tokenizer::new(&input[..], &CodecOptions::default());
        let mut borrowed = Vec::new();
        while let Some(field) = tokens.next_field() {
            borrowed.push(field.unwrap().into_field());
        }
        assert_eq!(borrowed, owned);
        assert_eq!(FieldRef::from(&owned[1]).text, b"-2.5");
    }

    #[test]
    fn test_bytes_read_and_columns() {
        let mut tokens = Tokenizer::new(&b"1,2\n"[..], &CodecOptions::default());
        assert_eq!(tokens.columns(), None);
        tokens.by_ref().for_each(drop);
        assert_eq!(tokens.columns(), Some(2));
        assert_eq!(tokens.bytes_read(), 4);
    }
}
