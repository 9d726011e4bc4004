//! Error types for bncsv encoding and decoding.
//!
//! Every error is fatal to the call that produced it. There is no
//! skip-and-continue mode: dropping or substituting a field would break the
//! byte-exact round-trip that the format promises.
//!
//! ## Error Categories
//!
//! - **Malformed input**: a byte outside the CSV alphabet, an empty cell, a
//!   lone carriage return (tokenizer)
//! - **Unsupported numeric format**: text the canonicalizer cannot reproduce
//!   exactly, such as `+1`, `01` or `.5`
//! - **Shape mismatch**: a row whose width differs from the first row
//! - **Unsupported version**: a bncsv header written by a newer format revision
//! - **Corruption**: a truncated or structurally invalid binary stream
//!
//! Text-side errors carry the row and column of the offending cell, binary-side
//! errors carry the byte offset in the bncsv stream.
//!
//! ## Examples
//!
//! ```rust
//! use bncsv::{encode_to_vec, Error};
//!
//! let err = encode_to_vec(b"1,2\n3,4,5\n").unwrap_err();
//! assert!(matches!(err, Error::ShapeMismatch { row: 1, expected: 2, .. }));
//! assert!(err.to_string().contains("row 1"));
//! ```

use std::io;
use thiserror::Error;

/// Represents all possible errors raised by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// IO error raised by a chunk source or sink
    #[error("IO error: {0}")]
    Io(String),

    /// Unexpected byte or structure in the CSV text
    #[error("Malformed input at row {row}, column {column} (byte offset {offset}): {msg}")]
    MalformedInput {
        row: usize,
        column: usize,
        offset: u64,
        msg: String,
    },

    /// Numeric text that cannot be reproduced byte for byte
    #[error("Unsupported numeric format at row {row}, column {column}: {text:?} ({reason})")]
    UnsupportedNumericFormat {
        row: usize,
        column: usize,
        text: String,
        #[source]
        reason: NumericFormatError,
    },

    /// Row width differs from the width fixed by the first row
    #[error("Shape mismatch at row {row}: expected {expected} columns, found {found}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Binary header carries a version this decoder does not know
    #[error("Unsupported bncsv version {found} (supported: {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    /// Truncated or structurally invalid binary stream
    #[error("Corrupt bncsv stream at byte offset {offset}: {msg}")]
    Corruption { offset: u64, msg: String },
}

impl Error {
    /// Creates a malformed input error for the cell at `row`/`column`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bncsv::Error;
    ///
    /// let err = Error::malformed(3, 1, 17, "unexpected byte 'x'");
    /// assert!(err.to_string().contains("row 3, column 1"));
    /// ```
    pub fn malformed(row: usize, column: usize, offset: u64, msg: &str) -> Self {
        Error::MalformedInput {
            row,
            column,
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported numeric format error, keeping the offending text.
    pub fn unsupported_numeric(
        row: usize,
        column: usize,
        text: &[u8],
        reason: NumericFormatError,
    ) -> Self {
        Error::UnsupportedNumericFormat {
            row,
            column,
            text: String::from_utf8_lossy(text).into_owned(),
            reason,
        }
    }

    /// Creates a shape mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bncsv::Error;
    ///
    /// let err = Error::shape_mismatch(1, 2, 3);
    /// assert!(err.to_string().contains("expected 2 columns, found 3"));
    /// ```
    pub fn shape_mismatch(row: usize, expected: usize, found: usize) -> Self {
        Error::ShapeMismatch {
            row,
            expected,
            found,
        }
    }

    /// Creates an unsupported version error.
    pub fn unsupported_version(found: u8, supported: u8) -> Self {
        Error::UnsupportedVersion { found, supported }
    }

    /// Creates a corruption error located at `offset` in the binary stream.
    pub fn corruption(offset: u64, msg: &str) -> Self {
        Error::Corruption {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an I/O error for source or sink failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(&err.to_string())
    }
}

/// Why a numeric field falls outside the supported grammar.
///
/// The grammar is `-? (0 | [1-9][0-9]*) (\. [0-9]+)?`; anything else would
/// need normalization to encode, and normalization loses the original text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericFormatError {
    #[error("empty number")]
    Empty,

    #[error("missing integer digits")]
    MissingIntegerDigits,

    #[error("leading zero in integer part")]
    LeadingZero,

    #[error("missing digits after decimal point")]
    MissingFractionDigits,

    #[error("unexpected byte {byte:#04x} at position {position}")]
    UnexpectedByte { position: usize, byte: u8 },

    #[error("{scale} fraction digits exceed the maximum of {max}")]
    ScaleTooLarge { scale: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
