//! Configuration options for the codec.
//!
//! [`CodecOptions`] carries the two knobs of a streaming pass:
//!
//! - `chunk_size`: how many output bytes are buffered before they are pushed
//!   to the sink, and the default read size of [`ReadSource`](crate::ReadSource)
//! - `max_field_len`: the longest CSV cell accepted by the tokenizer, which
//!   also bounds how long a varint the decoder will accept
//!
//! Neither affects the bytes produced: a pass with `chunk_size` 1 writes the
//! same stream as a pass with the default.
//!
//! ## Examples
//!
//! ```rust
//! use bncsv::{encode_with_options, CodecOptions};
//!
//! let options = CodecOptions::new().with_chunk_size(64).with_max_field_len(32);
//! let mut out = Vec::new();
//! encode_with_options(&b"1.5,2.5\n"[..], &mut out, &options).unwrap();
//! ```

use serde::{Deserialize, Serialize};

/// Default output chunk size and read size, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default upper bound on the length of one CSV cell, in bytes.
pub const DEFAULT_MAX_FIELD_LEN: usize = 4096;

/// Configuration for one encode or decode pass.
///
/// # Examples
///
/// ```rust
/// use bncsv::CodecOptions;
///
/// let options = CodecOptions::default();
/// assert_eq!(options.chunk_size, 4096);
/// assert_eq!(options.max_field_len, 4096);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub chunk_size: usize,
    pub max_field_len: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}

impl CodecOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output flush threshold. Zero is treated as one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bncsv::CodecOptions;
    ///
    /// let options = CodecOptions::new().with_chunk_size(0);
    /// assert_eq!(options.chunk_size, 1);
    /// ```
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the longest accepted CSV cell. Zero is treated as one.
    #[must_use]
    pub fn with_max_field_len(mut self, max_field_len: usize) -> Self {
        self.max_field_len = max_field_len.max(1);
        self
    }

    /// Longest varint, in bytes, that a cell of `max_field_len` digits can
    /// produce. Anything longer in a binary stream is corruption.
    pub(crate) fn max_varint_len(&self) -> usize {
        // log2(10) < 10/3, plus two flag bits
        let bits = self.max_field_len.saturating_mul(10) / 3 + 3;
        bits / 7 + 1
    }
}
