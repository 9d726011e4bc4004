//! Canonical fixed-point decimals.
//!
//! A [`CanonicalNumber`] holds exactly what is needed to write a CSV cell back
//! byte for byte: the sign, the digits, and how many of those digits follow the
//! decimal point (the *scale*). `-0.50` keeps its sign, its trailing zero and
//! its scale of 2; nothing is normalized.
//!
//! Only one spelling per number is accepted, so parsing and rendering are
//! strict inverses:
//!
//! ```text
//! number   = ["-"] integer ["." fraction]
//! integer  = "0" | nonzero *digit
//! fraction = 1*digit                      ; at most 255 digits
//! ```
//!
//! `+1`, `1e5`, `01`, `.5` and `1.` are rejected with a
//! [`NumericFormatError`] rather than rewritten.
//!
//! ```rust
//! use bncsv::CanonicalNumber;
//!
//! let n = CanonicalNumber::parse(b"-0.50").unwrap();
//! assert!(n.is_negative());
//! assert_eq!(n.scale(), 2);
//! assert_eq!(n.to_text(), b"-0.50");
//! ```

use std::fmt;

use num_bigint::BigUint;

use crate::error::NumericFormatError;

/// Largest number of fraction digits a value may carry.
pub const MAX_SCALE: usize = u8::MAX as usize;

/// Significant digits that always fit a `u128` magnitude with room for the
/// two record flag bits.
pub(crate) const SMALL_DIGITS: usize = 36;

/// The digits of a number read as one unsigned integer, `value * 10^scale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Magnitude {
    Small(u128),
    Big(BigUint),
}

/// A decimal number that remembers its exact spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalNumber {
    negative: bool,
    /// ASCII digits, integer part followed by fraction part.
    digits: Vec<u8>,
    scale: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseState {
    AwaitingField,
    AfterSign,
    AfterZero,
    AccumulatingInteger,
    AfterPoint,
    AccumulatingFraction,
}

impl CanonicalNumber {
    /// Parses one CSV cell.
    ///
    /// # Errors
    ///
    /// Returns a [`NumericFormatError`] for any text outside the supported
    /// grammar.
    pub fn parse(text: &[u8]) -> Result<Self, NumericFormatError> {
        let mut state = ParseState::AwaitingField;
        let mut negative = false;
        let mut digits = Vec::with_capacity(text.len());
        let mut scale = 0usize;

        for (position, &byte) in text.iter().enumerate() {
            state = match (state, byte) {
                (ParseState::AwaitingField, b'-') => {
                    negative = true;
                    ParseState::AfterSign
                }
                (ParseState::AwaitingField | ParseState::AfterSign, b'0') => {
                    digits.push(byte);
                    ParseState::AfterZero
                }
                (ParseState::AwaitingField | ParseState::AfterSign, b'1'..=b'9') => {
                    digits.push(byte);
                    ParseState::AccumulatingInteger
                }
                (ParseState::AwaitingField | ParseState::AfterSign, b'.') => {
                    return Err(NumericFormatError::MissingIntegerDigits)
                }
                (ParseState::AfterZero, b'0'..=b'9') => return Err(NumericFormatError::LeadingZero),
                (ParseState::AccumulatingInteger, b'0'..=b'9') => {
                    digits.push(byte);
                    ParseState::AccumulatingInteger
                }
                (ParseState::AfterZero | ParseState::AccumulatingInteger, b'.') => {
                    ParseState::AfterPoint
                }
                (ParseState::AfterPoint | ParseState::AccumulatingFraction, b'0'..=b'9') => {
                    digits.push(byte);
                    scale += 1;
                    ParseState::AccumulatingFraction
                }
                _ => return Err(NumericFormatError::UnexpectedByte { position, byte }),
            };
        }

        match state {
            ParseState::AwaitingField => Err(NumericFormatError::Empty),
            ParseState::AfterSign => Err(NumericFormatError::MissingIntegerDigits),
            ParseState::AfterPoint => Err(NumericFormatError::MissingFractionDigits),
            _ if scale > MAX_SCALE => Err(NumericFormatError::ScaleTooLarge {
                scale,
                max: MAX_SCALE,
            }),
            _ => Ok(CanonicalNumber {
                negative,
                digits,
                scale: scale as u8,
            }),
        }
    }

    /// Rebuilds a number from its sign, magnitude and scale.
    ///
    /// Zeros are padded on the left so that the integer part is never empty,
    /// which makes `from_magnitude(n.is_negative(), &n.magnitude(), n.scale())`
    /// return `n` for every parsed `n`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bncsv::{CanonicalNumber, Magnitude};
    ///
    /// let n = CanonicalNumber::from_magnitude(false, &Magnitude::Small(5), 3);
    /// assert_eq!(n.to_string(), "0.005");
    /// ```
    pub fn from_magnitude(negative: bool, magnitude: &Magnitude, scale: u8) -> Self {
        let rendered = match magnitude {
            Magnitude::Small(value) => value.to_string(),
            Magnitude::Big(value) => value.to_str_radix(10),
        };
        let width = scale as usize + 1;
        let mut digits = Vec::with_capacity(rendered.len().max(width));
        digits.resize(width.saturating_sub(rendered.len()), b'0');
        digits.extend_from_slice(rendered.as_bytes());
        CanonicalNumber {
            negative,
            digits,
            scale,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Number of digits after the decimal point; zero means no point.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn integer_digits(&self) -> &[u8] {
        &self.digits[..self.digits.len() - self.scale as usize]
    }

    pub fn fraction_digits(&self) -> &[u8] {
        &self.digits[self.digits.len() - self.scale as usize..]
    }

    /// The digits as one unsigned integer, ignoring the decimal point.
    pub fn magnitude(&self) -> Magnitude {
        let first = self
            .digits
            .iter()
            .position(|&d| d != b'0')
            .unwrap_or(self.digits.len());
        let significant = &self.digits[first..];

        if significant.len() <= SMALL_DIGITS {
            let value = significant
                .iter()
                .fold(0u128, |acc, &d| acc * 10 + u128::from(d - b'0'));
            return Magnitude::Small(value);
        }

        let mut value = BigUint::from(0u8);
        for piece in significant.chunks(19) {
            let part = piece
                .iter()
                .fold(0u64, |acc, &d| acc * 10 + u64::from(d - b'0'));
            value = value * 10u64.pow(piece.len() as u32) + part;
        }
        Magnitude::Big(value)
    }

    /// Appends the original text of this number to `out`.
    pub fn write_text(&self, out: &mut Vec<u8>) {
        if self.negative {
            out.push(b'-');
        }
        out.extend_from_slice(self.integer_digits());
        if self.scale > 0 {
            out.push(b'.');
            out.extend_from_slice(self.fraction_digits());
        }
    }

    #[must_use]
    pub fn to_text(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.digits.len() + 2);
        self.write_text(&mut out);
        out
    }
}

impl fmt::Display for CanonicalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // digits, '-' and '.' are ASCII
        f.write_str(&String::from_utf8_lossy(&self.to_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str) {
        let n = CanonicalNumber::parse(text.as_bytes()).unwrap();
        assert_eq!(n.to_text(), text.as_bytes(), "render of {text}");
        let rebuilt = CanonicalNumber::from_magnitude(n.is_negative(), &n.magnitude(), n.scale());
        assert_eq!(rebuilt, n, "magnitude rebuild of {text}");
    }

    #[test]
    fn test_roundtrip_supported_spellings() {
        for text in [
            "0", "-0", "7", "42", "-42", "0.0", "-0.0", "0.05", "1.50", "-3.79", "1000",
            "123456789.000000001", "0.000",
        ] {
            roundtrip(text);
        }
    }

    #[test]
    fn test_parts() {
        let n = CanonicalNumber::parse(b"-12.340").unwrap();
        assert!(n.is_negative());
        assert_eq!(n.integer_digits(), b"12");
        assert_eq!(n.fraction_digits(), b"340");
        assert_eq!(n.scale(), 3);
        assert_eq!(n.magnitude(), Magnitude::Small(12340));
    }

    #[test]
    fn test_zero_magnitude_keeps_scale() {
        let n = CanonicalNumber::parse(b"0.00").unwrap();
        assert_eq!(n.magnitude(), Magnitude::Small(0));
        assert_eq!(
            CanonicalNumber::from_magnitude(false, &Magnitude::Small(0), 2).to_string(),
            "0.00"
        );
    }

    #[test]
    fn test_big_magnitude() {
        let text = "-123456789012345678901234567890123456789.5";
        let n = CanonicalNumber::parse(text.as_bytes()).unwrap();
        assert!(matches!(n.magnitude(), Magnitude::Big(_)));
        roundtrip(text);
    }

    #[test]
    fn test_leading_fraction_zeros_stay_small() {
        let text = format!("0.{}1", "0".repeat(60));
        let n = CanonicalNumber::parse(text.as_bytes()).unwrap();
        assert_eq!(n.magnitude(), Magnitude::Small(1));
        roundtrip(&text);
    }

    #[test]
    fn test_rejections() {
        use NumericFormatError::*;
        let cases: &[(&str, NumericFormatError)] = &[
            ("", Empty),
            ("-", MissingIntegerDigits),
            (".5", MissingIntegerDigits),
            ("-.5", MissingIntegerDigits),
            ("01", LeadingZero),
            ("-00.1", LeadingZero),
            ("1.", MissingFractionDigits),
            ("+1", UnexpectedByte { position: 0, byte: b'+' }),
            ("1e5", UnexpectedByte { position: 1, byte: b'e' }),
            ("1.2.3", UnexpectedByte { position: 3, byte: b'.' }),
            ("--1", UnexpectedByte { position: 1, byte: b'-' }),
            ("1-", UnexpectedByte { position: 1, byte: b'-' }),
        ];
        for (text, expected) in cases {
            assert_eq!(
                CanonicalNumber::parse(text.as_bytes()).unwrap_err(),
                *expected,
                "parsing {text:?}"
            );
        }
    }

    #[test]
    fn test_scale_limit() {
        let ok = format!("1.{}", "9".repeat(MAX_SCALE));
        assert_eq!(CanonicalNumber::parse(ok.as_bytes()).unwrap().scale(), 255);

        let too_long = format!("1.{}", "9".repeat(MAX_SCALE + 1));
        assert_eq!(
            CanonicalNumber::parse(too_long.as_bytes()).unwrap_err(),
            NumericFormatError::ScaleTooLarge {
                scale: 256,
                max: MAX_SCALE
            }
        );
    }
}
