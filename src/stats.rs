//! Per-call statistics.

use serde::{Deserialize, Serialize};

/// Counters reported by one encode or decode pass.
///
/// `bytes_in` counts what the pass consumed (CSV text when encoding, the
/// binary stream when decoding) and `bytes_out` what it produced.
///
/// # Examples
///
/// ```rust
/// use bncsv::encode;
///
/// let csv = b"42.91,46.02,87.53\n65.55,31.57,3.79\n28.15,42.25,61.99\n13.86,22.85,94.43\n";
/// let mut binary = Vec::new();
/// let stats = encode(&csv[..], &mut binary).unwrap();
/// assert_eq!(stats.rows, 4);
/// assert_eq!(stats.bytes_in, csv.len() as u64);
/// assert!(stats.compression_ratio() < 1.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecStats {
    pub rows: u64,
    pub columns: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl CodecStats {
    /// `bytes_out / bytes_in`; zero for an empty input.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }

    /// Cells processed.
    #[must_use]
    pub fn cells(&self) -> u64 {
        self.rows * self.columns as u64
    }
}
