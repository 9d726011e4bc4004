//! Print the layout of a bncsv file as JSON.
//!
//! Run with: cargo run --example inspect -- data.bncsv
//!
//! Without an argument a small sample stream is inspected.

use bncsv::{decode, encode_to_vec, read_header, CodecStats};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io;

#[derive(Serialize)]
struct Report {
    header: bncsv::FormatInfo,
    stats: CodecStats,
}

fn main() -> Result<(), Box<dyn Error>> {
    let binary = match std::env::args().nth(1) {
        Some(path) => fs::read(path)?,
        None => encode_to_vec(b"1.5,-2.25,3\r\n4.0,5.75,-6\r\n")?,
    };

    let header = read_header(&binary)?;
    let stats = decode(binary.as_slice(), io::sink())?;

    let report = Report { header, stats };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
