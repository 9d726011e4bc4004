//! Encode a CSV table and decode it back.
//!
//! Run with: cargo run --example roundtrip

use bncsv::{decode_to_vec, encode_to_vec};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let csv = b"42.91,46.02,87.53\n65.55,31.57,3.79\n28.15,42.25,61.99\n13.86,22.85,94.43\n";

    let binary = encode_to_vec(csv)?;
    println!("CSV:    {} bytes", csv.len());
    println!("bncsv:  {} bytes", binary.len());
    println!("ratio:  {:.2}", binary.len() as f64 / csv.len() as f64);

    let text = decode_to_vec(&binary)?;
    assert_eq!(text, csv);
    println!("\nDecoded:\n{}", String::from_utf8_lossy(&text));

    // Rejections keep their position
    let rejected: [&[u8]; 4] = [b"1,2\n3,4,5\n", b"1,+2\n", b"1,1e5\n", b"1,007\n"];
    for bad in rejected {
        match encode_to_vec(bad) {
            Ok(_) => println!("{:?}: accepted", String::from_utf8_lossy(bad)),
            Err(e) => println!("{:?}: {}", String::from_utf8_lossy(bad), e),
        }
    }

    Ok(())
}
