//! Stream CSV from stdin to bncsv on stdout, or back with `--decode`.
//!
//! Run with:
//!
//! ```text
//! cargo run --example streaming < table.csv > table.bncsv
//! cargo run --example streaming -- --decode < table.bncsv
//! RUST_LOG=debug cargo run --example streaming < table.csv > /dev/null
//! ```

use bncsv::{decode, encode_with_options, CodecOptions, ReadSource};
use std::error::Error;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let decoding = std::env::args().any(|arg| arg == "--decode");
    let options = CodecOptions::new().with_chunk_size(64 * 1024);

    let stdin = io::stdin().lock();
    let mut stdout = BufWriter::new(io::stdout().lock());
    let source = ReadSource::with_chunk_size(stdin, options.chunk_size);

    let stats = if decoding {
        decode(source, &mut stdout)?
    } else {
        encode_with_options(source, &mut stdout, &options)?
    };
    stdout.flush()?;

    eprintln!(
        "{} rows x {} columns, {} bytes in, {} bytes out",
        stats.rows, stats.columns, stats.bytes_in, stats.bytes_out
    );
    Ok(())
}
