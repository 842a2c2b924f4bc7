//! Remember which identifiers were already processed, across runs.
//!
//! Run twice to see the second run skip everything:
//!
//! ```text
//! RUST_LOG=debug cargo run --example simple
//! ```
use std::fs;
use std::path::Path;

use detbloom::{BloomFilter, BloomFilterConfig, HashAlgorithm};
use tracing_subscriber::EnvFilter;

const STATE_FILE: &str = "seen.bloom";

fn load(path: &Path) -> detbloom::Result<BloomFilter> {
    match fs::read(path) {
        Ok(bytes) => match BloomFilter::from_bytes(&bytes) {
            Ok(filter) => Ok(filter),
            Err(err) if err.is_corrupt() => {
                tracing::warn!(%err, "discarding corrupt filter state");
                fresh()
            }
            Err(err) => Err(err),
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => fresh(),
        Err(err) => Err(err.into()),
    }
}

fn fresh() -> detbloom::Result<BloomFilter> {
    let config = BloomFilterConfig::for_capacity(1000, 0.01, HashAlgorithm::Djb2)?;
    Ok(BloomFilter::from_config(config))
}

fn main() -> detbloom::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = Path::new(STATE_FILE);
    let mut seen = load(path)?;

    for id in ["msg-001", "msg-002", "msg-003"] {
        if seen.contains(id) {
            println!("{id}: probably seen, skipping");
        } else {
            println!("{id}: new, processing");
            seen.insert(id);
        }
    }

    seen.write_to(fs::File::create(path)?)?;
    println!(
        "saved {} bits, ~{} items, estimated false positive rate {:.4}",
        seen.bits(),
        seen.count(),
        seen.estimated_false_positive_rate(seen.count())
    );

    Ok(())
}
