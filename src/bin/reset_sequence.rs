// src/bin/reset_sequence.rs
//
// Administrative reset of a year's file sequence. The next generation for
// that year restarts from 1; use only when the downstream consumer has been
// told to expect it.

use anyhow::{bail, Context, Result};
use irmeqs::sequence::SequenceStore;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (year, store_path) = match args.as_slice() {
        [year] => (year.clone(), PathBuf::from("sequence.json")),
        [year, path] => (year.clone(), PathBuf::from(path)),
        _ => bail!("usage: reset_sequence <year> [store.json]"),
    };
    let year: i32 = year.parse().with_context(|| format!("invalid year {:?}", year))?;

    let store = SequenceStore::new(&store_path)?;
    for entry in store.all() {
        println!(
            "{}: sequence {} (updated {})",
            entry.year, entry.sequence, entry.last_updated_timestamp
        );
    }
    store.reset(year)?;
    println!("sequence for {} deleted from {}", year, store_path.display());
    Ok(())
}
