// src/bin/check_records.rs
//
// Reference oracle for generated files: reports the UTF-8 byte length and
// record tag of every line and exits non-zero when any line is not exactly
// 300 bytes. Agrees with the library's own post-assembly validation.

use anyhow::{bail, Context, Result};
use irmeqs::record::RECORD_BYTES;
use std::fs;

fn main() -> Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: check_records <file.TXT> [more files...]");
    }

    let mut all_valid = true;

    for path in &paths {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;

        println!("{}", path);
        println!("{: <8} {: <5} {:>7}", "record", "tag", "bytes");
        println!("{:-<22}", "");

        let mut total = 0usize;
        for line in content.lines().filter(|l| !l.is_empty()) {
            total += 1;
            let bytes = line.len();
            let tag = line.get(..3).unwrap_or("???");
            if bytes == RECORD_BYTES {
                println!("{: <8} {: <5} {:>7}", total, tag, bytes);
            } else {
                all_valid = false;
                println!(
                    "{: <8} {: <5} {:>7}  expected {}, off by {}",
                    total,
                    tag,
                    bytes,
                    RECORD_BYTES,
                    bytes as i64 - RECORD_BYTES as i64
                );
            }
        }
        println!("total records: {}\n", total);
    }

    if !all_valid {
        bail!("one or more records are not {} bytes", RECORD_BYTES);
    }
    println!("all records are exactly {} bytes", RECORD_BYTES);
    Ok(())
}
