// src/bin/extract_codes.rs
//
// Prints the sorted union of tax identifiers found in the detail records of
// one or more generated files. Arguments may be paths or glob patterns.

use anyhow::{bail, Context, Result};
use glob::glob;
use irmeqs::extract::extract_from_multiple;
use std::fs;

fn main() -> Result<()> {
    let patterns: Vec<String> = std::env::args().skip(1).collect();
    if patterns.is_empty() {
        bail!("usage: extract_codes <file-or-glob> [more...]");
    }

    let mut contents = Vec::new();
    for pattern in &patterns {
        let mut matched = false;
        for entry in glob(pattern).with_context(|| format!("bad pattern {:?}", pattern))? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            matched = true;
            contents.push(
                fs::read_to_string(&path)
                    .with_context(|| format!("reading {:?}", path))?,
            );
        }
        if !matched {
            bail!("no files match {:?}", pattern);
        }
    }

    let codes = extract_from_multiple(contents.iter().map(String::as_str));
    for code in &codes {
        println!("{}", code);
    }
    eprintln!("{} identifiers from {} files", codes.len(), contents.len());
    Ok(())
}
