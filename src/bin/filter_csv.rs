// src/bin/filter_csv.rs
//
// Exclusion pipeline: recover tax identifiers from generated files and/or a
// manually maintained list, drop the matching rows from a payout extract,
// and write the survivors next to the input as `<stem>_filtered.csv`.

use anyhow::{bail, Context, Result};
use glob::glob;
use irmeqs::{
    extract::{extract_from_multiple, parse_manual_identifiers},
    filter::filter_table,
    tabular::{read_table_path, write_table_path},
};
use std::{collections::BTreeSet, fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn usage() -> &'static str {
    "usage: filter_csv <extract.csv> [generated-file-or-glob...] [--manual codes.txt]"
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let mut positional: Vec<String> = Vec::new();
    let mut manual_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--manual" => {
                manual_path = Some(PathBuf::from(args.next().context("--manual needs a file")?));
            }
            other if !other.starts_with("--") => positional.push(other.to_string()),
            other => bail!("unexpected argument {:?}\n{}", other, usage()),
        }
    }

    if positional.is_empty() {
        bail!("{}", usage());
    }
    let input = PathBuf::from(&positional[0]);

    // Collect exclusion keys from every generated file named.
    let mut contents = Vec::new();
    for pattern in &positional[1..] {
        for entry in glob(pattern).with_context(|| format!("bad pattern {:?}", pattern))? {
            let path = entry?;
            if path.is_file() {
                contents.push(
                    fs::read_to_string(&path)
                        .with_context(|| format!("reading {:?}", path))?,
                );
            }
        }
    }

    let mut codes: BTreeSet<String> =
        extract_from_multiple(contents.iter().map(String::as_str))
            .into_iter()
            .collect();
    info!(
        codes = codes.len(),
        files = contents.len(),
        "exclusion keys from generated files"
    );

    // Manually entered identifiers go through the validity check; extracted
    // ones above are taken as-is.
    if let Some(path) = &manual_path {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let parsed = parse_manual_identifiers(&text);
        for code in &parsed.invalid {
            warn!(code = %code, "invalid manual identifier skipped");
        }
        info!(
            valid = parsed.valid.len(),
            invalid = parsed.invalid.len(),
            "manual identifiers parsed"
        );
        codes.extend(parsed.valid);
    }

    if codes.is_empty() {
        bail!("no exclusion keys: name at least one generated file or --manual list");
    }

    let table = read_table_path(&input)?;
    let (filtered, outcome) = filter_table(&table, &codes)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("input has no file name")?;
    let out_path = input.with_file_name(format!("{}_filtered.csv", stem));
    write_table_path(&out_path, &filtered)?;

    println!("{}", out_path.display());
    println!(
        "rows: {} -> {} ({} removed)",
        outcome.original_rows, outcome.kept_rows, outcome.removed_rows
    );
    for code in &outcome.removed_codes {
        println!("removed {}", code);
    }
    Ok(())
}
