// src/bin/payroll_join.rs
//
// Joins a personnel registry CSV with a compensation CSV and writes the HR
// upload file. Lookup misses are reported at the end, not fatal.

use anyhow::{bail, Context, Result};
use irmeqs::{
    payroll::{build_payroll, write_payroll, PayrollConfig},
    tabular::read_table_path,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

fn usage() -> &'static str {
    "usage: payroll_join <registry.csv> <compensation.csv> --item CODE --year YYYY --month MM \
     [--out FILE] [--measure-id ID] [--chapter CODE] [--cost-center CODE] \
     [--reference REF] [--notes TEXT] [--surcharge-removal]"
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let mut positional = Vec::new();
    let mut out_path: Option<PathBuf> = None;
    let mut config = PayrollConfig::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--item" => config.item_code = args.next().context("--item needs a value")?,
            "--year" => config.competence_year = args.next().context("--year needs a value")?,
            "--month" => config.competence_month = args.next().context("--month needs a value")?,
            "--measure-id" => config.measure_id = args.next().context("--measure-id needs a value")?,
            "--chapter" => config.chapter_code = args.next().context("--chapter needs a value")?,
            "--cost-center" => config.cost_center = args.next().context("--cost-center needs a value")?,
            "--reference" => config.reference = args.next().context("--reference needs a value")?,
            "--notes" => config.notes = args.next().context("--notes needs a value")?,
            "--surcharge-removal" => config.surcharge_removal = true,
            "--out" => out_path = Some(PathBuf::from(args.next().context("--out needs a path")?)),
            other if !other.starts_with("--") => positional.push(PathBuf::from(other)),
            other => bail!("unexpected argument {:?}\n{}", other, usage()),
        }
    }

    if positional.len() != 2 || config.competence_year.is_empty() || config.competence_month.is_empty() {
        bail!("{}", usage());
    }

    let registry = read_table_path(&positional[0])?;
    let compensation = read_table_path(&positional[1])?;

    let (rows, outcome) = build_payroll(&registry, &compensation, &config)?;

    let out_path = out_path.unwrap_or_else(|| PathBuf::from("payroll_output.csv"));
    write_payroll(&out_path, &rows)?;

    println!("{}", out_path.display());
    println!(
        "written={} skipped={} unmatched={}",
        outcome.rows_written,
        outcome.rows_skipped,
        outcome.unmatched.len()
    );
    for name in &outcome.unmatched {
        println!("unmatched {}", name);
    }
    Ok(())
}
