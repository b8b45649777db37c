use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use irmeqs::{
    generate::Generator,
    sequence::SequenceStore,
    tabular::{payout_rows, read_table_path},
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

struct Args {
    input: PathBuf,
    out_dir: PathBuf,
    store_path: PathBuf,
    date: NaiveDate,
    dual: bool,
}

fn usage() -> &'static str {
    "usage: irmeqs <input.csv> [--dual] [--out DIR] [--store FILE] [--date YYYY-MM-DD]"
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut out_dir = PathBuf::from("out");
    let mut store_path = PathBuf::from("sequence.json");
    let mut date = Local::now().date_naive();
    let mut dual = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dual" => dual = true,
            "--out" => {
                out_dir = PathBuf::from(args.next().context("--out needs a directory")?);
            }
            "--store" => {
                store_path = PathBuf::from(args.next().context("--store needs a file path")?);
            }
            "--date" => {
                let raw = args.next().context("--date needs YYYY-MM-DD")?;
                date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid date {:?}", raw))?;
            }
            other if input.is_none() && !other.starts_with("--") => {
                input = Some(PathBuf::from(other));
            }
            other => bail!("unexpected argument {:?}\n{}", other, usage()),
        }
    }

    Ok(Args {
        input: input.with_context(|| usage().to_string())?,
        out_dir,
        store_path,
        date,
        dual,
    })
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = parse_args()?;
    info!(input = %args.input.display(), dual = args.dual, "startup");

    // ─── 2) parse the payout extract ─────────────────────────────────
    let table = read_table_path(&args.input)?;
    let rows = payout_rows(&table)?;
    info!(rows = rows.len(), "extract parsed");

    // ─── 3) generate ─────────────────────────────────────────────────
    let store = SequenceStore::new(&args.store_path)?;
    let generator = Generator::new(&store, &args.out_dir)?;

    if args.dual {
        let outcome = generator.generate_dual(&rows, args.date)?;
        for band in [&outcome.lower_band, &outcome.upper_band].into_iter().flatten() {
            println!(
                "{}  records={}  details={}",
                band.path.display(),
                band.record_count,
                band.detail_count
            );
        }
        println!(
            "processed={} excluded={}",
            outcome.processed, outcome.excluded
        );
    } else {
        let result = generator.generate_single(&rows, args.date)?;
        println!(
            "{}  records={}  details={}",
            result.path.display(),
            result.record_count,
            result.detail_count
        );
    }

    Ok(())
}
