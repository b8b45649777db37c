// src/generate/mod.rs
//
// Drives the record codec over a set of payout rows: one counter increment
// per file, header + details + trailer, all-or-nothing 300-byte validation,
// then a single write into the output directory.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

use crate::record::{
    detail_record, header_record, trailer_record, validate_all, DEFAULT_PAYMENT_FLAG,
    FIRST_DETAIL_SEQUENCE,
};
use crate::sequence::{file_identifier, file_name, SequenceStore};
use crate::tabular::{PayoutRow, COLUMN_TAX_CODE};
use crate::text::parse_decimal;

/// Rows at or under this net amount are excluded from dual-file output.
pub const DUAL_LOWER_BOUND: f64 = 2500.0;
/// Rows above this net amount go to the second file (flag `' '`).
pub const DUAL_UPPER_BOUND: f64 = 5000.0;

/// Summary of one generated file.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub identifier: String,
    pub sequence: u64,
    /// Every record in the file, header and trailer included.
    pub record_count: u64,
    pub detail_count: usize,
    pub file_name: String,
    pub path: PathBuf,
}

/// Outcome of a dual-file generation. A band with no rows produces no file.
#[derive(Debug, Clone)]
pub struct DualOutcome {
    /// 2500 < amount <= 5000, payment flag '1'.
    pub lower_band: Option<GeneratedFile>,
    /// amount > 5000, payment flag ' '.
    pub upper_band: Option<GeneratedFile>,
    pub processed: usize,
    pub excluded: usize,
}

/// File generator bound to a sequence store and an output directory.
pub struct Generator<'a> {
    store: &'a SequenceStore,
    out_dir: PathBuf,
}

impl<'a> Generator<'a> {
    pub fn new(store: &'a SequenceStore, out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating output directory {:?}", out_dir))?;
        Ok(Self { store, out_dir })
    }

    /// Generate a single file covering every row, default payment flag.
    pub fn generate_single(&self, rows: &[PayoutRow], date: NaiveDate) -> Result<GeneratedFile> {
        self.generate_with_flag(rows, date, DEFAULT_PAYMENT_FLAG)
    }

    /// Partition rows into the two amount bands and generate one file per
    /// non-empty band, each with its own sequence number and identifier.
    pub fn generate_dual(&self, rows: &[PayoutRow], date: NaiveDate) -> Result<DualOutcome> {
        let mut lower: Vec<PayoutRow> = Vec::new();
        let mut upper: Vec<PayoutRow> = Vec::new();
        let mut excluded = 0usize;

        for row in rows {
            let amount = parse_decimal(&row.net_amount);
            if amount > DUAL_LOWER_BOUND && amount <= DUAL_UPPER_BOUND {
                lower.push(row.clone());
            } else if amount > DUAL_UPPER_BOUND {
                upper.push(row.clone());
            } else {
                debug!(amount, "row excluded from dual output");
                excluded += 1;
            }
        }

        info!(
            lower = lower.len(),
            upper = upper.len(),
            excluded,
            "partitioned rows for dual output"
        );

        let lower_band = if lower.is_empty() {
            warn!("no rows in the {}-{} band", DUAL_LOWER_BOUND, DUAL_UPPER_BOUND);
            None
        } else {
            Some(self.generate_with_flag(&lower, date, DEFAULT_PAYMENT_FLAG)?)
        };

        let upper_band = if upper.is_empty() {
            warn!("no rows above {}", DUAL_UPPER_BOUND);
            None
        } else {
            Some(self.generate_with_flag(&upper, date, ' ')?)
        };

        Ok(DualOutcome {
            lower_band,
            upper_band,
            processed: lower.len() + upper.len(),
            excluded,
        })
    }

    /// The single-file path proper. The counter is consumed up front, so a
    /// later validation failure leaves a gap in the sequence; nothing is
    /// written in that case.
    pub fn generate_with_flag(
        &self,
        rows: &[PayoutRow],
        date: NaiveDate,
        flag: char,
    ) -> Result<GeneratedFile> {
        let entry = self.store.increment(date.year())?;
        let identifier = file_identifier(&entry, date.month());
        info!(%identifier, rows = rows.len(), "generating file");

        let mut records = Vec::with_capacity(rows.len() + 2);
        records.push(header_record(&identifier, date));

        let mut sequence = FIRST_DETAIL_SEQUENCE;
        for (idx, row) in rows.iter().enumerate() {
            if row.tax_code.is_empty() {
                bail!("row {}: {} missing or empty", idx + 1, COLUMN_TAX_CODE);
            }
            let amount = parse_decimal(&row.net_amount);
            records.push(detail_record(sequence, &row.tax_code, amount, date, flag));
            sequence += 1;
        }

        let total = rows.len() as u64 + 2;
        records.push(trailer_record(sequence, &identifier, date, total));

        if !validate_all(&records) {
            bail!("record validation failed for {}", identifier);
        }

        let content = records.join("\n");
        let name = file_name(&entry, date.month());
        let path = self.out_dir.join(&name);
        fs::write(&path, &content).with_context(|| format!("writing {:?}", path))?;

        info!(file = %name, records = records.len(), "file written");
        Ok(GeneratedFile {
            identifier,
            sequence: entry.sequence,
            record_count: total,
            detail_count: rows.len(),
            file_name: name,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_identifiers;
    use crate::record::RECORD_BYTES;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::tempdir;

    fn row(code: &str, net: &str) -> PayoutRow {
        PayoutRow {
            tax_code: code.to_string(),
            net_amount: net.to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    fn setup(tmp: &Path) -> SequenceStore {
        SequenceStore::new(tmp.join("sequence.json")).unwrap()
    }

    #[test]
    fn single_file_scenario() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let result = generator
            .generate_single(&[row("RSSMRA85M01H501Z", "1234,56")], date())
            .unwrap();

        assert_eq!(result.identifier, "IRMEQS20250200000001");
        assert_eq!(result.sequence, 1);
        assert_eq!(result.record_count, 3);
        assert_eq!(result.file_name, "IRMEQS20250200000001.TXT");

        let content = fs::read_to_string(&result.path).unwrap();
        let lines: Vec<&str> = content.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("RMA"));
        assert!(lines[1].starts_with("RMD"));
        assert!(lines[2].starts_with("RMZ"));
        assert!(lines.iter().all(|l| l.len() == RECORD_BYTES));
        // Amount field of the one detail record.
        assert_eq!(&lines[1][49..64], "000000000123456");
        // No trailing newline after the trailer.
        assert!(!content.ends_with('\n'));
    }

    #[test]
    fn file_content_is_byte_exact() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let result = generator
            .generate_single(&[row("RSSMRA85M01H501Z", "1234,56")], date())
            .unwrap();
        let content = fs::read(&result.path).unwrap();

        // The downstream consumer compares these files byte for byte.
        let expected = [
            format!(
                "RMA0000001IRMEQS2025020000000120250214R01{}",
                " ".repeat(259)
            ),
            format!(
                "RMD000000200000011RSSMRA85M01H501ZFSHD202502142  0000000001234561{}",
                " ".repeat(235)
            ),
            format!(
                "RMZ0000003IRMEQS20250200000001202502140000003{}",
                " ".repeat(255)
            ),
        ]
        .join("\n");
        assert_eq!(content, expected.as_bytes());
    }

    #[test]
    fn zero_rows_make_a_two_record_file() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let result = generator.generate_single(&[], date()).unwrap();
        assert_eq!(result.record_count, 2);

        let content = fs::read_to_string(&result.path).unwrap();
        let lines: Vec<&str> = content.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("RMA"));
        assert!(lines[1].starts_with("RMZ"));
        assert_eq!(&lines[1][38..45], "0000002");
    }

    #[test]
    fn empty_tax_code_aborts_the_batch() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let err = generator
            .generate_single(&[row("RSSMRA85M01H501Z", "1,00"), row("", "2,00")], date())
            .unwrap_err()
            .to_string();
        assert!(err.contains("row 2"));

        // Nothing written, but the sequence was consumed before the failure.
        assert_eq!(fs::read_dir(tmp.path().join("out")).unwrap().count(), 0);
        assert_eq!(store.current(2025).unwrap().sequence, 1);
    }

    #[test]
    fn sequences_increase_by_one_per_file() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let first = generator.generate_single(&[], date()).unwrap();
        let second = generator.generate_single(&[], date()).unwrap();
        assert_eq!(first.sequence + 1, second.sequence);
        assert_eq!(first.identifier, "IRMEQS20250200000001");
        assert_eq!(second.identifier, "IRMEQS20250200000002");
    }

    #[test]
    fn dual_partition_boundaries() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let rows = vec![
            row("AAAAAA00A00A000A", "2500,00"), // excluded
            row("BBBBBB00B00B000B", "2500,01"), // lower band
            row("CCCCCC00C00C000C", "5000,00"), // lower band
            row("DDDDDD00D00D000D", "5000,01"), // upper band
        ];
        let outcome = generator.generate_dual(&rows, date()).unwrap();

        assert_eq!(outcome.excluded, 1);
        assert_eq!(outcome.processed, 3);

        let lower = outcome.lower_band.unwrap();
        let upper = outcome.upper_band.unwrap();
        assert_eq!(lower.detail_count, 2);
        assert_eq!(upper.detail_count, 1);
        // Each band consumed its own sequence number.
        assert_eq!(lower.sequence, 1);
        assert_eq!(upper.sequence, 2);

        // Lower band carries flag '1', upper band a space, on every detail.
        let lower_content = fs::read_to_string(&lower.path).unwrap();
        for line in lower_content.split('\n').filter(|l| l.starts_with("RMD")) {
            assert_eq!(&line[64..65], "1");
        }
        let upper_content = fs::read_to_string(&upper.path).unwrap();
        for line in upper_content.split('\n').filter(|l| l.starts_with("RMD")) {
            assert_eq!(&line[64..65], " ");
        }
    }

    #[test]
    fn empty_band_produces_no_file() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let rows = vec![row("AAAAAA00A00A000A", "3000,00")];
        let outcome = generator.generate_dual(&rows, date()).unwrap();
        assert!(outcome.lower_band.is_some());
        assert!(outcome.upper_band.is_none());
        assert_eq!(fs::read_dir(tmp.path().join("out")).unwrap().count(), 1);
    }

    #[test]
    fn round_trip_recovers_tax_codes() {
        let tmp = tempdir().unwrap();
        let store = setup(tmp.path());
        let generator = Generator::new(&store, tmp.path().join("out")).unwrap();

        let rows = vec![
            row("RSSMRA85M01H501Z", "1234,56"),
            row("VRDLGI90A41F205X", "10,00"),
            row("RSSMRA85M01H501Z", "99,00"), // duplicate collapses in the set
        ];
        let result = generator.generate_single(&rows, date()).unwrap();
        let content = fs::read_to_string(&result.path).unwrap();

        let codes = extract_identifiers(&content);
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("RSSMRA85M01H501Z"));
        assert!(codes.contains("VRDLGI90A41F205X"));
    }
}
