// src/tabular/mod.rs
//
// Semicolon-delimited CSV boundary. Files carry a header row; rows keep
// their column order so filtered output round-trips byte-for-byte apart
// from the dropped lines.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    collections::BTreeMap,
    fs::File,
    io::Read,
    path::Path,
};
use tracing::debug;

/// Default column delimiter of every tabular input and output.
pub const DELIMITER: u8 = b';';

/// Required columns for the payout conversion.
pub const COLUMN_TAX_CODE: &str = "COD_FIS";
pub const COLUMN_NET_AMOUNT: &str = "NETTO";

/// A parsed delimited file: header names plus rows in file order.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of `column`, if the header row carries it.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Cell at (`row`, `column`); missing trailing cells read as "".
    pub fn cell<'a>(&'a self, row: &'a [String], column_idx: usize) -> &'a str {
        row.get(column_idx).map(String::as_str).unwrap_or("")
    }

    /// Fail with the full list of missing required columns.
    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| self.column_index(c).is_none())
            .collect();
        if !missing.is_empty() {
            bail!("missing required columns: {}", missing.join(", "));
        }
        Ok(())
    }
}

/// One payout row with its required fields bound by name. Unknown columns
/// ride along in `extra` untouched; nothing downstream re-parses headers.
#[derive(Debug, Clone)]
pub struct PayoutRow {
    pub tax_code: String,
    pub net_amount: String,
    pub extra: BTreeMap<String, String>,
}

/// Read a delimited table from any reader.
pub fn read_table(reader: impl Read, delimiter: u8) -> Result<Table> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("parsing row {}", idx + 1))?;
        // Skip fully blank lines that survive the parser.
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    debug!(rows = rows.len(), columns = headers.len(), "parsed table");
    Ok(Table { headers, rows })
}

pub fn read_table_path(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    read_table(file, DELIMITER)
}

/// Write a table back out with the same delimiter and column order.
pub fn write_table_path(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_writer(file);
    writer
        .write_record(&table.headers)
        .context("writing header row")?;
    for row in &table.rows {
        writer.write_record(row).context("writing row")?;
    }
    writer.flush().context("flushing table")?;
    Ok(())
}

/// Bind the payout columns of a table. The required columns are checked
/// here, at the parse boundary, so the generators never see a row without
/// them; an empty tax code on an individual row is still the generator's
/// call (it aborts the batch with the row number).
pub fn payout_rows(table: &Table) -> Result<Vec<PayoutRow>> {
    table.require_columns(&[COLUMN_TAX_CODE, COLUMN_NET_AMOUNT])?;
    let code_idx = table.column_index(COLUMN_TAX_CODE).unwrap();
    let amount_idx = table.column_index(COLUMN_NET_AMOUNT).unwrap();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let extra = table
                .headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != code_idx && *idx != amount_idx)
                .map(|(idx, header)| (header.clone(), table.cell(row, idx).to_string()))
                .collect();
            PayoutRow {
                tax_code: table.cell(row, code_idx).trim().to_string(),
                net_amount: table.cell(row, amount_idx).trim().to_string(),
                extra,
            }
        })
        .collect();
    Ok(rows)
}
