// src/filter/mod.rs
//
// Drops rows whose tax identifier appears in an exclusion set, typically
// one recovered from previously generated files. Matching is
// case-insensitive; everything else about the table passes through.

use anyhow::{bail, Result};
use std::collections::HashSet;
use tracing::info;

use crate::tabular::{Table, COLUMN_TAX_CODE};

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub original_rows: usize,
    pub kept_rows: usize,
    pub removed_rows: usize,
    /// The exclusion keys that actually matched, sorted.
    pub removed_codes: Vec<String>,
}

/// Filter `table` against `exclude`, returning the surviving table and a
/// summary of what was removed.
pub fn filter_table(
    table: &Table,
    exclude: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<(Table, FilterOutcome)> {
    let code_idx = match table.column_index(COLUMN_TAX_CODE) {
        Some(idx) => idx,
        None => bail!("input has no {} column", COLUMN_TAX_CODE),
    };

    let exclude: HashSet<String> = exclude
        .into_iter()
        .map(|c| c.as_ref().trim().to_uppercase())
        .collect();

    let mut removed_codes: Vec<String> = Vec::new();
    let mut kept = Vec::new();
    for row in &table.rows {
        let code = table.cell(row, code_idx).trim().to_uppercase();
        if exclude.contains(&code) {
            if !removed_codes.contains(&code) {
                removed_codes.push(code);
            }
        } else {
            kept.push(row.clone());
        }
    }
    removed_codes.sort();

    let outcome = FilterOutcome {
        original_rows: table.rows.len(),
        kept_rows: kept.len(),
        removed_rows: table.rows.len() - kept.len(),
        removed_codes,
    };
    info!(
        original = outcome.original_rows,
        kept = outcome.kept_rows,
        removed = outcome.removed_rows,
        "filtered table"
    );

    Ok((
        Table {
            headers: table.headers.clone(),
            rows: kept,
        },
        outcome,
    ))
}
