// src/payroll/mod.rs
//
// Joins a personnel registry with a compensation list and emits the
// 24-column upload CSV of the HR system, optionally removing the employer
// surcharge from each gross amount. A compensation row with no registry
// match is skipped and reported, never fatal.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::{collections::HashMap, fs::File, path::Path};
use tracing::{info, warn};

use crate::tabular::Table;
use crate::text::{pad_left_zero, parse_decimal};

/// Surcharge-removal divisor for executives (role `RD`).
pub const EXECUTIVE_DIVISOR: f64 = 1.3431;
/// Surcharge-removal divisor for every other role.
pub const STANDARD_DIVISOR: f64 = 1.3270;

// Registry columns.
const COLUMN_NAME: &str = "NOMINATIVO";
const COLUMN_BADGE: &str = "MATRICOLA";
const COLUMN_ROLE: &str = "RUOLO";
// Compensation columns (lower case in the source files).
const COLUMN_COMP_NAME: &str = "nominativo";
const COLUMN_COMP_AMOUNT: &str = "importo";
const COLUMN_COMP_PARTS: &str = "parti";

// Measure fallback used when no measure id is supplied.
const DEFAULT_MEASURE_TYPE: &str = "029";
const DEFAULT_MEASURE_NUMBER: &str = "61947";
const DEFAULT_MEASURE_DATE: &str = "09/05/2025";

/// Caller-supplied settings for one payroll run.
#[derive(Debug, Clone, Default)]
pub struct PayrollConfig {
    pub item_code: String,
    pub competence_year: String,
    pub competence_month: String,
    pub measure_id: String,
    pub chapter_code: String,
    pub cost_center: String,
    pub reference: String,
    pub notes: String,
    /// Divide each amount by the role's surcharge divisor.
    pub surcharge_removal: bool,
}

/// One output row; serde renames carry the exact header names the HR
/// system expects.
#[derive(Debug, Clone, Serialize)]
pub struct PayrollRow {
    pub matricola: String,
    pub comparto: String,
    pub ruolo: String,
    #[serde(rename = "codiceVoce")]
    pub item_code: String,
    #[serde(rename = "identificativoProvvedimento")]
    pub measure_id: String,
    #[serde(rename = "tipoProvvedimento")]
    pub measure_type: String,
    #[serde(rename = "numeroProvvedimento")]
    pub measure_number: String,
    #[serde(rename = "dataProvvedimento")]
    pub measure_date: String,
    #[serde(rename = "annoCompetenzaLiquidazione")]
    pub competence_year: String,
    #[serde(rename = "meseCompetenzaLiquidazione")]
    pub competence_month: String,
    #[serde(rename = "dataCompetenzaVoce")]
    pub competence_date: String,
    #[serde(rename = "codiceStatoVoce")]
    pub state_code: String,
    pub aliquota: String,
    pub parti: String,
    pub importo: String,
    #[serde(rename = "codiceDivisa")]
    pub currency_code: String,
    #[serde(rename = "codiceEnte")]
    pub body_code: String,
    #[serde(rename = "codiceCapitolo")]
    pub chapter_code: String,
    #[serde(rename = "codiceCentroDiCosto")]
    pub cost_center: String,
    pub riferimento: String,
    #[serde(rename = "codiceRiferimentoVoce")]
    pub item_reference_code: String,
    #[serde(rename = "flagAdempimenti")]
    pub obligations_flag: String,
    #[serde(rename = "idContrattoCSA")]
    pub csa_contract_id: String,
    pub nota: String,
}

#[derive(Debug, Clone, Default)]
pub struct PayrollOutcome {
    pub rows_written: usize,
    pub rows_skipped: usize,
    /// Compensation names with no registry match, deduplicated in
    /// encounter order.
    pub unmatched: Vec<String>,
}

/// Last day of a competence month, formatted `DD/MM/YYYY`.
pub fn last_day_of_month(year: i32, month: u32) -> Result<String> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .with_context(|| format!("invalid competence month {}/{}", month, year))?;
    Ok(last.format("%d/%m/%Y").to_string())
}

/// Join registry and compensation tables into output rows.
pub fn build_payroll(
    registry: &Table,
    compensation: &Table,
    config: &PayrollConfig,
) -> Result<(Vec<PayrollRow>, PayrollOutcome)> {
    registry.require_columns(&[COLUMN_NAME, COLUMN_BADGE, COLUMN_ROLE])?;
    compensation.require_columns(&[COLUMN_COMP_NAME, COLUMN_COMP_AMOUNT])?;

    let name_idx = registry.column_index(COLUMN_NAME).unwrap();
    let badge_idx = registry.column_index(COLUMN_BADGE).unwrap();
    let role_idx = registry.column_index(COLUMN_ROLE).unwrap();

    let mut by_name: HashMap<String, &Vec<String>> = HashMap::new();
    for row in &registry.rows {
        let name = registry.cell(row, name_idx).trim().to_uppercase();
        if !name.is_empty() {
            by_name.insert(name, row);
        }
    }
    info!(entries = by_name.len(), "registry loaded");

    let year: i32 = config
        .competence_year
        .trim()
        .parse()
        .with_context(|| format!("invalid competence year {:?}", config.competence_year))?;
    let month: u32 = config
        .competence_month
        .trim()
        .parse()
        .with_context(|| format!("invalid competence month {:?}", config.competence_month))?;
    let competence_date = last_day_of_month(year, month)?;

    let comp_name_idx = compensation.column_index(COLUMN_COMP_NAME).unwrap();
    let comp_amount_idx = compensation.column_index(COLUMN_COMP_AMOUNT).unwrap();
    let comp_parts_idx = compensation.column_index(COLUMN_COMP_PARTS);

    let has_measure_id = !config.measure_id.trim().is_empty();
    let reference = if config.reference.is_empty() {
        String::new()
    } else {
        format!("TL@{}@", config.reference)
    };

    let mut rows = Vec::new();
    let mut outcome = PayrollOutcome::default();

    for comp_row in &compensation.rows {
        let name = compensation.cell(comp_row, comp_name_idx).trim().to_uppercase();
        if name.is_empty() {
            warn!("compensation row without a name, skipped");
            outcome.rows_skipped += 1;
            continue;
        }

        let registry_row = match by_name.get(&name) {
            Some(row) => *row,
            None => {
                warn!(name = %name, "no registry match");
                if !outcome.unmatched.contains(&name) {
                    outcome.unmatched.push(name);
                }
                outcome.rows_skipped += 1;
                continue;
            }
        };

        let badge = pad_left_zero(registry.cell(registry_row, badge_idx).trim(), 6);
        let role = {
            let raw = registry.cell(registry_row, role_idx).trim();
            if raw.is_empty() { "ND" } else { raw }
        };

        let mut amount = parse_decimal(compensation.cell(comp_row, comp_amount_idx));
        if config.surcharge_removal {
            let divisor = if role == "RD" {
                EXECUTIVE_DIVISOR
            } else {
                STANDARD_DIVISOR
            };
            amount /= divisor;
        }
        let amount_str = format!("{:.2}", amount).replace('.', ",");

        let parts = comp_parts_idx
            .map(|idx| compensation.cell(comp_row, idx).trim())
            .filter(|p| !p.is_empty())
            .unwrap_or("1")
            .to_string();

        rows.push(PayrollRow {
            matricola: badge,
            comparto: "1".to_string(),
            ruolo: role.to_string(),
            item_code: config.item_code.clone(),
            measure_id: config.measure_id.clone(),
            measure_type: if has_measure_id { String::new() } else { DEFAULT_MEASURE_TYPE.into() },
            measure_number: if has_measure_id { String::new() } else { DEFAULT_MEASURE_NUMBER.into() },
            measure_date: if has_measure_id { String::new() } else { DEFAULT_MEASURE_DATE.into() },
            competence_year: config.competence_year.clone(),
            competence_month: config.competence_month.clone(),
            competence_date: competence_date.clone(),
            state_code: "E".to_string(),
            aliquota: "0".to_string(),
            parti: parts,
            importo: amount_str,
            currency_code: "E".to_string(),
            body_code: "000000".to_string(),
            chapter_code: config.chapter_code.clone(),
            cost_center: config.cost_center.clone(),
            riferimento: reference.clone(),
            item_reference_code: String::new(),
            obligations_flag: String::new(),
            csa_contract_id: String::new(),
            nota: config.notes.clone(),
        });
    }

    outcome.rows_written = rows.len();
    info!(
        written = outcome.rows_written,
        skipped = outcome.rows_skipped,
        unmatched = outcome.unmatched.len(),
        "payroll join complete"
    );
    Ok((rows, outcome))
}

/// Serialize payroll rows as a semicolon-delimited CSV with headers.
pub fn write_payroll(path: &Path, rows: &[PayrollRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut writer = WriterBuilder::new().delimiter(b';').from_writer(file);
    for row in rows {
        writer.serialize(row).context("writing payroll row")?;
    }
    writer.flush().context("flushing payroll output")?;
    Ok(())
}
