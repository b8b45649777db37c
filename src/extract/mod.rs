// src/extract/mod.rs
//
// Inverse side of the codec: recover tax identifiers from the detail
// records of previously generated files. The field sits at bytes 19-34
// (1-indexed) of each RMD line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

const FIELD_START: usize = 18;
const FIELD_END: usize = 34;

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{16}$").unwrap());

/// Tax identifiers from every RMD line of one file, deduplicated. Lines
/// with any other tag, and blank lines, are skipped. CRLF content is
/// tolerated.
pub fn extract_identifiers(content: &str) -> BTreeSet<String> {
    let mut codes = BTreeSet::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let bytes = line.as_bytes();
        if !bytes.starts_with(b"RMD") {
            continue;
        }
        let end = bytes.len().min(FIELD_END);
        if end <= FIELD_START {
            continue;
        }
        let field = String::from_utf8_lossy(&bytes[FIELD_START..end]);
        let code = field.trim();
        if !code.is_empty() {
            codes.insert(code.to_string());
        }
    }
    codes
}

/// Deduplicated, lexicographically sorted union across several files.
pub fn extract_from_multiple<'a>(contents: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut all = BTreeSet::new();
    for content in contents {
        all.extend(extract_identifiers(content));
    }
    all.into_iter().collect()
}

/// Validity check for manually entered identifiers only (extracted ones are
/// taken as-is): exactly 16 alphanumeric characters, case-insensitive.
pub fn is_valid_identifier(code: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(&code.trim().to_uppercase())
}

/// Split a pasted blob into identifiers, one per line, uppercased and
/// partitioned into valid and invalid.
#[derive(Debug, Default)]
pub struct ManualIdentifiers {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

pub fn parse_manual_identifiers(text: &str) -> ManualIdentifiers {
    let mut out = ManualIdentifiers::default();
    for line in text.lines() {
        let trimmed = line.trim().to_uppercase();
        if trimmed.is_empty() {
            continue;
        }
        if is_valid_identifier(&trimmed) {
            out.valid.push(trimmed);
        } else {
            out.invalid.push(trimmed);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{detail_record, header_record, trailer_record};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    fn sample_file() -> String {
        let records = vec![
            header_record("IRMEQS20250200000001", date()),
            detail_record(2, "RSSMRA85M01H501Z", 100.0, date(), '1'),
            detail_record(3, "VRDLGI90A41F205X", 200.0, date(), '1'),
            detail_record(4, "RSSMRA85M01H501Z", 300.0, date(), '1'),
            trailer_record(5, "IRMEQS20250200000001", date(), 5),
        ];
        records.join("\n")
    }

    #[test]
    fn extracts_only_detail_lines() {
        let codes = extract_identifiers(&sample_file());
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("RSSMRA85M01H501Z"));
        assert!(codes.contains("VRDLGI90A41F205X"));
    }

    #[test]
    fn tolerates_crlf_and_blank_lines() {
        let content = sample_file().replace('\n', "\r\n") + "\r\n\r\n";
        let codes = extract_identifiers(&content);
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn short_identifiers_come_back_trimmed() {
        let content = detail_record(2, "SHORTCODE", 1.0, date(), '1');
        let codes = extract_identifiers(&content);
        assert!(codes.contains("SHORTCODE"));
    }

    #[test]
    fn multi_file_union_is_sorted() {
        let a = detail_record(2, "ZZZZZZ99Z99Z999Z", 1.0, date(), '1');
        let b = detail_record(2, "AAAAAA00A00A000A", 1.0, date(), '1');
        let both = format!("{}\n{}", a, b);
        let codes = extract_from_multiple([a.as_str(), b.as_str(), both.as_str()]);
        assert_eq!(codes, vec!["AAAAAA00A00A000A", "ZZZZZZ99Z99Z999Z"]);
    }

    #[test]
    fn validity_check_is_case_insensitive() {
        assert!(is_valid_identifier("RSSMRA85M01H501Z"));
        assert!(is_valid_identifier("rssmra85m01h501z"));
        assert!(is_valid_identifier(" RSSMRA85M01H501Z "));
        assert!(!is_valid_identifier("RSSMRA85M01H501"));
        assert!(!is_valid_identifier("RSSMRA85M01H501ZX"));
        assert!(!is_valid_identifier("RSSMRA85M01H50!Z"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn manual_blob_is_partitioned() {
        let parsed = parse_manual_identifiers("rssmra85m01h501z\n\nnot-a-code\nVRDLGI90A41F205X\n");
        assert_eq!(parsed.valid, vec!["RSSMRA85M01H501Z", "VRDLGI90A41F205X"]);
        assert_eq!(parsed.invalid, vec!["NOT-A-CODE"]);
    }
}
