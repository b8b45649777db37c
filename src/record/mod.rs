// src/record/mod.rs
//
// Fixed-width IRMEQS record codec. Every record is exactly 300 bytes of
// UTF-8; the downstream consumer rejects whole files on any deviation, so
// callers re-validate assembled records with `validate_all` before writing.

use chrono::NaiveDate;
use tracing::error;

use crate::text::{encode_amount_cents, pad_left_zero, pad_right, pad_to_byte_width};

/// Exact UTF-8 byte length of every record.
pub const RECORD_BYTES: usize = 300;

/// Record-type tags, the first 3 bytes of each line.
pub const HEADER_TAG: &str = "RMA";
pub const DETAIL_TAG: &str = "RMD";
pub const TRAILER_TAG: &str = "RMZ";

/// Detail numbering starts at 2; sequence 1 belongs to the header.
pub const FIRST_DETAIL_SEQUENCE: u64 = 2;

/// Default payment-category flag (position 65 of RMD). The alternate value
/// is a single space, used for the upper amount band in dual-file output.
pub const DEFAULT_PAYMENT_FLAG: char = '1';

const FIXED_REQUEST_SEQUENCE: &str = "0000001";
const RELEASE_TAG: &str = "R01";
const PAYMENT_ID_TAG: &str = "FSHD";

fn date_field(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Header record (RMA).
///
/// | bytes | content                  |
/// |-------|--------------------------|
/// | 3     | "RMA"                    |
/// | 7     | "0000001"                |
/// | 20    | file identifier, padded  |
/// | 8     | creation date YYYYMMDD   |
/// | 3     | "R01"                    |
/// | 259   | spaces                   |
pub fn header_record(identifier: &str, date: NaiveDate) -> String {
    let mut record = String::with_capacity(RECORD_BYTES);
    record.push_str(HEADER_TAG);
    record.push_str(FIXED_REQUEST_SEQUENCE);
    record.push_str(&pad_right(identifier, 20));
    record.push_str(&date_field(date));
    record.push_str(RELEASE_TAG);
    record.push_str(&" ".repeat(259));
    record
}

/// Detail record (RMD), one per payout row.
///
/// The tax-identifier field is 16 *bytes*: the source value is truncated at
/// a character boundary and space-filled against its UTF-8 length, so an
/// accented code never widens the record. The payment identifier embeds the
/// *unpadded* sequence number after the FSHD tag and the date.
pub fn detail_record(
    sequence: u64,
    tax_code: &str,
    amount: f64,
    date: NaiveDate,
    flag: char,
) -> String {
    let date_str = date_field(date);
    let code_field = pad_to_byte_width(tax_code, 16);

    let mut payment_id = pad_right(&format!("{PAYMENT_ID_TAG}{date_str}{sequence}"), 15);
    payment_id.truncate(15); // ASCII only, safe to cut at a byte index

    let mut record = String::with_capacity(RECORD_BYTES + code_field.len() - 16);
    record.push_str(DETAIL_TAG);
    record.push_str(&pad_left_zero(&sequence.to_string(), 7));
    record.push_str(FIXED_REQUEST_SEQUENCE);
    record.push('1');
    record.push_str(&code_field);
    record.push_str(&payment_id);
    record.push_str(&encode_amount_cents(amount));
    record.push(flag);
    record.push_str(&" ".repeat(235));
    record
}

/// Trailer record (RMZ).
///
/// `sequence` is the trailer's own ordinal (detail count + 2); `total` counts
/// every record in the file, header and trailer included.
pub fn trailer_record(sequence: u64, identifier: &str, date: NaiveDate, total: u64) -> String {
    let mut record = String::with_capacity(RECORD_BYTES);
    record.push_str(TRAILER_TAG);
    record.push_str(&pad_left_zero(&sequence.to_string(), 7));
    record.push_str(&pad_right(identifier, 20));
    record.push_str(&date_field(date));
    record.push_str(&pad_left_zero(&total.to_string(), 7));
    record.push_str(&" ".repeat(255));
    record
}

/// True when `record` is exactly 300 UTF-8 bytes.
pub fn validate_record(record: &str) -> bool {
    record.len() == RECORD_BYTES
}

/// Check every record, logging each offender with its observed byte length.
/// Applied post-hoc so externally supplied fixtures go through the same
/// check as freshly built records.
pub fn validate_all(records: &[String]) -> bool {
    let mut all_valid = true;
    for (idx, record) in records.iter().enumerate() {
        if !validate_record(record) {
            error!(
                record = idx + 1,
                bytes = record.len(),
                "record is not {} bytes",
                RECORD_BYTES
            );
            all_valid = false;
        }
    }
    all_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    #[test]
    fn header_layout() {
        let record = header_record("IRMEQS20250200000001", date());
        assert_eq!(record.len(), RECORD_BYTES);
        assert_eq!(&record[0..3], "RMA");
        assert_eq!(&record[3..10], "0000001");
        assert_eq!(&record[10..30], "IRMEQS20250200000001");
        assert_eq!(&record[30..38], "20250214");
        assert_eq!(&record[38..41], "R01");
        assert!(record[41..].chars().all(|c| c == ' '));
    }

    #[test]
    fn header_pads_short_identifier() {
        let record = header_record("IRMEQS", date());
        assert_eq!(record.len(), RECORD_BYTES);
        assert_eq!(&record[10..30], "IRMEQS              ");
    }

    #[test]
    fn detail_layout() {
        let record = detail_record(2, "RSSMRA85M01H501Z", 1234.56, date(), '1');
        assert_eq!(record.len(), RECORD_BYTES);
        assert_eq!(&record[0..3], "RMD");
        assert_eq!(&record[3..10], "0000002");
        assert_eq!(&record[10..17], "0000001");
        assert_eq!(&record[17..18], "1");
        assert_eq!(&record[18..34], "RSSMRA85M01H501Z");
        assert_eq!(&record[34..49], "FSHD202502142  ");
        assert_eq!(&record[49..64], "000000000123456");
        assert_eq!(&record[64..65], "1");
        assert!(record[65..].chars().all(|c| c == ' '));
    }

    #[test]
    fn detail_payment_id_uses_unpadded_sequence() {
        let record = detail_record(123, "RSSMRA85M01H501Z", 1.0, date(), '1');
        assert_eq!(&record[34..49], "FSHD20250214123");
    }

    #[test]
    fn detail_payment_id_is_cut_at_15() {
        // Four-digit sequences overflow the 15-char field; the tail is cut.
        let record = detail_record(1234, "RSSMRA85M01H501Z", 1.0, date(), '1');
        assert_eq!(&record[34..49], "FSHD20250214123");
        assert_eq!(record.len(), RECORD_BYTES);
    }

    #[test]
    fn detail_flag_can_be_space() {
        let record = detail_record(2, "RSSMRA85M01H501Z", 6000.0, date(), ' ');
        assert_eq!(&record[64..65], " ");
        assert_eq!(record.len(), RECORD_BYTES);
    }

    #[test]
    fn detail_amount_truncates() {
        let record = detail_record(2, "RSSMRA85M01H501Z", 100.999, date(), '1');
        assert_eq!(&record[49..64], "000000000010099");
    }

    #[test]
    fn detail_multibyte_code_stays_300_bytes() {
        // 15 ASCII + 'È' = 17 bytes: the accented char is dropped whole and
        // the field is refilled to 16 bytes, so the record holds at 300.
        let record = detail_record(2, "ABCDEFGHIJKLMNOÈ", 10.0, date(), '1');
        assert_eq!(record.len(), RECORD_BYTES);
        let bytes = record.as_bytes();
        assert_eq!(&bytes[18..34], b"ABCDEFGHIJKLMNO ");
    }

    #[test]
    fn detail_multibyte_code_within_limit_kept() {
        // 'È' fits inside 16 bytes; record length stays byte-exact even
        // though the char count of the field shrinks.
        let record = detail_record(2, "ÈSSMRA85M01H501", 10.0, date(), '1');
        assert_eq!(record.len(), RECORD_BYTES);
        assert!(record.chars().count() < RECORD_BYTES);
    }

    #[test]
    fn trailer_layout() {
        let record = trailer_record(4, "IRMEQS20250200000001", date(), 4);
        assert_eq!(record.len(), RECORD_BYTES);
        assert_eq!(&record[0..3], "RMZ");
        assert_eq!(&record[3..10], "0000004");
        assert_eq!(&record[10..30], "IRMEQS20250200000001");
        assert_eq!(&record[30..38], "20250214");
        assert_eq!(&record[38..45], "0000004");
        assert!(record[45..].chars().all(|c| c == ' '));
    }

    #[test]
    fn validate_flags_wrong_lengths() {
        let good = header_record("IRMEQS20250200000001", date());
        let bad = format!("{}X", good);
        assert!(validate_all(&[good.clone()]));
        assert!(!validate_all(&[good, bad]));
    }
}
