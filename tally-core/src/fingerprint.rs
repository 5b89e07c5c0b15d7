//! Stable transaction fingerprints, used as the join key for external notes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::record::CanonicalRecord;

const FINGERPRINT_LEN: usize = 16;

/// Fingerprint of a record. Tags (`is_payment`, `normalized_category`) do not
/// participate, so re-tagging never orphans a note.
pub fn fingerprint(record: &CanonicalRecord) -> String {
    fingerprint_fields(
        record.date,
        record.amount,
        &record.description,
        &record.bank,
        &record.source_file,
    )
}

/// SHA-256 over `date`, `amount`, `description`, `bank` and `source_file`, hex,
/// truncated to 16 chars. Each field is hashed behind its byte length, so a
/// separator inside one field cannot shift text into the next.
///
/// The amount is normalized first: `-42.5` and `-42.50` fingerprint the same.
pub fn fingerprint_fields(
    date: NaiveDate,
    amount: Decimal,
    description: &str,
    bank: &str,
    source_file: &str,
) -> String {
    let date = date.format("%Y-%m-%d").to_string();
    let amount = amount.normalize().to_string();

    let mut hasher = Sha256::new();
    for field in [date.as_str(), amount.as_str(), description, bank, source_file] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    let mut out = hex::encode(hasher.finalize());
    out.truncate(FINGERPRINT_LEN);
    out
}
