//! Column normalizer: one raw row + matched variant -> canonical record.

pub mod amounts;
pub mod dates;

use tally_core::{CanonicalRecord, FormatVariant, RawRow, RowError};

pub use amounts::{canonical_amount, parse_amount};
pub use dates::parse_date;

/// Normalize one row. Never touches the input; a failure skips only this row.
///
/// Description and category are copied verbatim. A layout without a category
/// column (or a short row missing it) yields an empty category.
pub fn normalize(
    row: &RawRow,
    variant: &FormatVariant,
    bank: &str,
    source_file: &str,
) -> Result<CanonicalRecord, RowError> {
    let date_raw = required(row, "date", variant.date_column())?;
    let date = parse_date(date_raw, variant.date_format.as_deref())?;

    let amount = canonical_amount(row, &variant.amount_handling)?;

    let description = required(row, "description", variant.description_column())?;

    let category = variant
        .category_column()
        .and_then(|column| row.get(column))
        .unwrap_or_default();

    Ok(CanonicalRecord::new(
        date,
        amount,
        category,
        description,
        bank,
        source_file,
    ))
}

fn required<'r>(row: &'r RawRow, field: &'static str, column: &str) -> Result<&'r str, RowError> {
    row.get(column).ok_or_else(|| RowError::MissingField {
        field,
        column: column.to_string(),
    })
}
