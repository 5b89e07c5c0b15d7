//! Amount coercion into the canonical sign convention (negative = money out).

use std::str::FromStr;

use rust_decimal::Decimal;
use tally_core::{AmountHandling, RawRow, RowError};

/// Parse a statement amount cell.
///
/// Accepts currency symbols, thousands separators, a leading `+`, and
/// accounting negatives like `(12.00)`. Returns `None` for empty or
/// non-numeric input.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (negated, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(cleaned).ok()?;
    Some(if negated { negate(value) } else { value })
}

/// Canonical amount for `row` under `handling`.
pub fn canonical_amount(row: &RawRow, handling: &AmountHandling) -> Result<Decimal, RowError> {
    match handling {
        AmountHandling::SingleColumn {
            column,
            sign_convention,
        } => {
            let raw = row.get(column).ok_or_else(|| RowError::MissingField {
                field: "amount",
                column: column.clone(),
            })?;
            let value = parse_amount(raw).ok_or_else(|| RowError::AmountParse {
                column: column.clone(),
                raw: raw.to_string(),
            })?;
            if sign_convention.debits_are_positive() {
                Ok(negate(value))
            } else {
                Ok(value)
            }
        }
        AmountHandling::SplitColumns {
            debit_column,
            credit_column,
            ..
        } => {
            // Short rows from flexible exports lack trailing empty cells; a row
            // with neither cell has no amount at all.
            if !row.contains(debit_column) && !row.contains(credit_column) {
                return Err(RowError::MissingField {
                    field: "amount",
                    column: debit_column.clone(),
                });
            }
            let debit_raw = row.get(debit_column).unwrap_or("");
            let credit_raw = row.get(credit_column).unwrap_or("");
            let debit = split_cell(debit_column, debit_raw)?;
            let credit = split_cell(credit_column, credit_raw)?;

            let ambiguous = || RowError::AmountAmbiguous {
                debit: debit_raw.to_string(),
                credit: credit_raw.to_string(),
            };

            match (debit, credit) {
                (Some(d), Some(c)) if !d.is_zero() && !c.is_zero() => Err(ambiguous()),
                (Some(d), Some(c)) if d.is_zero() && !c.is_zero() => Ok(c.abs()),
                (Some(d), _) => Ok(negate(d.abs())),
                (None, Some(c)) => Ok(c.abs()),
                (None, None) => Err(ambiguous()),
            }
        }
    }
}

fn split_cell(column: &str, raw: &str) -> Result<Option<Decimal>, RowError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_amount(raw)
        .map(Some)
        .ok_or_else(|| RowError::AmountParse {
            column: column.to_string(),
            raw: raw.to_string(),
        })
}

/// Negate without producing a negative zero.
fn negate(value: Decimal) -> Decimal {
    if value.is_zero() {
        Decimal::ZERO
    } else {
        -value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_core::SignConvention;

    fn single(sign_convention: SignConvention) -> AmountHandling {
        AmountHandling::SingleColumn {
            column: "Amount".into(),
            sign_convention,
        }
    }

    fn split() -> AmountHandling {
        AmountHandling::SplitColumns {
            debit_column: "Debit".into(),
            credit_column: "Credit".into(),
            sign_convention: SignConvention::PositiveForDebits,
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount("-42.50"), Some(dec!(-42.50)));
        assert_eq!(parse_amount("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("+8.00"), Some(dec!(8.00)));
        assert_eq!(parse_amount("(100.00)"), Some(dec!(-100.00)));
        assert_eq!(parse_amount(" -$5.50 "), Some(dec!(-5.50)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("$"), None);
    }

    #[test]
    fn test_single_negative_for_debits_is_identity() {
        let h = single(SignConvention::NegativeForDebits);
        for raw in ["-42.50", "183.13", "0.01", "-10.00"] {
            let got = canonical_amount(&row(&[("Amount", raw)]), &h).unwrap();
            assert_eq!(got, Decimal::from_str(raw).unwrap());
        }
        let got = canonical_amount(&row(&[("Amount", "-42.50")]), &h).unwrap();
        assert_eq!(got.to_string(), "-42.50");
    }

    #[test]
    fn test_single_positive_for_debits_negates() {
        let h = single(SignConvention::PositiveForDebits);
        let got = canonical_amount(&row(&[("Amount", "42.50")]), &h).unwrap();
        assert_eq!(got, dec!(-42.50));
        let got = canonical_amount(&row(&[("Amount", "-185.53")]), &h).unwrap();
        assert_eq!(got, dec!(185.53));
    }

    #[test]
    fn test_single_positive_for_credits_is_identity() {
        let h = single(SignConvention::PositiveForCredits);
        let got = canonical_amount(&row(&[("Amount", "-3.00")]), &h).unwrap();
        assert_eq!(got, dec!(-3.00));
    }

    #[test]
    fn test_single_bad_values() {
        let h = single(SignConvention::NegativeForDebits);
        assert!(matches!(
            canonical_amount(&row(&[("Amount", "")]), &h),
            Err(RowError::AmountParse { .. })
        ));
        assert!(matches!(
            canonical_amount(&row(&[("Amount", "abc")]), &h),
            Err(RowError::AmountParse { .. })
        ));
        assert!(matches!(
            canonical_amount(&row(&[("Other", "1.00")]), &h),
            Err(RowError::MissingField { field: "amount", .. })
        ));
    }

    #[test]
    fn test_split_debit_is_negative() {
        let got = canonical_amount(&row(&[("Debit", "25.00"), ("Credit", "")]), &split()).unwrap();
        assert_eq!(got, dec!(-25.00));
        // already-negative debit exports still come out negative
        let got = canonical_amount(&row(&[("Debit", "-25.00"), ("Credit", "")]), &split()).unwrap();
        assert_eq!(got, dec!(-25.00));
    }

    #[test]
    fn test_split_credit_is_positive() {
        let got = canonical_amount(&row(&[("Debit", ""), ("Credit", "1,500.00")]), &split()).unwrap();
        assert_eq!(got, dec!(1500.00));
        let got = canonical_amount(&row(&[("Debit", "")]), &split());
        assert!(matches!(got, Err(RowError::AmountAmbiguous { .. })));
    }

    #[test]
    fn test_split_zero_side_is_absent() {
        let got = canonical_amount(&row(&[("Debit", "0.00"), ("Credit", "12.00")]), &split()).unwrap();
        assert_eq!(got, dec!(12.00));
        let got = canonical_amount(&row(&[("Debit", "12.00"), ("Credit", "0")]), &split()).unwrap();
        assert_eq!(got, dec!(-12.00));
    }

    #[test]
    fn test_split_both_populated_is_ambiguous() {
        let err = canonical_amount(&row(&[("Debit", "5.00"), ("Credit", "7.00")]), &split()).unwrap_err();
        assert_eq!(
            err,
            RowError::AmountAmbiguous {
                debit: "5.00".into(),
                credit: "7.00".into()
            }
        );
    }

    #[test]
    fn test_split_both_empty_is_ambiguous() {
        let err = canonical_amount(&row(&[("Debit", " "), ("Credit", "")]), &split()).unwrap_err();
        assert!(matches!(err, RowError::AmountAmbiguous { .. }));
    }

    #[test]
    fn test_split_short_rows() {
        // trailing credit cell cut off: debit alone decides
        let got = canonical_amount(&row(&[("Debit", "9.99")]), &split()).unwrap();
        assert_eq!(got, dec!(-9.99));
        let err = canonical_amount(&row(&[("Date", "07/01/2025")]), &split()).unwrap_err();
        assert_eq!(
            err,
            RowError::MissingField {
                field: "amount",
                column: "Debit".into()
            }
        );
    }

    #[test]
    fn test_split_garbage_is_parse_error() {
        let err = canonical_amount(&row(&[("Debit", "x"), ("Credit", "")]), &split()).unwrap_err();
        assert!(matches!(err, RowError::AmountParse { ref column, .. } if column == "Debit"));
    }
}
