//! Per-file and per-data-root ingestion with skip accounting.
//!
//! Row errors skip the row, file errors skip the file, bank errors skip the
//! bank. Nothing is dropped silently: every skip lands in a report counter.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tally_core::{FormatDescriptor, NoMatch, NormalizedRow, RowErrorKind};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::matcher::{header_set, match_format, missing_headers};
use crate::normalizer::normalize;
use crate::scanner::{bank_dirs, read_statement_path, statement_files, StatementFile, StatementRow};
use crate::store::DescriptorStore;

/// A skipped row and the 1-based file line it starts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub line: u64,
    pub kind: RowErrorKind,
    pub message: String,
}

/// Why a variant did not match, for no-match diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantMiss {
    pub format_name: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub bank: String,
    pub source_file: String,
    /// Matched variant; `None` when the file matched nothing.
    pub format_name: Option<String>,
    pub no_match: Option<NoMatch>,
    pub variant_misses: Vec<VariantMiss>,
    pub rows_ok: usize,
    pub rows_skipped: usize,
    pub skipped_by_kind: BTreeMap<RowErrorKind, usize>,
    pub row_errors: Vec<RowFailure>,
}

impl FileReport {
    pub fn matched(&self) -> bool {
        self.format_name.is_some()
    }

    /// Skipped rows over all data rows; 0.0 for an empty file.
    pub fn error_rate(&self) -> f64 {
        let total = self.rows_ok + self.rows_skipped;
        if total == 0 {
            0.0
        } else {
            self.rows_skipped as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub report: FileReport,
    pub rows: Vec<NormalizedRow>,
}

/// Match one statement against `descriptor` and normalize every row.
pub fn ingest_statement(descriptor: &FormatDescriptor, statement: StatementFile) -> IngestedFile {
    let StatementFile {
        bank,
        source_file,
        headers,
        rows: raw_rows,
    } = statement;

    let header_fields = header_set(headers);
    let mut report = FileReport {
        bank: bank.clone(),
        source_file: source_file.clone(),
        format_name: None,
        no_match: None,
        variant_misses: Vec::new(),
        rows_ok: 0,
        rows_skipped: 0,
        skipped_by_kind: BTreeMap::new(),
        row_errors: Vec::new(),
    };

    let variant = match match_format(descriptor, &header_fields) {
        Ok(v) => v,
        Err(no_match) => {
            warn!("Skipping {}: {}", source_file, no_match);
            report.variant_misses = descriptor
                .variants
                .iter()
                .map(|v| VariantMiss {
                    format_name: v.format_name.clone(),
                    missing: missing_headers(v, &header_fields),
                })
                .collect();
            report.no_match = Some(no_match);
            return IngestedFile {
                report,
                rows: Vec::new(),
            };
        }
    };

    debug!("Using format '{}' for {} ({})", variant.format_name, source_file, bank);
    report.format_name = Some(variant.format_name.clone());

    let mut rows = Vec::with_capacity(raw_rows.len());
    for StatementRow { line, raw } in raw_rows {
        let normalized = raw.and_then(|raw| {
            normalize(&raw, variant, &bank, &source_file).map(|record| NormalizedRow { record, raw })
        });
        match normalized {
            Ok(row) => {
                report.rows_ok += 1;
                rows.push(row);
            }
            Err(e) => {
                warn!("{} line {}: {}", source_file, line, e);
                report.rows_skipped += 1;
                *report.skipped_by_kind.entry(e.kind()).or_insert(0) += 1;
                report.row_errors.push(RowFailure {
                    line,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    IngestedFile { report, rows }
}

/// A bank that could not be processed at all (no usable descriptor).
#[derive(Debug, Clone, Serialize)]
pub struct BankFailure {
    pub bank: String,
    pub files: usize,
    pub message: String,
}

/// A file that could not be read as CSV.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub bank: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub files: usize,
    pub files_matched: usize,
    pub files_unmatched: usize,
    pub files_unreadable: usize,
    pub banks_failed: usize,
    pub rows_ok: usize,
    pub rows_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub files: Vec<IngestedFile>,
    pub bank_failures: Vec<BankFailure>,
    pub file_failures: Vec<FileFailure>,
}

impl BatchOutcome {
    pub fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().map(|f| &f.report)
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals {
            files_unreadable: self.file_failures.len(),
            banks_failed: self.bank_failures.len(),
            ..Default::default()
        };
        for report in self.reports() {
            totals.files += 1;
            if report.matched() {
                totals.files_matched += 1;
            } else {
                totals.files_unmatched += 1;
            }
            totals.rows_ok += report.rows_ok;
            totals.rows_skipped += report.rows_skipped;
        }
        totals.files += totals.files_unreadable;
        totals
    }

    /// All normalized rows, in bank then file order.
    pub fn into_rows(self) -> Vec<NormalizedRow> {
        self.files.into_iter().flat_map(|f| f.rows).collect()
    }
}

/// Ingest every bank directory under `data_root`.
///
/// Only an unreadable data root is an error; every other failure is recorded in
/// the outcome and the run continues with the next file or bank.
pub fn ingest_data_root(store: &DescriptorStore, data_root: &Path) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    for bank in bank_dirs(data_root)? {
        let bank_dir = data_root.join(&bank);
        let files = match statement_files(&bank_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("{e}");
                outcome.bank_failures.push(BankFailure {
                    bank,
                    files: 0,
                    message: e.to_string(),
                });
                continue;
            }
        };
        if files.is_empty() {
            debug!("No statement files for {}", bank);
            continue;
        }

        let descriptor = match store.get(&bank) {
            Some(Ok(d)) => d,
            Some(Err(e)) => {
                outcome.bank_failures.push(BankFailure {
                    bank,
                    files: files.len(),
                    message: e.to_string(),
                });
                continue;
            }
            None => {
                outcome.bank_failures.push(BankFailure {
                    message: format!("no format descriptor loaded for bank '{bank}'"),
                    bank,
                    files: files.len(),
                });
                continue;
            }
        };

        for path in files {
            match read_statement_path(&path, &bank) {
                Ok(statement) => {
                    let ingested = ingest_statement(descriptor, statement);
                    info!(
                        "{}/{}: {} ok, {} skipped",
                        bank,
                        ingested.report.source_file,
                        ingested.report.rows_ok,
                        ingested.report.rows_skipped
                    );
                    outcome.files.push(ingested);
                }
                Err(e) => {
                    warn!("{e}");
                    outcome.file_failures.push(FileFailure {
                        bank: bank.clone(),
                        path: path.display().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::read_statement;
    use rust_decimal_macros::dec;

    fn wells_fargo() -> FormatDescriptor {
        serde_json::from_str(
            r#"{
            "bank_name": "wells_fargo",
            "schema_mappings": [{
                "format_name": "wf_checking",
                "column_mappings": {
                    "date": "Date",
                    "description": "Description",
                    "debit_amount": "Withdrawals",
                    "credit_amount": "Deposits"
                },
                "amount_handling": {
                    "type": "split_columns",
                    "debit_column": "Withdrawals",
                    "credit_column": "Deposits",
                    "sign_convention": "positive_for_debits"
                },
                "date_format": "%m/%d/%Y"
            }]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ingest_counts_row_errors() {
        let csv = "Date,Description,Withdrawals,Deposits
07/01/2025,SAFEWAY #123,54.20,
07/02/2025,PAYROLL ACME,,2500.00
07/03/2025,BROKEN ROW,10.00,10.00
someday,BAD DATE,1.00,
07/05/2025,NO AMOUNT,,
";
        let st = read_statement(csv.as_bytes(), "wells_fargo", "wf.csv").unwrap();
        let out = ingest_statement(&wells_fargo(), st);

        assert_eq!(out.report.format_name.as_deref(), Some("wf_checking"));
        assert_eq!(out.report.rows_ok, 2);
        assert_eq!(out.report.rows_skipped, 3);
        assert_eq!(out.report.skipped_by_kind[&RowErrorKind::AmountAmbiguous], 2);
        assert_eq!(out.report.skipped_by_kind[&RowErrorKind::DateParse], 1);
        // header is line 1, BROKEN ROW is the third data row
        assert_eq!(out.report.row_errors[0].line, 4);
        assert!((out.report.error_rate() - 0.6).abs() < 1e-9);

        assert_eq!(out.rows[0].record.amount, dec!(-54.20));
        assert_eq!(out.rows[1].record.amount, dec!(2500.00));
        assert_eq!(out.rows[1].raw.get("Description"), Some("PAYROLL ACME"));
    }

    #[test]
    fn test_ingest_keeps_file_going_past_bad_encoding() {
        let csv: &[u8] = b"Date,Description,Withdrawals,Deposits
07/01/2025,GOOD ONE,1.00,
07/02/2025,CAF\xe9,2.00,
07/03/2025,GOOD TWO,3.00,
";
        let st = read_statement(csv, "wells_fargo", "latin1.csv").unwrap();
        let out = ingest_statement(&wells_fargo(), st);

        assert_eq!(out.report.rows_ok, 2);
        assert_eq!(out.report.rows_skipped, 1);
        assert_eq!(out.report.skipped_by_kind[&RowErrorKind::Malformed], 1);
        assert_eq!(out.report.row_errors[0].line, 3);
        let descriptions: Vec<_> = out.rows.iter().map(|r| r.record.description.as_str()).collect();
        assert_eq!(descriptions, vec!["GOOD ONE", "GOOD TWO"]);
    }

    #[test]
    fn test_row_errors_point_at_file_lines() {
        let csv = "Date,Description,Withdrawals,Deposits
07/01/2025,A,1.00,
,,,
,,,
someday,B,1.00,
";
        let st = read_statement(csv.as_bytes(), "wells_fargo", "wf.csv").unwrap();
        let out = ingest_statement(&wells_fargo(), st);
        assert_eq!(out.report.rows_ok, 1);
        assert_eq!(out.report.row_errors.len(), 1);
        assert_eq!(out.report.row_errors[0].line, 5);
        assert_eq!(out.report.row_errors[0].kind, RowErrorKind::DateParse);
    }

    #[test]
    fn test_ingest_no_match_skips_file() {
        let csv = "Posting Date,Details,Amount\n07/01/2025,X,1.00\n";
        let st = read_statement(csv.as_bytes(), "wells_fargo", "other.csv").unwrap();
        let out = ingest_statement(&wells_fargo(), st);

        assert!(!out.report.matched());
        assert!(out.rows.is_empty());
        assert_eq!(out.report.rows_ok + out.report.rows_skipped, 0);
        let no_match = out.report.no_match.as_ref().unwrap();
        assert_eq!(no_match.headers, vec!["Amount", "Details", "Posting Date"]);
        assert_eq!(out.report.variant_misses[0].missing.len(), 4);
    }
}
