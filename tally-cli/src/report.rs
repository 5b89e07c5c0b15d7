//! `tally verify` output and exit policy.

use std::io::{self, Write};

use serde::Serialize;
use tally_ingest::pipeline::{BankFailure, FileFailure};
use tally_ingest::{BatchOutcome, FileReport, Totals};

/// One reason the run is not clean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    NoMatch { bank: String, source_file: String },
    BankUnusable { bank: String, files: usize },
    FileUnreadable { bank: String, path: String },
    ErrorRate { bank: String, source_file: String, rate: f64 },
}

impl Problem {
    pub fn describe(&self) -> String {
        match self {
            Problem::NoMatch { bank, source_file } => {
                format!("{bank}/{source_file}: no matching format")
            }
            Problem::BankUnusable { bank, files } => {
                format!("{bank}: {files} file(s) not processed, no usable descriptor")
            }
            Problem::FileUnreadable { bank, path } => format!("{bank}: cannot read {path}"),
            Problem::ErrorRate {
                bank,
                source_file,
                rate,
            } => format!("{bank}/{source_file}: {:.1}% of rows skipped", rate * 100.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport<'a> {
    pub max_error_rate: f64,
    pub files: Vec<&'a FileReport>,
    pub bank_failures: &'a [BankFailure],
    pub file_failures: &'a [FileFailure],
    pub totals: Totals,
    pub problems: Vec<Problem>,
}

impl<'a> VerifyReport<'a> {
    pub fn new(outcome: &'a BatchOutcome, max_error_rate: f64) -> Self {
        let mut problems = Vec::new();
        for f in &outcome.bank_failures {
            problems.push(Problem::BankUnusable {
                bank: f.bank.clone(),
                files: f.files,
            });
        }
        for f in &outcome.file_failures {
            problems.push(Problem::FileUnreadable {
                bank: f.bank.clone(),
                path: f.path.clone(),
            });
        }
        for r in outcome.reports() {
            if !r.matched() {
                problems.push(Problem::NoMatch {
                    bank: r.bank.clone(),
                    source_file: r.source_file.clone(),
                });
            } else if r.error_rate() > max_error_rate {
                problems.push(Problem::ErrorRate {
                    bank: r.bank.clone(),
                    source_file: r.source_file.clone(),
                    rate: r.error_rate(),
                });
            }
        }

        Self {
            max_error_rate,
            files: outcome.reports().collect(),
            bank_failures: &outcome.bank_failures,
            file_failures: &outcome.file_failures,
            totals: outcome.totals(),
            problems,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn write_json(&self, out: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }

    pub fn write_text(&self, out: &mut impl Write) -> io::Result<()> {
        for r in &self.files {
            match (&r.format_name, &r.no_match) {
                (Some(format), _) => {
                    writeln!(
                        out,
                        "{}/{}: {} ({} ok, {} skipped)",
                        r.bank, r.source_file, format, r.rows_ok, r.rows_skipped
                    )?;
                    for (kind, n) in &r.skipped_by_kind {
                        writeln!(out, "    {kind}: {n}")?;
                    }
                }
                (None, Some(no_match)) => {
                    writeln!(out, "{}/{}: NO MATCH", r.bank, r.source_file)?;
                    writeln!(out, "    headers: [{}]", no_match.headers.join(", "))?;
                    for miss in &r.variant_misses {
                        writeln!(
                            out,
                            "    {} missing: [{}]",
                            miss.format_name,
                            miss.missing.join(", ")
                        )?;
                    }
                }
                (None, None) => writeln!(out, "{}/{}: not processed", r.bank, r.source_file)?,
            }
        }
        for f in self.bank_failures {
            writeln!(out, "{}: SKIPPED ({} files): {}", f.bank, f.files, f.message)?;
        }
        for f in self.file_failures {
            writeln!(out, "{}: UNREADABLE {}: {}", f.bank, f.path, f.message)?;
        }

        let t = &self.totals;
        writeln!(out)?;
        writeln!(
            out,
            "files: {} ({} matched, {} unmatched, {} unreadable), banks failed: {}",
            t.files, t.files_matched, t.files_unmatched, t.files_unreadable, t.banks_failed
        )?;
        writeln!(out, "rows: {} ok, {} skipped", t.rows_ok, t.rows_skipped)?;

        if self.is_clean() {
            writeln!(out, "OK")?;
        } else {
            writeln!(out, "FAILED:")?;
            for p in &self.problems {
                writeln!(out, "  {}", p.describe())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::FormatDescriptor;
    use tally_ingest::{ingest_statement, read_statement};

    fn chase() -> FormatDescriptor {
        serde_json::from_str(
            r#"{
            "bank_name": "chase",
            "schema_mappings": [{
                "format_name": "chase_credit_card",
                "column_mappings": {
                    "date": "Transaction Date",
                    "description": "Description",
                    "category": "Category",
                    "amount": "Amount"
                },
                "amount_handling": {"type": "single_column", "column": "Amount"},
                "date_format": "%m/%d/%Y"
            }]
        }"#,
        )
        .unwrap()
    }

    fn outcome(csvs: &[(&str, &str)]) -> BatchOutcome {
        let descriptor = chase();
        let files = csvs
            .iter()
            .map(|(name, body)| {
                let st = read_statement(body.as_bytes(), "chase", name).unwrap();
                ingest_statement(&descriptor, st)
            })
            .collect();
        BatchOutcome {
            files,
            ..Default::default()
        }
    }

    const GOOD: &str = "Transaction Date,Post Date,Description,Category,Type,Amount
07/13/2025,07/14/2025,H-E-B #659,Groceries,Sale,-21.39
07/12/2025,07/13/2025,Payment Thank You-Mobile,,Payment,183.13
";

    #[test]
    fn test_clean_run() {
        let out = outcome(&[("activity.csv", GOOD)]);
        let report = VerifyReport::new(&out, 0.05);
        assert!(report.is_clean());

        let mut buf = Vec::new();
        report.write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("chase/activity.csv: chase_credit_card (2 ok, 0 skipped)"));
        assert!(text.trim_end().ends_with("OK"));
    }

    #[test]
    fn test_no_match_fails() {
        let out = outcome(&[("odd.csv", "Date,Memo,Value\n2025-07-01,X,1\n")]);
        let report = VerifyReport::new(&out, 0.05);
        assert_eq!(
            report.problems,
            vec![Problem::NoMatch {
                bank: "chase".into(),
                source_file: "odd.csv".into()
            }]
        );

        let mut buf = Vec::new();
        report.write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("headers: [Date, Memo, Value]"));
        assert!(text.contains("FAILED:"));
    }

    #[test]
    fn test_error_rate_threshold_is_per_file() {
        let bad = "Transaction Date,Description,Category,Amount
07/13/2025,A,Groceries,-1.00
not a date,B,Groceries,-2.00
";
        let out = outcome(&[("activity.csv", GOOD), ("bad.csv", bad)]);

        let strict = VerifyReport::new(&out, 0.10);
        assert_eq!(strict.problems.len(), 1);
        assert!(matches!(
            &strict.problems[0],
            Problem::ErrorRate { source_file, .. } if source_file == "bad.csv"
        ));
        // 1 of 4 rows overall, but 1 of 2 in bad.csv
        assert!(!VerifyReport::new(&out, 0.30).is_clean());
        assert!(VerifyReport::new(&out, 0.50).is_clean());
    }

    #[test]
    fn test_bank_failure_fails() {
        let out = BatchOutcome {
            bank_failures: vec![BankFailure {
                bank: "citi".into(),
                files: 2,
                message: "no format descriptor loaded for bank 'citi'".into(),
            }],
            ..Default::default()
        };
        let report = VerifyReport::new(&out, 0.05);
        assert!(!report.is_clean());
        assert_eq!(report.totals.banks_failed, 1);
    }

    #[test]
    fn test_json_shape() {
        let out = outcome(&[("activity.csv", GOOD)]);
        let mut buf = Vec::new();
        VerifyReport::new(&out, 0.05).write_json(&mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["totals"]["rows_ok"], 2);
        assert_eq!(v["files"][0]["format_name"], "chase_credit_card");
        assert_eq!(v["problems"].as_array().unwrap().len(), 0);
    }
}
