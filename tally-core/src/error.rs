//! Error types shared by the ingestion pipeline

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a usable format descriptor. Fatal for that bank only.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no format descriptor for bank '{bank}' (looked for {})", path.display())]
    NotFound { bank: String, path: PathBuf },

    #[error("invalid format descriptor for bank '{bank}': {reason}")]
    Invalid { bank: String, reason: String },

    #[error("cannot read format descriptor for bank '{bank}' at {}: {source}", path.display())]
    Io {
        bank: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn bank(&self) -> &str {
        match self {
            ConfigError::NotFound { bank, .. }
            | ConfigError::Invalid { bank, .. }
            | ConfigError::Io { bank, .. } => bank,
        }
    }
}

/// A header row that satisfies none of a bank's declared variants.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("no format of bank '{bank}' matches headers [{}]", headers.join(", "))]
pub struct NoMatch {
    pub bank: String,
    /// The offending header set, sorted.
    pub headers: Vec<String>,
}

/// Why a single row could not be normalized. The row is skipped; the file goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no {field} value (column '{column}')")]
    MissingField { field: &'static str, column: String },

    #[error("cannot parse date '{raw}': {reason}")]
    DateParse { raw: String, reason: String },

    #[error("cannot parse amount '{raw}' in column '{column}'")]
    AmountParse { column: String, raw: String },

    #[error("ambiguous amount (debit '{debit}', credit '{credit}')")]
    AmountAmbiguous { debit: String, credit: String },

    /// The CSV record itself could not be read (bad encoding, broken quoting).
    #[error("unreadable row: {reason}")]
    Malformed { reason: String },
}

impl RowError {
    pub fn kind(&self) -> RowErrorKind {
        match self {
            RowError::MissingField { .. } => RowErrorKind::MissingField,
            RowError::DateParse { .. } => RowErrorKind::DateParse,
            RowError::AmountParse { .. } => RowErrorKind::AmountParse,
            RowError::AmountAmbiguous { .. } => RowErrorKind::AmountAmbiguous,
            RowError::Malformed { .. } => RowErrorKind::Malformed,
        }
    }
}

/// Counter key for skipped rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    MissingField,
    DateParse,
    AmountParse,
    AmountAmbiguous,
    Malformed,
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowErrorKind::MissingField => "missing_field",
            RowErrorKind::DateParse => "date_parse",
            RowErrorKind::AmountParse => "amount_parse",
            RowErrorKind::AmountAmbiguous => "amount_ambiguous",
            RowErrorKind::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_message_lists_headers() {
        let err = NoMatch {
            bank: "chase".into(),
            headers: vec!["Amount".into(), "Date".into()],
        };
        assert_eq!(
            err.to_string(),
            "no format of bank 'chase' matches headers [Amount, Date]"
        );
    }

    #[test]
    fn test_row_error_kind() {
        let err = RowError::AmountAmbiguous {
            debit: "1.00".into(),
            credit: "2.00".into(),
        };
        assert_eq!(err.kind(), RowErrorKind::AmountAmbiguous);
        assert_eq!(err.kind().to_string(), "amount_ambiguous");
    }
}
