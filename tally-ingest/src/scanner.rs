//! Data-root scanning and CSV reading.
//!
//! Layout: `<data_root>/<bank>/*.csv` (or `*.CSV`). Each bank directory name is
//! the bank identifier its descriptor is looked up by.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tally_core::{RawRow, RowError};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// One data row and the file line it starts on. A row that could not be
/// decoded carries its error instead of cells.
#[derive(Debug, Clone)]
pub struct StatementRow {
    pub line: u64,
    pub raw: std::result::Result<RawRow, RowError>,
}

/// One statement file: where it came from, its header row, and its data rows.
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub bank: String,
    pub source_file: String,
    pub headers: Vec<String>,
    pub rows: Vec<StatementRow>,
}

/// Bank directories under `data_root`, sorted.
pub fn bank_dirs(data_root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(data_root).map_err(|source| IngestError::Io {
        path: data_root.to_path_buf(),
        source,
    })?;

    let mut banks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::Io {
            path: data_root.to_path_buf(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                banks.push(name.to_string());
            }
        }
    }
    banks.sort();
    Ok(banks)
}

/// CSV files in one bank directory, sorted by name.
pub fn statement_files(bank_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(bank_dir).map_err(|source| IngestError::Io {
        path: bank_dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "csv" || ext == "CSV")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read a statement CSV from any reader.
///
/// Header cells are trimmed and a UTF-8 BOM is dropped; data cells are kept
/// exactly as written. Rows that are entirely blank are skipped. A row that is
/// not valid UTF-8 is kept as a `Malformed` row so the rest of the file still
/// reads; only I/O failures and an unreadable header abort the file.
pub fn read_statement<R: Read>(reader: R, bank: &str, source_file: &str) -> Result<StatementFile> {
    let csv_err = |source| IngestError::Csv {
        file: source_file.to_string(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::MissingHeader {
            file: source_file.to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(csv_err(e)),
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                warn!("{} line {}: {}", source_file, line, e);
                rows.push(StatementRow {
                    line,
                    raw: Err(RowError::Malformed {
                        reason: e.to_string(),
                    }),
                });
                continue;
            }
        };
        if record
            .iter()
            .all(|cell| cell.iter().all(u8::is_ascii_whitespace))
        {
            continue;
        }

        let line = record.position().map_or(0, |p| p.line());
        let raw = match StringRecord::from_byte_record(record) {
            Ok(fields) => Ok(RawRow::from_record(
                headers.iter().map(String::as_str),
                fields.iter(),
            )),
            Err(e) => {
                let column = headers
                    .get(e.utf8_error().field())
                    .map_or("?", String::as_str);
                Err(RowError::Malformed {
                    reason: format!("invalid UTF-8 in column '{column}'"),
                })
            }
        };
        rows.push(StatementRow { line, raw });
    }

    debug!("Read {} rows from {} ({})", rows.len(), source_file, bank);
    Ok(StatementFile {
        bank: bank.to_string(),
        source_file: source_file.to_string(),
        headers,
        rows,
    })
}

/// Read a statement file from disk. `source_file` is its file name.
pub fn read_statement_path(path: &Path, bank: &str) -> Result<StatementFile> {
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_statement(file, bank, &source_file)
}
