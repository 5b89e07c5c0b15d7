//! tally-ingest: format descriptor loading, header matching, and row
//! normalization for bank statement CSV exports.

pub mod error;
pub mod matcher;
pub mod normalizer;
pub mod pipeline;
pub mod scanner;
pub mod store;

pub use error::IngestError;
pub use matcher::{header_set, match_format};
pub use normalizer::normalize;
pub use pipeline::{ingest_data_root, ingest_statement, BatchOutcome, FileReport, IngestedFile, Totals};
pub use scanner::{read_statement, StatementFile, StatementRow};
pub use store::{DescriptorStore, SchemaInfo};
