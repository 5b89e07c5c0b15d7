//! tally-core: canonical transaction types, format descriptors, and error types

pub mod error;
pub mod fingerprint;
pub mod format;
pub mod record;

pub use error::{ConfigError, NoMatch, RowError, RowErrorKind};
pub use fingerprint::{fingerprint, fingerprint_fields};
pub use format::{AmountHandling, ColumnMappings, FormatDescriptor, FormatVariant, SignConvention};
pub use record::{CanonicalRecord, NormalizedRow, RawRow};
