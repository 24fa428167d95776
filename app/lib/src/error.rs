//! Error types for the conversion library.
//!
//! Errors fall into two scopes. Source-level errors (reading and parsing the
//! log) abort the whole run, since every output depends on the parsed data.
//! Pair-level errors (strategy lookup, compatibility, writing one output file)
//! only fail the `(backend, strategy)` pair that raised them.

use std::path::PathBuf;

use thiserror::Error;

use crate::compression::BackendKind;

/// Main error type for the conversion library.
///
/// All operations that can fail return `Result<T, ConvertError>`.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source log could not be opened or read.
    #[error("cannot read source log {}: {source}", path.display())]
    SourceUnreadable {
        /// Path of the log file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A matched digit group does not fit the width of its field.
    #[error("numeric overflow at line {line}: {field} value {digits} does not fit")]
    NumericOverflow {
        /// Line number where the overflow occurred (1-indexed)
        line: usize,
        /// Name of the field that overflowed
        field: &'static str,
        /// The digit text as it appeared in the log
        digits: String,
    },

    /// A record lacks a field that the requested field set requires.
    #[error("record {index} has no {field} value")]
    MissingField {
        /// Record index (0-indexed)
        index: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// No strategy with this name exists in the catalog.
    #[error("unknown compression strategy: {name}")]
    UnknownCompression {
        /// The requested strategy name
        name: String,
    },

    /// The strategy exists but cannot be used with the requested backend.
    #[error("compression strategy {strategy} is not valid for the {backend} backend")]
    IncompatibleStrategy {
        /// Strategy name
        strategy: String,
        /// Backend the strategy was requested for
        backend: BackendKind,
    },

    /// Another pair in the same run already targets this output path.
    #[error("output {} is already produced by another pair in this run", path.display())]
    DuplicateOutput {
        /// The contested output path
        path: PathBuf,
    },

    /// A strategy parameter is missing, mistyped or out of range.
    #[error("invalid parameter {key} in strategy {strategy}: {message}")]
    InvalidParameter {
        /// Strategy name
        strategy: String,
        /// Parameter name
        key: String,
        /// Description of the problem
        message: String,
    },

    /// A catalog could not be built from the given strategies.
    #[error("invalid compression catalog: {message}")]
    InvalidCatalog {
        /// Description of the problem
        message: String,
    },

    /// A value does not fit the narrower type of the target schema.
    #[error("{field} value {value} at record {index} does not fit {target}")]
    NarrowingOverflow {
        /// Field name
        field: &'static str,
        /// Record index (0-indexed)
        index: usize,
        /// The offending value
        value: u64,
        /// Target type name, e.g. `uint8`
        target: &'static str,
    },

    /// The destination already holds data and overwriting is disabled.
    #[error("destination {} already exists and is not empty", path.display())]
    DestinationExists {
        /// The destination path
        path: PathBuf,
    },

    /// Writing the destination failed. Partial output has been removed.
    #[error("cannot write {}: {message}", path.display())]
    DestinationWrite {
        /// The destination path
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// The structured store backend was not compiled into this build.
    #[error("structured store {store} is not available in this build")]
    StoreUnavailable {
        /// Store name
        store: &'static str,
    },

    /// The structured store rejected an operation.
    #[error("{store} store error: {message}")]
    Store {
        /// Store name
        store: &'static str,
        /// Description of the failure
        message: String,
    },

    /// Error reading or writing a flat table.
    #[error("flat table error: {0}")]
    FlatTable(#[from] csv::Error),

    /// A flat table has an unexpected header or a non-numeric cell.
    #[error("invalid flat table at line {line}: {message}")]
    InvalidFlatTable {
        /// Line number where the problem was found (1-indexed)
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// I/O error.
    ///
    /// Wraps errors from standard I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Whether this error invalidates the whole run rather than one pair.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            ConvertError::SourceUnreadable { .. }
                | ConvertError::NumericOverflow { .. }
                | ConvertError::MissingField { .. }
                | ConvertError::InvalidCatalog { .. }
                | ConvertError::Config { .. }
        )
    }
}

/// Type alias for Results using `ConvertError`.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unreadable_display() {
        let error = ConvertError::SourceUnreadable {
            path: PathBuf::from("Data/Log.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let display = format!("{}", error);
        assert!(display.contains("Data/Log.txt"));
        assert!(display.contains("no such file"));
        assert!(error.is_fatal_to_run());
    }

    #[test]
    fn test_numeric_overflow_display() {
        let error = ConvertError::NumericOverflow {
            line: 7,
            field: "acceleration",
            digits: "70000".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("line 7"));
        assert!(display.contains("acceleration value 70000"));
    }

    #[test]
    fn test_incompatible_strategy_display() {
        let error = ConvertError::IncompatibleStrategy {
            strategy: "blosc:lz4".to_string(),
            backend: BackendKind::Columnar,
        };
        let display = format!("{}", error);
        assert!(display.contains("blosc:lz4"));
        assert!(display.contains("columnar"));
        assert!(!error.is_fatal_to_run());
    }

    #[test]
    fn test_narrowing_overflow_display() {
        let error = ConvertError::NarrowingOverflow {
            field: "counter",
            index: 256,
            value: 256,
            target: "uint8",
        };
        let display = format!("{}", error);
        assert!(display.contains("counter value 256"));
        assert!(display.contains("uint8"));
    }

    #[test]
    fn test_pair_errors_are_not_fatal() {
        let unknown = ConvertError::UnknownCompression {
            name: "brotli".to_string(),
        };
        let exists = ConvertError::DestinationExists {
            path: PathBuf::from("Log.csv"),
        };
        assert!(!unknown.is_fatal_to_run());
        assert!(!exists.is_fatal_to_run());
    }

    #[test]
    fn test_io_error_from() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: ConvertError = io_error.into();
        assert!(matches!(error, ConvertError::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConvertError>();
    }
}
