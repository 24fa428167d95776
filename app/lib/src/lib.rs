//! # Accelerometer Log Conversion Library
//!
//! Parses device accelerometer logs and re-encodes the samples into several
//! storage backends, each under a chosen compression strategy.
//!
//! ## Features
//!
//! - **Explicit line grammar**: a byte cursor instead of a regular expression,
//!   with tagged outcomes for records, skipped lines and numeric overflow
//! - **Three backends**: CSV flat tables, columnar compound datasets and
//!   appendable row tables
//! - **Compression catalog**: named strategies compiled into typed filter
//!   pipelines, validated up front
//! - **Parallel fan-out**: one parse, then every `(backend, strategy)` pair on
//!   a rayon pool, each failing in isolation
//! - **Atomic outputs**: every file is written to a hidden partial and renamed
//!   into place
//! - **Thread-safe**: all public types implement `Send + Sync`
//!
//! ## Quick Start
//!
//! ### Parsing
//!
//! ```rust
//! use accel_convert::LogParser;
//!
//! let parsed = LogParser::new()
//!     .parse_str("[I] (12ms) 3 4.567 89;\nnot a log line\n[I] (13ms) 4 5.0 90;\n")
//!     .unwrap();
//! let set = parsed.into_record_set().unwrap();
//!
//! assert_eq!(set.counter(), &[3, 4]);
//! assert_eq!(set.timestamp(), &[4567, 5000]);
//! assert_eq!(set.acceleration(), &[89, 90]);
//! ```
//!
//! ### Converting
//!
//! ```rust,ignore
//! use accel_convert::{ConversionDriver, ConversionPair, ConverterConfig};
//!
//! let config = ConverterConfig::default()
//!     .with_parallelism(4)
//!     .with_output_dir("out");
//! let driver = ConversionDriver::new(config);
//!
//! let pairs: Vec<ConversionPair> = ["flat:none", "columnar:gzip", "table:blosc:lz4"]
//!     .iter()
//!     .map(|p| p.parse())
//!     .collect::<Result<_, _>>()?;
//!
//! let report = driver.run("Data/Log.txt", &pairs)?;
//! for pair in &report.pairs {
//!     match &pair.outcome {
//!         Ok(path) => println!("✓ {}", path.display()),
//!         Err(e) => println!("✗ {}: {}", pair.pair, e),
//!     }
//! }
//! ```
//!
//! ### Strategies
//!
//! ```rust
//! use accel_convert::{BackendKind, CompressionCatalog, CompressionStrategy};
//!
//! let custom = CompressionStrategy::new("gzip-1", "gzip-1", [BackendKind::Columnar])
//!     .with_param("filter", "deflate")
//!     .with_param("level", 1);
//!
//! let catalog = CompressionCatalog::standard().with_extra([custom]).unwrap();
//! assert!(catalog.resolve("gzip-1").is_ok());
//! ```
//!
//! ## Structured Backends
//!
//! Columnar and row-table files are written through a [`StructuredStore`].
//! With the `hdf5` feature the default store writes HDF5 files using
//! `hdf5-metno`; without it, structured pairs fail with
//! [`ConvertError::StoreUnavailable`] while flat tables still work. The
//! [`MemoryStore`] keeps outputs in memory for dry runs and tests.
//!
//! ## Error Handling
//!
//! ```rust
//! use accel_convert::{ConvertError, LogParser, ParserConfig};
//!
//! let parser = LogParser::with_config(ParserConfig::new().with_strict_numeric(true));
//! match parser.parse_str("[I] (1ms) 1 1.0 99999;\n") {
//!     Err(ConvertError::NumericOverflow { line, field, .. }) => {
//!         assert_eq!(line, 1);
//!         assert_eq!(field, "acceleration");
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod compression;
pub mod config;
pub mod convert;
pub mod driver;
pub mod encode;
pub mod error;
pub mod logfmt;
pub mod store;

// Re-exports for convenience
pub use compression::{
    standard_strategies, BackendKind, BloscCompressor, Codec, CompressionCatalog,
    CompressionStrategy, FilterPipeline, ParamValue, SzipCoding, ZfpMode,
};
pub use config::{ConverterConfig, ParserConfig};
pub use convert::flat::{read_flat_table, read_flat_table_path, write_flat_table};
pub use convert::{Field, FieldSet, LogRecord, RecordSet};
pub use driver::{
    ConversionDriver, ConversionPair, ConversionReport, ConversionStats, PairReport, ProgressFn,
    StatsSnapshot,
};
pub use encode::{
    naming, ColumnarFileEncoder, ColumnarLayout, Encoder, EncoderSet, FlatTableEncoder,
    OutputBase, RowTableFileEncoder,
};
pub use error::{ConvertError, Result};
pub use logfmt::{match_line, LineError, LineOutcome, LogDialect, LogParser, NumericFault, ParsedLog};
pub use store::{
    default_store, LocalFiles, MemoryStore, RowBlock, Staging, StoredObject, StructuredStore,
    TableSpec, UnavailableStore,
};

#[cfg(feature = "hdf5")]
pub use store::Hdf5Store;

/// Thread safety verification module.
///
/// Compile-time assertions that the public types implement `Send` and
/// `Sync`. The driver shares one record set, one catalog and one store
/// across rayon workers.
#[cfg(test)]
mod thread_safety {
    use super::*;

    /// Compile-time assertion that a type is Send + Sync.
    fn assert_send_sync<T: Send + Sync>() {}

    /// Verify the data model types are thread-safe.
    #[test]
    fn data_types_are_send_sync() {
        assert_send_sync::<LogRecord>();
        assert_send_sync::<RecordSet>();
        assert_send_sync::<FieldSet>();
        assert_send_sync::<ParsedLog>();
        assert_send_sync::<LineError>();
        assert_send_sync::<RowBlock>();
    }

    /// Verify the compression types are thread-safe.
    #[test]
    fn compression_types_are_send_sync() {
        assert_send_sync::<CompressionCatalog>();
        assert_send_sync::<CompressionStrategy>();
        assert_send_sync::<FilterPipeline>();
        assert_send_sync::<Codec>();
    }

    /// Verify the encoding and driver types are thread-safe.
    #[test]
    fn pipeline_types_are_send_sync() {
        assert_send_sync::<LogParser>();
        assert_send_sync::<EncoderSet>();
        assert_send_sync::<FlatTableEncoder>();
        assert_send_sync::<ColumnarFileEncoder>();
        assert_send_sync::<RowTableFileEncoder>();
        assert_send_sync::<ConversionDriver>();
        assert_send_sync::<ConversionStats>();
        assert_send_sync::<ConversionReport>();
        assert_send_sync::<MemoryStore>();
        assert_send_sync::<ConvertError>();
    }

    /// Verify the configuration types are thread-safe.
    #[test]
    fn config_types_are_send_sync() {
        assert_send_sync::<ConverterConfig>();
        assert_send_sync::<ParserConfig>();
    }
}
