//! Configuration types for the conversion library.
//!
//! This module provides configuration structs for controlling log parsing,
//! output layout, parallelism and overwrite behavior. All of them deserialize
//! from JSON with every field optional, so a config file only needs to name
//! the values it changes.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encode::ColumnarLayout;
use crate::error::{ConvertError, Result};
use crate::logfmt::LogDialect;

/// Configuration for the log parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Line shape emitted by the device firmware.
    ///
    /// Default: [`LogDialect::Ticked`]
    pub dialect: LogDialect,

    /// Abort parsing on the first numeric overflow instead of dropping
    /// the line and reporting it.
    ///
    /// Default: false
    pub strict_numeric: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialect: LogDialect::Ticked,
            strict_numeric: false,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log dialect.
    pub fn with_dialect(mut self, dialect: LogDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable or disable strict numeric handling.
    pub fn with_strict_numeric(mut self, strict: bool) -> Self {
        self.strict_numeric = strict;
        self
    }
}

/// Configuration for a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Parser settings.
    pub parser: ParserConfig,

    /// Number of worker threads for encoding pairs.
    ///
    /// - 0: Use the global Rayon pool (one thread per core)
    /// - 1: Encode pairs sequentially
    /// - N: Use a dedicated pool of N threads
    ///
    /// Default: 0 (auto)
    pub parallelism: usize,

    /// Element layout of the columnar dataset.
    ///
    /// Default: [`ColumnarLayout::Wide`]
    pub columnar_layout: ColumnarLayout,

    /// Number of rows appended to a row table per write.
    ///
    /// Default: 4096
    pub table_batch_rows: usize,

    /// Directory for output files. When unset, outputs are written next
    /// to the source log.
    pub output_dir: Option<PathBuf>,

    /// Replace existing non-empty outputs instead of failing the pair.
    ///
    /// Default: false
    pub overwrite: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            parallelism: 0,
            columnar_layout: ColumnarLayout::Wide,
            table_batch_rows: 4096,
            output_dir: None,
            overwrite: false,
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parser configuration.
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Set the parallelism level.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the columnar dataset layout.
    pub fn with_columnar_layout(mut self, layout: ColumnarLayout) -> Self {
        self.columnar_layout = layout;
        self
    }

    /// Set the row-table batch size.
    ///
    /// # Panics
    ///
    /// Panics if `rows` is zero.
    pub fn with_table_batch_rows(mut self, rows: usize) -> Self {
        assert!(rows > 0, "table batch size must be > 0");
        self.table_batch_rows = rows;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Allow or forbid replacing existing outputs.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Check values that cannot be enforced by the type system.
    ///
    /// Deserialized configs bypass the builder assertions, so the driver
    /// calls this before starting a run.
    pub fn validate(&self) -> Result<()> {
        self.table_batch()?;
        Ok(())
    }

    /// The row-table batch size, rejecting zero.
    pub fn table_batch(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.table_batch_rows).ok_or_else(|| ConvertError::Config {
            message: "table_batch_rows must be greater than 0".to_string(),
        })
    }
}
