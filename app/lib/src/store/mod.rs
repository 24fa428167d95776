//! Structured file storage.
//!
//! Encoders for the columnar and row-table backends hand typed row blocks to
//! a [`StructuredStore`]. The store owns the physical file format and the
//! staging operations (`exists`, `persist`, `discard`) that make an output
//! appear atomically at its final path.
//!
//! Two stores ship with the crate:
//!
//! - [`MemoryStore`] keeps objects in a map and is used for dry runs and tests
//! - `Hdf5Store` (feature `hdf5`) writes HDF5 files through `hdf5-metno`
//!
//! [`default_store`] returns the HDF5 store when it is compiled in, and a
//! store that fails every write with [`ConvertError::StoreUnavailable`]
//! otherwise.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use crate::compression::FilterPipeline;
use crate::error::{ConvertError, Result};

mod memory;
mod rows;

#[cfg(feature = "hdf5")]
mod hdf5;

pub use memory::{MemoryStore, ObjectKind, StoredObject};
pub use rows::{ColumnSpec, FieldType, NarrowRow, RowBlock, Scalar, WideRow, WideTickedRow};

#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Store;

/// Location and batching of a row table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Group holding the table, `/` for the file root
    pub group: String,
    /// Table name within the group
    pub name: String,
    /// Free-form title stored with the table
    pub title: String,
    /// Rows appended per write
    pub batch_rows: usize,
}

/// Staging operations for a single output path.
///
/// The default methods operate on the local filesystem.
pub trait Staging: Send + Sync {
    /// Check whether `path` already holds output.
    ///
    /// An existing but empty file does not count.
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
    }

    /// Move a finished partial output to its final path.
    fn persist(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| ConvertError::DestinationWrite {
            path: to.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Remove a partial output. Missing files are ignored.
    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Failed to remove partial output {}: {}", path.display(), e);
            }
        }
    }
}

/// Staging on the local filesystem, used by the flat-table encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

impl Staging for LocalFiles {}

/// A writer of structured files.
pub trait StructuredStore: Staging {
    /// Store name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Write `block` as one compound dataset `name` of shape `(n,)`.
    fn write_dataset(
        &self,
        path: &Path,
        name: &str,
        block: &RowBlock,
        filters: &FilterPipeline,
    ) -> Result<()>;

    /// Write `block` as an appendable row table, in batches.
    fn write_table(
        &self,
        path: &Path,
        table: &TableSpec,
        block: &RowBlock,
        filters: &FilterPipeline,
    ) -> Result<()>;
}

/// A store for builds without a structured file backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

impl Staging for UnavailableStore {}

impl StructuredStore for UnavailableStore {
    fn name(&self) -> &'static str {
        "hdf5"
    }

    fn write_dataset(&self, _: &Path, _: &str, _: &RowBlock, _: &FilterPipeline) -> Result<()> {
        Err(ConvertError::StoreUnavailable { store: self.name() })
    }

    fn write_table(&self, _: &Path, _: &TableSpec, _: &RowBlock, _: &FilterPipeline) -> Result<()> {
        Err(ConvertError::StoreUnavailable { store: self.name() })
    }
}

/// The structured store used when none is configured.
pub fn default_store() -> Arc<dyn StructuredStore> {
    #[cfg(feature = "hdf5")]
    {
        Arc::new(Hdf5Store::new())
    }
    #[cfg(not(feature = "hdf5"))]
    {
        Arc::new(UnavailableStore)
    }
}
