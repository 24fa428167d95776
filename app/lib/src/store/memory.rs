//! In-memory structured store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::compression::FilterPipeline;
use crate::error::{ConvertError, Result};
use crate::store::{RowBlock, Staging, StructuredStore, TableSpec};

/// How an object was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// A single dataset
    Dataset {
        /// Dataset name
        name: String,
    },
    /// A row table
    Table {
        /// Group holding the table
        group: String,
        /// Table name
        name: String,
        /// Table title
        title: String,
        /// Number of append batches used
        batches: usize,
    },
}

/// One stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// How the rows were written
    pub kind: ObjectKind,
    /// The rows
    pub block: RowBlock,
    /// Filters requested at creation
    pub filters: FilterPipeline,
}

/// A [`StructuredStore`] that keeps every output in a map keyed by path.
///
/// Paths are never touched on disk. The store can be told to reject one
/// codec, standing in for a filter plugin that is missing at runtime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<PathBuf, StoredObject>>,
    rejected_codec: Option<&'static str>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write whose pipeline uses `codec`, e.g. `"lzo"`.
    pub fn rejecting_codec(mut self, codec: &'static str) -> Self {
        self.rejected_codec = Some(codec);
        self
    }

    /// Get a copy of the object stored at `path`.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<StoredObject> {
        self.objects.lock().get(path.as_ref()).cloned()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.objects.lock().keys().cloned().collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Check whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    fn check_filters(&self, filters: &FilterPipeline) -> Result<()> {
        match (self.rejected_codec, filters.codec) {
            (Some(rejected), Some(codec)) if codec.name() == rejected => Err(ConvertError::Store {
                store: self.name(),
                message: format!("filter {} is not available", rejected),
            }),
            _ => Ok(()),
        }
    }

    fn insert(&self, path: &Path, object: StoredObject) {
        self.objects.lock().insert(path.to_path_buf(), object);
    }
}

impl Staging for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.objects.lock().contains_key(path)
    }

    fn persist(&self, from: &Path, to: &Path) -> Result<()> {
        let mut objects = self.objects.lock();
        let object = objects.remove(from).ok_or_else(|| ConvertError::DestinationWrite {
            path: to.to_path_buf(),
            message: format!("nothing staged at {}", from.display()),
        })?;
        objects.insert(to.to_path_buf(), object);
        Ok(())
    }

    fn discard(&self, path: &Path) {
        self.objects.lock().remove(path);
    }
}

impl StructuredStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write_dataset(
        &self,
        path: &Path,
        name: &str,
        block: &RowBlock,
        filters: &FilterPipeline,
    ) -> Result<()> {
        self.check_filters(filters)?;
        self.insert(
            path,
            StoredObject {
                kind: ObjectKind::Dataset { name: name.to_string() },
                block: block.clone(),
                filters: *filters,
            },
        );
        Ok(())
    }

    fn write_table(
        &self,
        path: &Path,
        table: &TableSpec,
        block: &RowBlock,
        filters: &FilterPipeline,
    ) -> Result<()> {
        self.check_filters(filters)?;
        let batches = block.len().div_ceil(table.batch_rows.max(1));
        self.insert(
            path,
            StoredObject {
                kind: ObjectKind::Table {
                    group: table.group.clone(),
                    name: table.name.clone(),
                    title: table.title.clone(),
                    batches,
                },
                block: block.clone(),
                filters: *filters,
            },
        );
        Ok(())
    }
}
