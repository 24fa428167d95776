use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::compression::{BackendKind, CompressionStrategy};
use crate::convert::RecordSet;
use crate::encode::columnar::narrow_rows;
use crate::encode::naming::{output_path, OutputBase};
use crate::encode::{Encoder, PendingOutput};
use crate::error::Result;
use crate::store::{StructuredStore, TableSpec};

/// Group holding the row table.
pub const TABLE_GROUP: &str = "/";
/// Name of the row table.
pub const TABLE_NAME: &str = "acceleration";

const TABLE_TITLE: &str = "accelerometer samples";
const DEFAULT_BATCH_ROWS: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(rows) => rows,
    None => panic!("batch size is zero"),
};

/// Writes the record set as an appendable row table
/// `{counter:u8, timestamp:u64, acceleration:u16}`.
pub struct RowTableFileEncoder {
    store: Arc<dyn StructuredStore>,
    batch_rows: NonZeroUsize,
    overwrite: bool,
}

impl RowTableFileEncoder {
    /// Create an encoder with 4096-row batches.
    pub fn new(store: Arc<dyn StructuredStore>) -> Self {
        Self {
            store,
            batch_rows: DEFAULT_BATCH_ROWS,
            overwrite: false,
        }
    }

    /// Set the number of rows per append.
    pub fn with_batch_rows(mut self, rows: NonZeroUsize) -> Self {
        self.batch_rows = rows;
        self
    }

    /// Replace existing outputs.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Encoder for RowTableFileEncoder {
    fn backend(&self) -> BackendKind {
        BackendKind::Table
    }

    fn encode(
        &self,
        set: &RecordSet,
        strategy: &CompressionStrategy,
        base: &OutputBase,
    ) -> Result<PathBuf> {
        let filters = strategy.pipeline()?;
        let block = narrow_rows(set)?;
        let table = TableSpec {
            group: TABLE_GROUP.to_string(),
            name: TABLE_NAME.to_string(),
            title: TABLE_TITLE.to_string(),
            batch_rows: self.batch_rows.get(),
        };

        let target = output_path(base, BackendKind::Table, strategy);
        let pending = PendingOutput::begin(self.store.as_ref(), target, self.overwrite)?;
        self.store.write_table(pending.partial(), &table, &block, &filters)?;
        pending.commit()
    }
}
