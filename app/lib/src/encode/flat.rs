use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::compression::{BackendKind, CompressionStrategy};
use crate::convert::flat::write_flat_table;
use crate::convert::RecordSet;
use crate::encode::naming::{output_path, OutputBase};
use crate::encode::{Encoder, PendingOutput};
use crate::error::{ConvertError, Result};
use crate::store::LocalFiles;

/// Writes the record set as a CSV file.
///
/// Any strategy is accepted and ignored.
#[derive(Debug, Clone, Default)]
pub struct FlatTableEncoder {
    overwrite: bool,
}

impl FlatTableEncoder {
    /// Create an encoder that refuses existing outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace existing outputs.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Encoder for FlatTableEncoder {
    fn backend(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn encode(
        &self,
        set: &RecordSet,
        strategy: &CompressionStrategy,
        base: &OutputBase,
    ) -> Result<PathBuf> {
        let target = output_path(base, BackendKind::Flat, strategy);
        let pending = PendingOutput::begin(&LocalFiles, target, self.overwrite)?;

        let write_error = |message: String| ConvertError::DestinationWrite {
            path: pending.target().to_path_buf(),
            message,
        };
        let file = File::create(pending.partial()).map_err(|e| write_error(e.to_string()))?;
        write_flat_table(set, BufWriter::new(file)).map_err(|e| match e {
            ConvertError::FlatTable(e) => write_error(e.to_string()),
            ConvertError::Io(e) => write_error(e.to_string()),
            other => other,
        })?;

        pending.commit()
    }
}
