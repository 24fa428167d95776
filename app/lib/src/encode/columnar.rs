use std::path::PathBuf;
use std::sync::Arc;

use crate::compression::{BackendKind, CompressionStrategy};
use crate::convert::RecordSet;
use crate::encode::naming::{output_path, OutputBase};
use crate::encode::{narrow, ColumnarLayout, Encoder, PendingOutput};
use crate::error::Result;
use crate::store::{NarrowRow, RowBlock, StructuredStore, WideRow, WideTickedRow};

/// Name of the dataset written by the columnar encoder.
pub const DATASET_NAME: &str = "acceleration";

/// Writes the record set as one compound dataset of shape `(n,)`.
pub struct ColumnarFileEncoder {
    store: Arc<dyn StructuredStore>,
    layout: ColumnarLayout,
    overwrite: bool,
}

impl ColumnarFileEncoder {
    /// Create an encoder with the wide layout.
    pub fn new(store: Arc<dyn StructuredStore>) -> Self {
        Self {
            store,
            layout: ColumnarLayout::default(),
            overwrite: false,
        }
    }

    /// Set the element layout.
    pub fn with_layout(mut self, layout: ColumnarLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replace existing outputs.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Build the rows for `set` in the configured layout.
    pub fn rows(&self, set: &RecordSet) -> Result<RowBlock> {
        match self.layout {
            ColumnarLayout::Wide => wide_rows(set),
            ColumnarLayout::Narrow => narrow_rows(set),
        }
    }
}

fn seconds(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

fn wide_rows(set: &RecordSet) -> Result<RowBlock> {
    let counter: Vec<i32> = narrow("counter", "int32", set.counter())?;
    let timestamp = set.timestamp().iter().map(|&ms| seconds(ms));
    let acceleration = set.acceleration().iter().map(|&a| i32::from(a));

    let block = match set.millisecond() {
        Some(ticks) => {
            let millisecond: Vec<i32> = narrow("millisecond", "int32", ticks)?;
            RowBlock::WideTicked(
                millisecond
                    .into_iter()
                    .zip(counter)
                    .zip(timestamp.zip(acceleration))
                    .map(|((millisecond, counter), (timestamp, acceleration))| WideTickedRow {
                        millisecond,
                        counter,
                        timestamp,
                        acceleration,
                    })
                    .collect(),
            )
        }
        None => RowBlock::Wide(
            counter
                .into_iter()
                .zip(timestamp.zip(acceleration))
                .map(|(counter, (timestamp, acceleration))| WideRow {
                    counter,
                    timestamp,
                    acceleration,
                })
                .collect(),
        ),
    };
    Ok(block)
}

pub(crate) fn narrow_rows(set: &RecordSet) -> Result<RowBlock> {
    let counter: Vec<u8> = narrow("counter", "uint8", set.counter())?;
    Ok(RowBlock::Narrow(
        counter
            .into_iter()
            .zip(set.timestamp())
            .zip(set.acceleration())
            .map(|((counter, &timestamp), &acceleration)| NarrowRow {
                counter,
                timestamp,
                acceleration,
            })
            .collect(),
    ))
}

impl Encoder for ColumnarFileEncoder {
    fn backend(&self) -> BackendKind {
        BackendKind::Columnar
    }

    fn encode(
        &self,
        set: &RecordSet,
        strategy: &CompressionStrategy,
        base: &OutputBase,
    ) -> Result<PathBuf> {
        let filters = strategy.pipeline()?;
        let block = self.rows(set)?;

        let target = output_path(base, BackendKind::Columnar, strategy);
        let pending = PendingOutput::begin(self.store.as_ref(), target, self.overwrite)?;
        self.store
            .write_dataset(pending.partial(), DATASET_NAME, &block, &filters)?;
        pending.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Codec, CompressionCatalog};
    use crate::convert::LogRecord;
    use crate::error::ConvertError;
    use crate::store::{MemoryStore, ObjectKind};

    fn sample() -> RecordSet {
        RecordSet::project(vec![
            LogRecord::new(3, 4567, 89).with_device_millis(12),
            LogRecord::new(4, 5000, 90).with_device_millis(13),
        ])
    }

    #[test]
    fn test_wide_rows() {
        let block = wide_rows(&sample()).unwrap();
        assert_eq!(
            block,
            RowBlock::WideTicked(vec![
                WideTickedRow { millisecond: 12, counter: 3, timestamp: 4.567, acceleration: 89 },
                WideTickedRow { millisecond: 13, counter: 4, timestamp: 5.0, acceleration: 90 },
            ])
        );

        let plain = RecordSet::project(vec![LogRecord::new(1, 1500, 2)]);
        assert_eq!(
            wide_rows(&plain).unwrap(),
            RowBlock::Wide(vec![WideRow { counter: 1, timestamp: 1.5, acceleration: 2 }])
        );
    }

    #[test]
    fn test_narrow_rows_overflow() {
        let set = RecordSet::project(vec![LogRecord::new(300, 0, 0)]);
        let err = narrow_rows(&set).unwrap_err();
        assert!(matches!(err, ConvertError::NarrowingOverflow { field: "counter", index: 0, value: 300, .. }));
    }

    #[test]
    fn test_encode_into_memory_store() {
        let store = Arc::new(MemoryStore::new());
        let encoder = ColumnarFileEncoder::new(store.clone());
        let base = OutputBase::new("out", "Log");
        let gzip = CompressionCatalog::standard().resolve("gzip").unwrap();

        let path = encoder.encode(&sample(), gzip, &base).unwrap();
        assert_eq!(path, PathBuf::from("out/Log-columnar-gzip.hdf5"));

        let stored = store.get(&path).unwrap();
        assert_eq!(stored.kind, ObjectKind::Dataset { name: "acceleration".to_string() });
        assert_eq!(stored.filters.codec, Some(Codec::Deflate { level: 4 }));
        assert_eq!(stored.block.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failed_store_write_leaves_nothing() {
        let store = Arc::new(MemoryStore::new().rejecting_codec("lzf"));
        let encoder = ColumnarFileEncoder::new(store.clone());
        let lzf = CompressionCatalog::standard().resolve("lzf").unwrap();

        assert!(encoder.encode(&sample(), lzf, &OutputBase::new("out", "Log")).is_err());
        assert!(store.is_empty());
    }
}
