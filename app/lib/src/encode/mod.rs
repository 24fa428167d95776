//! Encoders for the three output backends.
//!
//! Every encoder turns the shared [`RecordSet`] into exactly one new file
//! for a `(backend, strategy)` pair:
//!
//! - [`FlatTableEncoder`]: CSV, strategy ignored
//! - [`ColumnarFileEncoder`]: one compound dataset in a structured file
//! - [`RowTableFileEncoder`]: one appendable row table in a structured file
//!
//! Output paths come from [`naming::output_path`], and all writes go through
//! a hidden partial file that is renamed into place on success.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compression::{BackendKind, CompressionStrategy};
use crate::config::ConverterConfig;
use crate::convert::RecordSet;
use crate::error::{ConvertError, Result};
use crate::store::StructuredStore;

mod columnar;
mod flat;
pub mod naming;
mod output;
mod row_table;

pub use columnar::ColumnarFileEncoder;
pub use flat::FlatTableEncoder;
pub use naming::OutputBase;
pub use output::PendingOutput;
pub use row_table::RowTableFileEncoder;

/// Writes one output file for a backend.
pub trait Encoder: Send + Sync {
    /// The backend this encoder produces.
    fn backend(&self) -> BackendKind;

    /// Encode `set` with `strategy` and return the path written.
    fn encode(
        &self,
        set: &RecordSet,
        strategy: &CompressionStrategy,
        base: &OutputBase,
    ) -> Result<PathBuf>;
}

/// Element layout of the columnar dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnarLayout {
    /// `{millisecond:i32?, counter:i32, timestamp:f64 seconds, acceleration:i32}`
    #[default]
    Wide,
    /// `{counter:u8, timestamp:u64 ms, acceleration:u16}`
    Narrow,
}

impl std::str::FromStr for ColumnarLayout {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wide" => Ok(ColumnarLayout::Wide),
            "narrow" => Ok(ColumnarLayout::Narrow),
            _ => Err(ConvertError::Config {
                message: format!("unknown columnar layout: {} (expected wide or narrow)", s),
            }),
        }
    }
}

/// Convert every value of one column to a narrower type.
///
/// The first value that does not fit fails with
/// [`ConvertError::NarrowingOverflow`]; nothing is wrapped.
pub(crate) fn narrow<S, T>(field: &'static str, target: &'static str, values: &[S]) -> Result<Vec<T>>
where
    S: Copy + Into<u64>,
    T: TryFrom<S>,
{
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            T::try_from(value).map_err(|_| ConvertError::NarrowingOverflow {
                field,
                index,
                value: value.into(),
                target,
            })
        })
        .collect()
}

/// One encoder per backend, built from a configuration.
pub struct EncoderSet {
    flat: FlatTableEncoder,
    columnar: ColumnarFileEncoder,
    table: RowTableFileEncoder,
}

impl EncoderSet {
    /// Build the encoders for `config`, writing structured files to `store`.
    ///
    /// Fails with [`ConvertError::Config`] when the config does not validate.
    pub fn new(config: &ConverterConfig, store: Arc<dyn StructuredStore>) -> Result<Self> {
        Ok(Self {
            flat: FlatTableEncoder::new().with_overwrite(config.overwrite),
            columnar: ColumnarFileEncoder::new(Arc::clone(&store))
                .with_layout(config.columnar_layout)
                .with_overwrite(config.overwrite),
            table: RowTableFileEncoder::new(store)
                .with_batch_rows(config.table_batch()?)
                .with_overwrite(config.overwrite),
        })
    }

    /// Get the encoder for `backend`.
    pub fn get(&self, backend: BackendKind) -> &dyn Encoder {
        match backend {
            BackendKind::Flat => &self.flat,
            BackendKind::Columnar => &self.columnar,
            BackendKind::Table => &self.table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_narrow_fits() {
        let values: Vec<u8> = narrow("counter", "uint8", &[1u32, 255]).unwrap();
        assert_eq!(values, vec![1, 255]);
    }

    #[test]
    fn test_narrow_overflow() {
        let err = narrow::<u32, u8>("counter", "uint8", &[1, 2, 256]).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::NarrowingOverflow { field: "counter", index: 2, value: 256, target: "uint8" }
        ));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("narrow".parse::<ColumnarLayout>().unwrap(), ColumnarLayout::Narrow);
        assert!("tall".parse::<ColumnarLayout>().is_err());
    }

    #[test]
    fn test_encoder_set_backends() {
        let encoders = EncoderSet::new(&ConverterConfig::default(), Arc::new(MemoryStore::new())).unwrap();
        for backend in BackendKind::ALL {
            assert_eq!(encoders.get(backend).backend(), backend);
        }
    }

    #[test]
    fn test_encoder_set_rejects_zero_batch() {
        let config: ConverterConfig = serde_json::from_str(r#"{"table_batch_rows": 0}"#).unwrap();
        let err = EncoderSet::new(&config, Arc::new(MemoryStore::new())).err();
        assert!(matches!(err, Some(ConvertError::Config { .. })));
    }
}
