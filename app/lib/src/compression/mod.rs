//! Compression strategies for the structured backends.
//!
//! A [`CompressionStrategy`] is a named parameter set scoped to one or more
//! [`BackendKind`]s. Its parameters compile into a typed [`FilterPipeline`]
//! that the structured store applies at dataset creation. The
//! [`CompressionCatalog`] holds the strategies a run may refer to by name.

mod catalog;
mod pipeline;
mod strategy;

pub use catalog::{standard_strategies, CompressionCatalog};
pub use pipeline::{
    BloscCompressor, Codec, FilterPipeline, SzipCoding, ZfpMode, FILTER_BITSHUFFLE, FILTER_BLOSC,
    FILTER_BZIP2, FILTER_LZ4, FILTER_LZF, FILTER_LZO, FILTER_ZFP, FILTER_ZSTD,
};
pub use strategy::{BackendKind, CompressionStrategy, ParamValue};
