//! The compression catalog.

use std::collections::HashSet;
use std::sync::OnceLock;

use log::debug;

use crate::compression::{BackendKind, CompressionStrategy};
use crate::error::{ConvertError, Result};

/// An ordered, validated set of compression strategies.
///
/// # Examples
///
/// ```
/// use accel_convert::{BackendKind, CompressionCatalog};
///
/// let catalog = CompressionCatalog::standard();
/// let lz4 = catalog.resolve("blosc:lz4").unwrap();
///
/// assert_eq!(lz4.label(), "blosc-lz4");
/// assert!(lz4.supports(BackendKind::Table));
/// assert_eq!(catalog.for_backend(BackendKind::Flat).count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CompressionCatalog {
    strategies: Vec<CompressionStrategy>,
}

impl CompressionCatalog {
    /// Build a catalog from strategies, validating them as a whole.
    pub fn new<I>(strategies: I) -> Result<Self>
    where
        I: IntoIterator<Item = CompressionStrategy>,
    {
        let strategies: Vec<CompressionStrategy> = strategies.into_iter().collect();
        validate(&strategies)?;
        Ok(Self { strategies })
    }

    /// The built-in catalog, shared for the life of the process.
    pub fn standard() -> &'static CompressionCatalog {
        static STANDARD: OnceLock<CompressionCatalog> = OnceLock::new();
        STANDARD.get_or_init(|| CompressionCatalog {
            strategies: standard_strategies(),
        })
    }

    /// Return a new catalog with `extra` appended after the existing entries.
    pub fn with_extra<I>(&self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = CompressionStrategy>,
    {
        let mut strategies = self.strategies.clone();
        let before = strategies.len();
        strategies.extend(extra);
        debug!("Extending catalog with {} strategies", strategies.len() - before);
        Self::new(strategies)
    }

    /// Look up a strategy by name.
    pub fn resolve(&self, name: &str) -> Result<&CompressionStrategy> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ConvertError::UnknownCompression {
                name: name.to_string(),
            })
    }

    /// Strategies valid for `backend`, in catalog order.
    pub fn for_backend(&self, backend: BackendKind) -> impl Iterator<Item = &CompressionStrategy> + '_ {
        self.strategies.iter().filter(move |s| s.supports(backend))
    }

    /// All strategies in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CompressionStrategy> + '_ {
        self.strategies.iter()
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check whether the catalog has no strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for CompressionCatalog {
    fn default() -> Self {
        Self::standard().clone()
    }
}

fn validate(strategies: &[CompressionStrategy]) -> Result<()> {
    let invalid = |message: String| Err(ConvertError::InvalidCatalog { message });

    let mut names = HashSet::new();
    let mut labels = HashSet::new();
    let mut flat: Option<&str> = None;
    for strategy in strategies {
        if strategy.name().is_empty() {
            return invalid("strategy with an empty name".to_string());
        }
        if !names.insert(strategy.name()) {
            return invalid(format!("duplicate strategy name {}", strategy.name()));
        }
        if !is_filename_safe(strategy.label()) {
            return invalid(format!(
                "label {:?} of strategy {} is not filename-safe",
                strategy.label(),
                strategy.name()
            ));
        }
        if !labels.insert(strategy.label()) {
            return invalid(format!("duplicate strategy label {}", strategy.label()));
        }
        if strategy.backends().next().is_none() {
            return invalid(format!("strategy {} supports no backend", strategy.name()));
        }

        let pipeline = strategy.pipeline()?;
        if strategy.supports(BackendKind::Flat) && !pipeline.is_empty() {
            return invalid(format!(
                "strategy {} compresses but claims the flat backend",
                strategy.name()
            ));
        }
        // Flat outputs carry no label, so one flat strategy owns `<stem>.csv`.
        if strategy.supports(BackendKind::Flat) {
            if let Some(first) = flat {
                return invalid(format!(
                    "strategy {} claims the flat backend already held by {}",
                    strategy.name(),
                    first
                ));
            }
            flat = Some(strategy.name());
        }
    }
    Ok(())
}

fn is_filename_safe(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('.')
        && label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'+'))
}

/// The built-in strategy table.
pub fn standard_strategies() -> Vec<CompressionStrategy> {
    use BackendKind::{Columnar, Flat, Table};

    let mut strategies = vec![
        CompressionStrategy::new("none", "none", [Flat, Columnar, Table]),
        CompressionStrategy::new("gzip", "gzip", [Columnar])
            .with_param("filter", "deflate")
            .with_param("level", 4),
        CompressionStrategy::new("gzip+shuffle", "gzip-shuffle", [Columnar])
            .with_param("filter", "deflate")
            .with_param("level", 4)
            .with_param("shuffle", true),
        CompressionStrategy::new("lzf", "lzf", [Columnar]).with_param("filter", "lzf"),
        CompressionStrategy::new("szip", "szip", [Columnar])
            .with_param("filter", "szip")
            .with_param("coding", "nn")
            .with_param("pixels_per_block", 8),
        CompressionStrategy::new("bitshuffle", "bitshuffle", [Columnar])
            .with_param("filter", "bitshuffle")
            .with_param("lz4", true),
        CompressionStrategy::new("lz4", "lz4", [Columnar]).with_param("filter", "lz4"),
        CompressionStrategy::new("zstd", "zstd", [Columnar])
            .with_param("filter", "zstd")
            .with_param("level", 3),
        CompressionStrategy::new("zfp", "zfp", [Columnar])
            .with_param("filter", "zfp")
            .with_param("mode", "reversible"),
        CompressionStrategy::new("bzip2", "bzip2", [Columnar, Table])
            .with_param("filter", "bzip2")
            .with_param("level", 9),
        CompressionStrategy::new("zlib", "zlib", [Table])
            .with_param("filter", "zlib")
            .with_param("level", 9)
            .with_param("shuffle", true),
        CompressionStrategy::new("lzo", "lzo", [Table])
            .with_param("filter", "lzo")
            .with_param("shuffle", true),
        CompressionStrategy::new("blosc", "blosc", [Table])
            .with_param("filter", "blosc")
            .with_param("level", 9)
            .with_param("shuffle", true),
    ];

    for compressor in ["blosclz", "lz4", "lz4hc", "snappy", "zlib", "zstd"] {
        strategies.push(
            CompressionStrategy::new(
                format!("blosc:{}", compressor),
                format!("blosc-{}", compressor),
                [Table],
            )
            .with_param("filter", "blosc")
            .with_param("compressor", compressor)
            .with_param("level", 9)
            .with_param("shuffle", true),
        );
    }

    strategies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Codec;

    #[test]
    fn test_standard_catalog_validates() {
        let catalog = CompressionCatalog::new(standard_strategies()).unwrap();
        assert_eq!(catalog.len(), 19);
        assert_eq!(catalog.len(), CompressionCatalog::standard().len());
    }

    #[test]
    fn test_resolve_unknown() {
        let err = CompressionCatalog::standard().resolve("brotli").unwrap_err();
        assert!(matches!(err, ConvertError::UnknownCompression { ref name } if name == "brotli"));
    }

    #[test]
    fn test_for_backend_order() {
        let catalog = CompressionCatalog::standard();
        let flat: Vec<&str> = catalog.for_backend(BackendKind::Flat).map(|s| s.name()).collect();
        assert_eq!(flat, vec!["none"]);

        let table: Vec<&str> = catalog.for_backend(BackendKind::Table).map(|s| s.name()).collect();
        assert_eq!(table.first(), Some(&"none"));
        assert!(table.contains(&"bzip2"));
        assert!(table.contains(&"blosc:zstd"));
        assert!(!table.contains(&"gzip"));

        let columnar = catalog.for_backend(BackendKind::Columnar).count();
        assert_eq!(columnar, 10);
    }

    #[test]
    fn test_standard_pipelines() {
        let catalog = CompressionCatalog::standard();
        let gzip = catalog.resolve("gzip").unwrap().pipeline().unwrap();
        assert_eq!(gzip.codec, Some(Codec::Deflate { level: 4 }));
        assert!(!gzip.shuffle);

        let zlib = catalog.resolve("zlib").unwrap().pipeline().unwrap();
        assert_eq!(zlib.codec, Some(Codec::Deflate { level: 9 }));
        assert!(zlib.shuffle);

        let lzo = catalog.resolve("lzo").unwrap().pipeline().unwrap();
        assert_eq!(lzo.codec.and_then(|c| c.plugin()).map(|(id, _)| id), Some(305));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = CompressionCatalog::standard()
            .with_extra([CompressionStrategy::new("gzip-fast", "gzip", [BackendKind::Columnar])])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate strategy label"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = CompressionCatalog::new([
            CompressionStrategy::new("a", "a", [BackendKind::Table]),
            CompressionStrategy::new("a", "b", [BackendKind::Table]),
        ])
        .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidCatalog { .. }));
    }

    #[test]
    fn test_unsafe_label_rejected() {
        let result = CompressionCatalog::new([CompressionStrategy::new("x", "a/b", [BackendKind::Table])]);
        assert!(result.is_err());
        let result = CompressionCatalog::new([CompressionStrategy::new("y", "has space", [BackendKind::Table])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compressing_flat_strategy_rejected() {
        let strategy = CompressionStrategy::new("gz-csv", "gz-csv", [BackendKind::Flat])
            .with_param("filter", "deflate");
        assert!(CompressionCatalog::new([strategy]).is_err());
    }

    #[test]
    fn test_second_flat_strategy_rejected() {
        let err = CompressionCatalog::standard()
            .with_extra([CompressionStrategy::new("raw", "raw", [BackendKind::Flat])])
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidCatalog { ref message } if message.contains("none")));

        let catalog = CompressionCatalog::new([
            CompressionStrategy::new("raw", "raw", [BackendKind::Flat, BackendKind::Table]),
            CompressionStrategy::new("plain", "plain", [BackendKind::Table]),
        ])
        .unwrap();
        assert_eq!(catalog.for_backend(BackendKind::Flat).count(), 1);
    }

    #[test]
    fn test_bad_parameter_rejected() {
        let strategy = CompressionStrategy::new("zstd-99", "zstd-99", [BackendKind::Columnar])
            .with_param("filter", "zstd")
            .with_param("level", 99);
        let err = CompressionCatalog::new([strategy]).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParameter { .. }));
    }

    #[test]
    fn test_with_extra_appends() {
        let extra = CompressionStrategy::new("gzip-1", "gzip-1", [BackendKind::Columnar])
            .with_param("filter", "deflate")
            .with_param("level", 1);
        let catalog = CompressionCatalog::standard().with_extra([extra]).unwrap();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.iter().last().map(|s| s.name()), Some("gzip-1"));
        assert!(catalog.resolve("gzip-1").is_ok());
    }
}
