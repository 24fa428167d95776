//! Output file naming.

use std::path::{Path, PathBuf};

use crate::compression::{BackendKind, CompressionStrategy};
use crate::error::{ConvertError, Result};

/// Directory and stem shared by all outputs of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBase {
    dir: PathBuf,
    stem: String,
}

impl OutputBase {
    /// Create a base from an explicit directory and stem.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, stem: S) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Derive the base from a source path.
    ///
    /// The directory is `output_dir` when given, otherwise the source's own
    /// directory.
    pub fn from_source(source: &Path, output_dir: Option<&Path>) -> Result<Self> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConvertError::Config {
                message: format!("cannot derive an output name from {}", source.display()),
            })?;

        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => match source.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };

        Ok(Self::new(dir, stem))
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Source stem, e.g. `Log` for `Log.txt`.
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

/// Compute the output path of one `(backend, strategy)` pair.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use accel_convert::{naming, BackendKind, CompressionCatalog, OutputBase};
///
/// let base = OutputBase::from_source(Path::new("Data/Log.txt"), None).unwrap();
/// let catalog = CompressionCatalog::standard();
///
/// let gzip = catalog.resolve("gzip").unwrap();
/// assert_eq!(
///     naming::output_path(&base, BackendKind::Columnar, gzip),
///     PathBuf::from("Data/Log-columnar-gzip.hdf5")
/// );
///
/// let none = catalog.resolve("none").unwrap();
/// assert_eq!(
///     naming::output_path(&base, BackendKind::Flat, none),
///     PathBuf::from("Data/Log.csv")
/// );
/// ```
pub fn output_path(base: &OutputBase, backend: BackendKind, strategy: &CompressionStrategy) -> PathBuf {
    let label = if backend.compresses() { strategy.label() } else { "" };
    base.dir.join(format!(
        "{}{}{}.{}",
        base.stem,
        backend.tag(),
        label,
        backend.extension()
    ))
}

/// Hidden sibling used while `target` is being written.
pub fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.partial", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionCatalog;
    use std::collections::HashSet;

    #[test]
    fn test_from_source() {
        let base = OutputBase::from_source(Path::new("Log.txt"), None).unwrap();
        assert_eq!(base.dir(), Path::new("."));
        assert_eq!(base.stem(), "Log");

        let base = OutputBase::from_source(Path::new("in/Log.txt"), Some(Path::new("out"))).unwrap();
        assert_eq!(base.dir(), Path::new("out"));

        assert!(OutputBase::from_source(Path::new("/"), None).is_err());
    }

    #[test]
    fn test_table_name() {
        let base = OutputBase::new("d", "Log");
        let strategy = CompressionCatalog::standard().resolve("blosc:lz4").unwrap();
        assert_eq!(
            output_path(&base, BackendKind::Table, strategy),
            PathBuf::from("d/Log-table-blosc-lz4.hdf5")
        );
    }

    #[test]
    fn test_standard_names_do_not_collide() {
        let base = OutputBase::new("d", "Log");
        let catalog = CompressionCatalog::standard();
        let mut seen = HashSet::new();
        for backend in BackendKind::ALL {
            for strategy in catalog.for_backend(backend) {
                assert!(seen.insert(output_path(&base, backend, strategy)));
            }
        }
        assert_eq!(seen.len(), 1 + 10 + 11);
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("d/Log.csv")),
            PathBuf::from("d/.Log.csv.partial")
        );
    }
}
