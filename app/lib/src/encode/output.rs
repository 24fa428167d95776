//! Write-then-rename output staging.

use std::path::{Path, PathBuf};

use log::debug;

use crate::encode::naming::partial_path;
use crate::error::{ConvertError, Result};
use crate::store::Staging;

/// An output being written to its hidden partial path.
///
/// Dropping a pending output without [`commit`](Self::commit) discards the
/// partial, so a failed encode never leaves a file behind.
pub struct PendingOutput<'a, S: Staging + ?Sized> {
    staging: &'a S,
    target: PathBuf,
    partial: PathBuf,
    committed: bool,
}

impl<'a, S: Staging + ?Sized> PendingOutput<'a, S> {
    /// Start an output at `target`.
    ///
    /// Fails with [`ConvertError::DestinationExists`] when the target holds
    /// data and `overwrite` is off.
    pub fn begin(staging: &'a S, target: PathBuf, overwrite: bool) -> Result<Self> {
        if !overwrite && staging.exists(&target) {
            return Err(ConvertError::DestinationExists { path: target });
        }

        let partial = partial_path(&target);
        staging.discard(&partial);
        Ok(Self {
            staging,
            target,
            partial,
            committed: false,
        })
    }

    /// Path the encoder writes to.
    pub fn partial(&self) -> &Path {
        &self.partial
    }

    /// Final path of the output.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the partial into place and return the final path.
    pub fn commit(mut self) -> Result<PathBuf> {
        self.staging.persist(&self.partial, &self.target)?;
        self.committed = true;
        debug!("Wrote {}", self.target.display());
        Ok(std::mem::take(&mut self.target))
    }
}

impl<S: Staging + ?Sized> Drop for PendingOutput<'_, S> {
    fn drop(&mut self) {
        if !self.committed {
            self.staging.discard(&self.partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalFiles;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_commit_moves_partial() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Log.csv");

        let pending = PendingOutput::begin(&LocalFiles, target.clone(), false).unwrap();
        fs::write(pending.partial(), b"counter\n").unwrap();
        let written = pending.commit().unwrap();

        assert_eq!(written, target);
        assert_eq!(fs::read(&target).unwrap(), b"counter\n");
        assert!(!dir.path().join(".Log.csv.partial").exists());
    }

    #[test]
    fn test_drop_discards_partial() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Log.csv");
        {
            let pending = PendingOutput::begin(&LocalFiles, target.clone(), false).unwrap();
            fs::write(pending.partial(), b"half").unwrap();
        }
        assert!(!dir.path().join(".Log.csv.partial").exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_existing_destination_refused() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Log.csv");
        fs::write(&target, b"keep me").unwrap();

        let err = PendingOutput::begin(&LocalFiles, target.clone(), false).err().unwrap();
        assert!(matches!(err, ConvertError::DestinationExists { .. }));
        assert!(PendingOutput::begin(&LocalFiles, target, true).is_ok());
    }
}
