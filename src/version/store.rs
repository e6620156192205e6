//! Persisted version of the last successfully retrieved artifact.

use std::path::PathBuf;

use log::debug;

use super::UNKNOWN_VERSION;
use crate::error::FetchError;
use crate::runtime::Runtime;

/// One package's version file: a single plain-text line, no history.
pub struct VersionStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> VersionStore<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    /// Reads the tracked version, or [`UNKNOWN_VERSION`] if the file is absent.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<String, FetchError> {
        if !self.runtime.exists(&self.path) {
            debug!("No version file at {}", self.path.display());
            return Ok(UNKNOWN_VERSION.to_string());
        }

        let content = self
            .runtime
            .read_to_string(&self.path)
            .map_err(FetchError::storage)?;
        Ok(content.trim().to_string())
    }

    /// Overwrites the tracked version, creating parent directories.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn commit(&self, version: &str) -> Result<(), FetchError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.runtime
                .create_dir_all(parent)
                .map_err(FetchError::storage)?;
        }

        self.runtime
            .write(&self.path, version.trim().as_bytes())
            .map_err(FetchError::storage)?;
        debug!("Committed version {} to {}", version, self.path.display());
        Ok(())
    }
}
