//! On-disk artifact store for fetched safety data sheets.
//!
//! One file per CAS number, named `<cas>-SDS.<ext>` inside a single output
//! directory. Presence of that file is the only "already done" marker.
//! Writes go through a uniquely named temp file in the same directory and are
//! renamed into place, so a reader never sees a partial sheet and two writers
//! for the same CAS number simply race to the last rename.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cas::CasNumber;

/// Default artifact extension.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Errors from writing an artifact.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system error while writing or renaming.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking write task did not complete.
    #[error("artifact write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Directory of persisted sheets, keyed by CAS number.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    extension: String,
}

impl ArtifactStore {
    /// Creates a store rooted at `root` with the default `pdf` extension.
    ///
    /// The directory is not touched until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Overrides the artifact file extension (without the leading dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name used for `cas`, e.g. `64-19-7-SDS.pdf`.
    #[must_use]
    pub fn file_name(&self, cas: &CasNumber) -> String {
        format!("{cas}-SDS.{}", self.extension)
    }

    /// Full path for `cas`.
    #[must_use]
    pub fn path_for(&self, cas: &CasNumber) -> PathBuf {
        self.root.join(self.file_name(cas))
    }

    /// True if a sheet for `cas` is already on disk.
    #[must_use]
    pub fn exists(&self, cas: &CasNumber) -> bool {
        self.path_for(cas).is_file()
    }

    /// Persists `bytes` as the sheet for `cas`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory, temp file or rename fails,
    /// and [`StoreError::Join`] if the blocking write task is cancelled or panics.
    #[instrument(skip(self, cas, bytes), fields(cas = %cas, bytes = bytes.len()))]
    pub async fn write(&self, cas: &CasNumber, bytes: Vec<u8>) -> Result<PathBuf, StoreError> {
        let root = self.root.clone();
        let dest = self.path_for(cas);
        tokio::task::spawn_blocking(move || write_atomic(&root, &dest, &bytes).map(|()| dest))
            .await?
    }
}

fn write_atomic(root: &Path, dest: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    std::fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;

    let mut temp_file = NamedTempFile::new_in(root).map_err(|e| StoreError::io(root, e))?;
    debug!(
        temp = %temp_file.path().display(),
        dest = %dest.display(),
        "writing artifact via temp file"
    );
    let temp_path = temp_file.path().to_path_buf();
    temp_file
        .write_all(bytes)
        .map_err(|e| StoreError::io(&temp_path, e))?;
    temp_file
        .flush()
        .map_err(|e| StoreError::io(&temp_path, e))?;

    temp_file
        .persist(dest)
        .map_err(|e| StoreError::io(dest, e.error))?;
    Ok(())
}
