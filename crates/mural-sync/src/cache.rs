//! Local image cache.
//!
//! Downloaded images live as plain files under one directory. Writes go
//! through a temporary sibling file and a rename, so a record's file is
//! either fully present or absent; an interrupted download never leaves
//! a half-written image behind a stored locator.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Errors that can occur in the image cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to create the cache directory.
    #[error("Failed to create cache directory {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an image file.
    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A directory of cached wallpaper images.
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    /// Open the cache, creating its directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| CacheError::Create {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path a file name resolves to.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Whether a cached file exists under this name.
    pub fn contains(&self, file_name: &str) -> bool {
        self.path_of(file_name).is_file()
    }

    /// Write image bytes under the given name, returning the final path.
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.path_of(file_name);
        write_file_atomic(&path, bytes)?;
        debug!("Cached {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Remove a cached file; missing files are not an error.
    pub fn remove(&self, file_name: &str) -> Result<(), CacheError> {
        let path = self.path_of(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Write { path, source: e }),
        }
    }
}

/// Write `bytes` to `path` via a temporary sibling and rename.
///
/// Used both for fresh cache writes and for repairing a record's file
/// in place at its recorded locator.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let tmp = path.with_extension("part");

    std::fs::write(&tmp, bytes).map_err(|e| CacheError::Write {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| CacheError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
