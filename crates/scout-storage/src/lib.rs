//! Versioned JSON document storage.
//!
//! Each learning component owns exactly one document file under a shared
//! data directory. Loads never fail: a missing file yields the empty
//! default, and an unreadable, unparseable or wrong-version file is
//! replaced by the default with an explicit `Recovered` outcome so callers
//! and tests can tell "no prior history" apart from "corrupt history".
//! Saves are atomic (write temp file, rename over the target) and hold an
//! exclusive advisory lock on a sibling `.lock` file for the duration of
//! the write so concurrent invocations serialize instead of racing.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A self-describing persisted document. `VERSION` is the only schema
/// revision this build reads; anything else is treated as corrupt and
/// recovered to the default.
pub trait Document: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    const VERSION: &'static str;

    fn version(&self) -> &str;
}

/// Where a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from an existing file.
    Loaded,
    /// No file existed; the default was used.
    Fresh,
    /// A file existed but was unreadable, unparseable or carried an
    /// unsupported version; the default was substituted.
    Recovered,
}

#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub document: T,
    pub source: LoadSource,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<T: Document>(&self) -> PathBuf {
        self.dir.join(T::FILE_NAME)
    }

    pub fn load<T: Document>(&self) -> LoadOutcome<T> {
        let path = self.path_for::<T>();
        if !path.exists() {
            return LoadOutcome {
                document: T::default(),
                source: LoadSource::Fresh,
            };
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable document, using defaults");
                return LoadOutcome {
                    document: T::default(),
                    source: LoadSource::Recovered,
                };
            }
        };

        match serde_json::from_str::<T>(&content) {
            Ok(document) if document.version() == T::VERSION => LoadOutcome {
                document,
                source: LoadSource::Loaded,
            },
            Ok(document) => {
                tracing::warn!(
                    path = %path.display(),
                    found = document.version(),
                    supported = T::VERSION,
                    "unsupported document version, using defaults"
                );
                LoadOutcome {
                    document: T::default(),
                    source: LoadSource::Recovered,
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "corrupt document, using defaults");
                LoadOutcome {
                    document: T::default(),
                    source: LoadSource::Recovered,
                }
            }
        }
    }

    pub fn save<T: Document>(&self, document: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for::<T>();
        let _lock = AdvisoryFileLock::acquire(&path.with_extension("json.lock"))?;

        let payload = serde_json::to_string_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, &path)?;
        tracing::debug!(path = %path.display(), "document saved");
        Ok(())
    }
}

struct AdvisoryFileLock {
    file: File,
}

impl AdvisoryFileLock {
    fn acquire(path: &Path) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for AdvisoryFileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
