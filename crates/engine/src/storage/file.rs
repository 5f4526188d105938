//! Directory-backed storage.
//!
//! Layout: `<storage_dir>/<origin>/<key>.json`. Writes land in a uniquely
//! named temp file next to the target and are renamed over it, so a reader
//! in another process sees either the old blob or the new one.
//!
//! Change fan-out only covers writes made through this handle (and its
//! clones). Contexts in other processes detect changes by polling with
//! [`crate::sync::StoragePoller`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::{Storage, StorageError, StorageEvents, StorageKey, StorageSubscription};
use crate::config::EngineConfig;

/// One origin's storage directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<FileInner>,
}

#[derive(Debug)]
struct FileInner {
    root: PathBuf,
    events: StorageEvents,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, capacity: usize) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened file storage");
        Ok(Self {
            inner: Arc::new(FileInner {
                root,
                events: StorageEvents::new(capacity),
            }),
        })
    }

    /// Open the origin directory named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidOrigin`] for an origin that is not a
    /// single path segment, or [`StorageError::Io`] if the directory cannot
    /// be created.
    pub fn from_config(config: &EngineConfig) -> Result<Self, StorageError> {
        Self::open(config.origin_dir()?, config.event_capacity)
    }

    /// The origin directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.inner.root.join(format!("{key}.json"))
    }

    fn read(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomic(&self, key: &StorageKey, value: &str) -> io::Result<()> {
        let target = self.path_for(key);
        let temp = self
            .inner
            .root
            .join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));

        let result = write_then_rename(&temp, &target, value);
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }
}

fn write_then_rename(temp: &Path, target: &Path, value: &str) -> io::Result<()> {
    let mut file = fs::File::create(temp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    fs::rename(temp, target)
}

impl Storage for FileStorage {
    fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        self.read(key)
    }

    fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        let previous = self.read(key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Failed to read previous value before write");
            None
        });
        self.write_atomic(key, value)?;
        if previous.as_deref() != Some(value) {
            self.inner.events.emit(key, Some(value.to_owned()));
        }
        Ok(())
    }

    fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                self.inner.events.emit(key, None);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> StorageSubscription {
        self.inner.events.subscribe()
    }
}
