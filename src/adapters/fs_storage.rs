//! File storage adapter.
//!
//! Implements [`FileStoragePort`] on `std::fs` under a root directory.  On
//! the device the root is the SD card's VFS mount point (for example
//! `/sdcard`); on the host it is any directory.
//!
//! Relative paths only.  Paths that try to climb out of the root are
//! rejected with `NotFound`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{FileStoragePort, StorageError};

pub struct FsStorage {
    root: PathBuf,
    ready: bool,
    open: Option<File>,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: false,
            open: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a file is currently open for writing.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(path);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            warn!("FsStorage: rejecting path {path}");
            return Err(StorageError::NotFound);
        }
        Ok(self.root.join(rel))
    }

    fn ensure_ready(&self) -> Result<(), StorageError> {
        if self.ready {
            Ok(())
        } else {
            Err(StorageError::NotReady)
        }
    }
}

fn map_io(e: &io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}

impl FileStoragePort for FsStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {
                self.ready = true;
                info!("FsStorage: mounted at {}", self.root.display());
                Ok(())
            }
            _ => {
                self.ready = false;
                warn!("FsStorage: {} is not available", self.root.display());
                Err(StorageError::NotReady)
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.ready && self.resolve(path).is_ok_and(|p| p.is_file())
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_ready()?;
        let full = self.resolve(path)?;
        fs::remove_file(full).map_err(|e| map_io(&e))
    }

    fn create(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_ready()?;
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io(&e))?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(full)
            .map_err(|e| map_io(&e))?;
        self.open = Some(file);
        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let file = self.open.as_mut().ok_or(StorageError::NotOpen)?;
        file.write_all(data).map_err(|e| map_io(&e))
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        let file = self.open.as_mut().ok_or(StorageError::NotOpen)?;
        file.flush().map_err(|e| map_io(&e))?;
        file.sync_data().map_err(|e| map_io(&e))
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let file = self.open.take().ok_or(StorageError::NotOpen)?;
        file.sync_all().map_err(|e| map_io(&e))
    }
}
