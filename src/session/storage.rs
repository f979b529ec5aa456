//! Key-value snapshot persistence.
//!
//! At finish the full session snapshot is written to a key-value store
//! keyed by session id. The engine never reads it back; failures are
//! logged by the caller, not fatal.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::VigilError;

/// Directory-backed key-value store writing one JSON file per key.
#[derive(Debug)]
pub struct DirKeyValueStore {
    dir: PathBuf,
}

impl DirKeyValueStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: &Path) -> Result<Self, VigilError> {
        if dir.as_os_str().is_empty() {
            return Err(VigilError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "key-value store directory path is empty",
            )));
        }
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path a given key resolves to.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl crate::ports::KeyValueStore for DirKeyValueStore {
    fn put(&mut self, key: &str, value: &serde_json::Value) -> Result<(), VigilError> {
        let path = self.path_for(key);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        debug!(path = %path.display(), "session snapshot persisted");
        Ok(())
    }
}
