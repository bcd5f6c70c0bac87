//! Store Module
//!
//! The `get`/`set` surface over one store file.
//!
//! ## Concurrency Model
//!
//! - **Writes** (`set`): serialized by the advisory file lock, across
//!   processes and across `Store` instances pointing at the same lock file
//! - **Reads** (`get`): never locked; they see either the store file from
//!   before a concurrent rename or the one after it, never a partial file

mod reader;
mod writer;

pub use reader::StoreReader;
pub use writer::{StageStats, StagedWrite, StoreWriter};

use std::path::Path;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::record::Record;

/// A key-value store backed by one text file
#[derive(Debug)]
pub struct Store {
    reader: StoreReader,
    writer: StoreWriter,
}

impl Store {
    /// Create a store handle. Nothing is touched on disk until the first `set`.
    pub fn new(config: Config) -> Self {
        Self {
            reader: StoreReader::new(config.store_path.clone(), config.duplicate_keys),
            writer: StoreWriter::new(config),
        }
    }

    /// Store at `path` with default settings and sibling staging/lock files
    pub fn open_path(path: impl AsRef<Path>) -> Self {
        Self::new(Config::for_store(path))
    }

    /// Get the value for `key`; `Ok(None)` if the store has no such record
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.reader.get(key)
    }

    /// Like `get`, but a missing key is `StoreError::KeyNotFound`
    pub fn get_required(&self, key: &str) -> Result<String> {
        self.get(key)?.ok_or(StoreError::KeyNotFound)
    }

    /// Insert or overwrite `key`
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writer.set(key, value)
    }

    /// Build and sync the next store version without publishing it yet
    pub fn stage(&self, key: &str, value: &str) -> Result<StagedWrite<'_>> {
        self.writer.stage(key, value)
    }

    /// Every decodable record in file order
    pub fn scan(&self) -> Result<Vec<Record>> {
        self.reader.scan()
    }

    pub fn config(&self) -> &Config {
        self.writer.config()
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }
}
