//! Configuration for linekv
//!
//! Centralized configuration with sensible defaults.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Layout
    // -------------------------------------------------------------------------
    /// The authoritative store file, one `key,value` record per line
    pub store_path: PathBuf,

    /// Working copy built by `set` and renamed onto `store_path`.
    /// Must live on the same filesystem as the store for the rename to be atomic.
    pub staging_path: PathBuf,

    /// Dedicated file that carries the advisory writer lock
    pub lock_path: PathBuf,

    // -------------------------------------------------------------------------
    // Write Behavior
    // -------------------------------------------------------------------------
    /// What `set` does with existing records for the same key
    pub duplicate_keys: DuplicateKeys,

    /// How long `set` waits for the writer lock (`None` = forever)
    pub lock_timeout: Option<Duration>,

    /// fsync the store's directory after the rename (unix only)
    pub sync_dir: bool,
}

/// Policy for a `set` on a key that already has a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    /// Drop earlier records for the key while copying (upsert)
    #[default]
    Replace,

    /// Keep earlier records and append; lookups return the oldest one
    Append,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(Self::DEFAULT_STORE),
            staging_path: PathBuf::from(Self::DEFAULT_STAGING),
            lock_path: PathBuf::from(Self::DEFAULT_LOCK),
            duplicate_keys: DuplicateKeys::Replace,
            lock_timeout: None,
            sync_dir: true,
        }
    }
}

impl Config {
    const DEFAULT_STORE: &'static str = "database";
    const DEFAULT_STAGING: &'static str = "database_temp";
    const DEFAULT_LOCK: &'static str = "database.lock";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config for a store at `path`, with staging and lock files beside it
    ///
    /// `data/users` gets `data/users_temp` and `data/users.lock`.
    pub fn for_store(path: impl AsRef<Path>) -> Self {
        let store_path = path.as_ref().to_path_buf();
        Self {
            staging_path: sibling(&store_path, "_temp"),
            lock_path: sibling(&store_path, ".lock"),
            store_path,
            ..Self::default()
        }
    }
}

/// `path` with `suffix` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(Config::DEFAULT_STORE));
    name.push(suffix);
    path.with_file_name(name)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Place the store at `path` and derive staging/lock paths from it
    pub fn store_path(mut self, path: impl AsRef<Path>) -> Self {
        let derived = Config::for_store(path);
        self.config.store_path = derived.store_path;
        self.config.staging_path = derived.staging_path;
        self.config.lock_path = derived.lock_path;
        self
    }

    /// Override the staging file path
    pub fn staging_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.staging_path = path.into();
        self
    }

    /// Override the lock file path
    pub fn lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.lock_path = path.into();
        self
    }

    /// Set the duplicate key policy
    pub fn duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.config.duplicate_keys = policy;
        self
    }

    /// Give up on the writer lock after `timeout`
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = Some(timeout);
        self
    }

    /// Enable or disable the post-rename directory fsync
    pub fn sync_dir(mut self, enabled: bool) -> Self {
        self.config.sync_dir = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
