//! Store Writer
//!
//! Crash-safe rewrite of the store file.
//!
//! ## Protocol
//! 1. Acquire the exclusive writer lock
//! 2. Open (truncate) the staging file
//! 3. Copy existing records into it (absent store = zero records)
//! 4. Append the new record
//! 5. fsync the staging file
//! 6. Rename staging onto the store (the commit point)
//! 7. Release the lock
//!
//! The store path is only touched by step 6, so a crash at any earlier
//! point leaves the previous store file intact. Steps 1-5 are
//! `StoreWriter::stage`, steps 6-7 are `StagedWrite::commit`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::{Mutex, MutexGuard};

use crate::config::{Config, DuplicateKeys};
use crate::error::{LockOp, Result, StoreError};
use crate::lock::{FileLock, LockGuard};
use crate::record;

/// Writes records using the staging-file protocol
#[derive(Debug)]
pub struct StoreWriter {
    config: Config,

    /// Advisory lock shared with other processes
    lock: FileLock,

    /// Serializes writers within this process before they touch the lock file
    serial: Mutex<()>,
}

/// Statistics from building a staging file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Lines carried over from the store file
    pub lines_copied: u64,

    /// Records for the same key left out (only under `DuplicateKeys::Replace`)
    pub lines_replaced: u64,
}

impl StoreWriter {
    pub fn new(config: Config) -> Self {
        let lock = FileLock::new(config.lock_path.clone());
        Self {
            config,
            lock,
            serial: Mutex::new(()),
        }
    }

    /// Insert or overwrite a record and make it durable
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.stage(key, value)?.commit()
    }

    /// Run steps 1-5: the staging file holds the next store version, synced,
    /// and the writer lock is held until the returned value is committed,
    /// aborted or dropped.
    pub fn stage(&self, key: &str, value: &str) -> Result<StagedWrite<'_>> {
        // Reject bad input before taking any lock
        let line = record::encode_line(key, value)?;

        let serial = self.serial.lock();

        // Step 1: exclusive lock
        let guard = self
            .lock
            .acquire(self.config.lock_timeout)
            .map_err(|source| StoreError::LockFailed {
                op: LockOp::Acquire,
                source,
            })?;

        // Step 2: staging file. On any error below `guard` drops and unlocks.
        let staging = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.config.staging_path)
            .map_err(|source| StoreError::OpenFailed {
                path: self.config.staging_path.clone(),
                source,
            })?;
        let mut out = BufWriter::new(staging);

        // Step 3: copy
        let stats = self.copy_records(key, &mut out)?;

        // Step 4: append
        out.write_all(line.as_bytes())?;

        // Step 5: durability barrier
        let staging = out.into_inner().map_err(|e| StoreError::Io(e.into_error()))?;
        staging.sync_all().map_err(|source| StoreError::FsyncFailed {
            path: self.config.staging_path.clone(),
            source,
        })?;

        tracing::debug!(
            staging = %self.config.staging_path.display(),
            copied = stats.lines_copied,
            replaced = stats.lines_replaced,
            "staged record"
        );

        Ok(StagedWrite {
            store_path: &self.config.store_path,
            staging_path: &self.config.staging_path,
            sync_dir: self.config.sync_dir,
            stats,
            lock: Some(guard),
            _serial: serial,
        })
    }

    /// Stream the current store into `out`, verbatim except for records of
    /// `key` when replacing duplicates
    fn copy_records(&self, key: &str, out: &mut impl Write) -> Result<StageStats> {
        let mut stats = StageStats::default();

        let store = match File::open(&self.config.store_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
            Err(source) => {
                return Err(StoreError::OpenFailed {
                    path: self.config.store_path.clone(),
                    source,
                })
            }
        };

        let mut input = BufReader::new(store);
        let mut line = Vec::new();
        loop {
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            if self.config.duplicate_keys == DuplicateKeys::Replace && has_key(&line, key) {
                stats.lines_replaced += 1;
                continue;
            }

            out.write_all(&line)?;
            // A last line without terminator would swallow the appended record
            if !line.ends_with(b"\n") {
                out.write_all(b"\n")?;
            }
            stats.lines_copied += 1;
        }

        Ok(stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn has_key(line: &[u8], key: &str) -> bool {
    std::str::from_utf8(line)
        .ok()
        .and_then(record::decode)
        .is_some_and(|r| r.key == key)
}

/// A fully written, synced staging file waiting to replace the store
///
/// Dropping it without `commit` leaves the store untouched and the staging
/// file on disk, the same state a crash before the rename would leave.
#[derive(Debug)]
pub struct StagedWrite<'a> {
    store_path: &'a Path,
    staging_path: &'a Path,
    sync_dir: bool,
    stats: StageStats,
    lock: Option<LockGuard>,
    _serial: MutexGuard<'a, ()>,
}

impl StagedWrite<'_> {
    pub fn stats(&self) -> StageStats {
        self.stats
    }

    pub fn staging_path(&self) -> &Path {
        self.staging_path
    }

    /// Steps 6-7: atomically replace the store, then release the lock
    ///
    /// A `DirSyncFailed` or release `LockFailed` error means the new store
    /// is already in place (`StoreError::is_committed`).
    pub fn commit(mut self) -> Result<()> {
        // Step 6: atomic replace
        fs::rename(self.staging_path, self.store_path).map_err(|source| {
            StoreError::RenameFailed {
                from: self.staging_path.to_path_buf(),
                to: self.store_path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!(store = %self.store_path.display(), "replaced store file");

        let dir_synced = if self.sync_dir {
            sync_parent_dir(self.store_path)
        } else {
            Ok(())
        };

        // Step 7: release
        let released = match self.lock.take() {
            Some(guard) => guard.release(),
            None => Ok(()),
        };

        if let Err(source) = dir_synced {
            if let Err(e) = released {
                tracing::warn!(error = %e, "failed to release writer lock");
            }
            return Err(StoreError::DirSyncFailed {
                path: parent_dir(self.store_path).to_path_buf(),
                source,
            });
        }

        released.map_err(|source| StoreError::LockFailed {
            op: LockOp::Release,
            source,
        })
    }

    /// Discard the staging file and release the lock; the store is unchanged
    pub fn abort(mut self) -> Result<()> {
        let removed = match fs::remove_file(self.staging_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StoreError::Io(e)),
            _ => Ok(()),
        };

        if let Some(guard) = self.lock.take() {
            guard.release().map_err(|source| StoreError::LockFailed {
                op: LockOp::Release,
                source,
            })?;
        }
        removed
    }
}

impl Drop for StagedWrite<'_> {
    fn drop(&mut self) {
        if self.lock.is_some() {
            tracing::debug!(
                staging = %self.staging_path.display(),
                "staged write dropped without commit"
            );
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    File::open(parent_dir(path))?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
