//! Process Lock
//!
//! Advisory, exclusive, whole-file lock that serializes writers across
//! processes. Only processes going through this module are excluded; the
//! lock does nothing against a process that opens the store file directly.
//!
//! The lock lives on a dedicated lock file rather than on the store file,
//! because the store file is replaced by rename on every `set` and a lock
//! held on the old inode would not exclude a writer opening the new one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::LockError;

/// Delay between attempts when acquiring with a timeout
const RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Handle for acquiring the writer lock at a given path
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the exclusive lock is held
    ///
    /// With `timeout = None` this waits forever. With `Some(d)` it retries a
    /// non-blocking attempt until `d` has elapsed and then gives up with
    /// `LockError::Timeout`.
    pub fn acquire(&self, timeout: Option<Duration>) -> Result<LockGuard, LockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        match timeout {
            None => file.lock_exclusive()?,
            Some(limit) => Self::lock_with_deadline(&file, limit)?,
        }

        tracing::debug!(path = %self.path.display(), "acquired writer lock");
        Ok(LockGuard {
            file,
            path: self.path.clone(),
            released: false,
        })
    }

    /// Try once without blocking; `Ok(None)` if another process holds it
    pub fn try_acquire(&self) -> Result<Option<LockGuard>, LockError> {
        match self.acquire(Some(Duration::ZERO)) {
            Ok(guard) => Ok(Some(guard)),
            Err(LockError::Timeout { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn lock_with_deadline(file: &File, limit: Duration) -> Result<(), LockError> {
        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(LockError::Timeout {
                            waited_ms: waited.as_millis(),
                        });
                    }
                    thread::sleep(RETRY_INTERVAL.min(limit - waited));
                }
                Err(e) => return Err(LockError::Io(e)),
            }
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Held writer lock, released on `release()` or drop
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and report whether the unlock primitive succeeded
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        FileExt::unlock(&self.file)?;
        tracing::debug!(path = %self.path.display(), "released writer lock");
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Closing the descriptor drops the lock too; this only surfaces the error.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release writer lock");
        }
    }
}
