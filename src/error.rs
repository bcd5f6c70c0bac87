//! Error types for linekv
//!
//! One error type for every store operation. Each failure kind of the
//! `set` protocol gets its own variant so callers can tell a failed lock
//! from a failed fsync without parsing messages.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Which side of the lock protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOp {
    Acquire,
    Release,
}

impl fmt::Display for LockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockOp::Acquire => f.write_str("acquire"),
            LockOp::Release => f.write_str("release"),
        }
    }
}

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Open / Lock Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {op} store lock: {source}")]
    LockFailed {
        op: LockOp,
        #[source]
        source: LockError,
    },

    // -------------------------------------------------------------------------
    // Durability / Replace Errors
    // -------------------------------------------------------------------------
    #[error("fsync of {} failed: {source}", path.display())]
    FsyncFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fsync of directory {} failed after commit: {source}", path.display())]
    DirSyncFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Copy / Append Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("Key not found")]
    KeyNotFound,
}

impl StoreError {
    /// Whether the new store file was already visible when this error
    /// happened. Such errors are warnings: the write itself went through.
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            StoreError::LockFailed { op: LockOp::Release, .. } | StoreError::DirSyncFailed { .. }
        )
    }
}

/// Errors from the process lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file IO error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {waited_ms} ms waiting for the lock")]
    Timeout { waited_ms: u128 },
}

/// Reasons a key/value pair cannot be encoded as a single line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("key contains the ',' separator")]
    KeyContainsSeparator,

    #[error("key contains a line break")]
    KeyContainsNewline,

    #[error("value contains a line break or ends in a carriage return")]
    ValueContainsNewline,
}
