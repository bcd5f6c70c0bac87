//! # linekv
//!
//! A persistent key-value store kept in a single text file:
//! - One `key,value` record per line, plain and greppable
//! - Crash-safe writes via staging file, fsync and atomic rename
//! - Advisory file lock serializing writers across processes
//! - Lock-free readers that never observe a partial file
//!
//! ## Architecture Overview
//!
//! ```text
//!   get(key)                              set(key, value)
//!      │                                        │
//!      ▼                                        ▼
//! ┌─────────────┐                       ┌───────────────┐
//! │ StoreReader │                       │  StoreWriter  │
//! │ (linear     │                       │ lock → copy → │
//! │  scan)      │                       │ append → sync │
//! └──────┬──────┘                       │ → rename      │
//!        │                              └───┬───────┬───┘
//!        │        ┌──────────────┐          │       │
//!        └───────►│ Record Codec │◄─────────┘       ▼
//!                 └──────────────┘           ┌────────────┐
//!                                            │  FileLock  │
//!                                            └────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod lock;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LockError, LockOp, RecordError, Result, StoreError};
pub use config::{Config, DuplicateKeys};
pub use record::Record;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
