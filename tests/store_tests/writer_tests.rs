//! Tests for Store Writer
//!
//! These tests verify:
//! - The staging/fsync/rename protocol and its file layout
//! - Store is unchanged until commit (crash window)
//! - Copy phase is verbatim, with duplicate handling per policy
//! - Each failure kind maps to its StoreError variant

use std::fs;
use std::time::Duration;

use linekv::config::{Config, DuplicateKeys};
use linekv::lock::FileLock;
use linekv::store::{StageStats, StoreWriter};
use linekv::{LockError, LockOp, RecordError, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_config() -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::for_store(temp_dir.path().join("database"));
    (temp_dir, config)
}

fn setup_temp_writer() -> (TempDir, StoreWriter) {
    let (temp_dir, config) = setup_temp_config();
    (temp_dir, StoreWriter::new(config))
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_first_set_creates_store() {
    let (_temp, writer) = setup_temp_writer();
    let config = writer.config().clone();
    assert!(!config.store_path.exists());

    writer.set("color", "blue").unwrap();

    assert_eq!(fs::read_to_string(&config.store_path).unwrap(), "color,blue\n");
    assert!(!config.staging_path.exists());
    assert!(config.lock_path.exists());
}

#[test]
fn test_set_appends_new_keys_in_order() {
    let (_temp, writer) = setup_temp_writer();

    writer.set("a", "1").unwrap();
    writer.set("b", "2").unwrap();
    writer.set("c", "3").unwrap();

    let contents = fs::read_to_string(&writer.config().store_path).unwrap();
    assert_eq!(contents, "a,1\nb,2\nc,3\n");
}

#[test]
fn test_replace_policy_overwrites_existing_key() {
    let (_temp, writer) = setup_temp_writer();

    writer.set("color", "blue").unwrap();
    writer.set("size", "L").unwrap();
    writer.set("color", "red").unwrap();

    let contents = fs::read_to_string(&writer.config().store_path).unwrap();
    assert_eq!(contents, "size,L\ncolor,red\n");
}

#[test]
fn test_append_policy_keeps_every_record() {
    let (_temp, config) = setup_temp_config();
    let writer = StoreWriter::new(Config {
        duplicate_keys: DuplicateKeys::Append,
        ..config
    });

    writer.set("color", "blue").unwrap();
    writer.set("color", "red").unwrap();

    let contents = fs::read_to_string(&writer.config().store_path).unwrap();
    assert_eq!(contents, "color,blue\ncolor,red\n");
}

#[test]
fn test_copy_is_verbatim() {
    let (_temp, writer) = setup_temp_writer();
    let store_path = writer.config().store_path.clone();
    fs::write(&store_path, b"# not a record\nx,1\r\n\nlast,no newline").unwrap();

    writer.set("new", "v").unwrap();

    let contents = fs::read(&store_path).unwrap();
    assert_eq!(
        contents,
        b"# not a record\nx,1\r\n\nlast,no newline\nnew,v\n".to_vec()
    );
}

#[test]
fn test_stage_stats() {
    let (_temp, writer) = setup_temp_writer();
    fs::write(&writer.config().store_path, "a,1\nb,2\na,3\n").unwrap();

    let staged = writer.stage("a", "4").unwrap();

    assert_eq!(
        staged.stats(),
        StageStats {
            lines_copied: 1,
            lines_replaced: 2,
        }
    );
    staged.commit().unwrap();
}

// =============================================================================
// Durability / Atomicity Tests
// =============================================================================

#[test]
fn test_store_equals_staged_bytes_after_commit() {
    let (_temp, writer) = setup_temp_writer();
    writer.set("a", "1").unwrap();

    let staged = writer.stage("b", "2").unwrap();
    let staged_bytes = fs::read(staged.staging_path()).unwrap();
    staged.commit().unwrap();

    let store_bytes = fs::read(&writer.config().store_path).unwrap();
    assert_eq!(store_bytes, staged_bytes);
    assert_eq!(store_bytes, b"a,1\nb,2\n".to_vec());
}

#[test]
fn test_store_unchanged_until_commit() {
    let (_temp, writer) = setup_temp_writer();
    let store_path = writer.config().store_path.clone();
    writer.set("a", "1").unwrap();
    let before = fs::read(&store_path).unwrap();

    let staged = writer.stage("b", "2").unwrap();

    // Synced but not renamed: the store still has the old contents
    assert_eq!(fs::read(&store_path).unwrap(), before);
    assert_eq!(fs::read(staged.staging_path()).unwrap(), b"a,1\nb,2\n".to_vec());

    staged.commit().unwrap();
    assert_eq!(fs::read(&store_path).unwrap(), b"a,1\nb,2\n".to_vec());
}

#[test]
fn test_dropped_stage_leaves_store_and_releases_lock() {
    let (_temp, writer) = setup_temp_writer();
    let config = writer.config().clone();
    writer.set("a", "1").unwrap();
    let before = fs::read(&config.store_path).unwrap();

    // Simulates a crash between fsync and rename
    drop(writer.stage("b", "2").unwrap());

    assert_eq!(fs::read(&config.store_path).unwrap(), before);
    assert!(config.staging_path.exists());
    assert!(FileLock::new(&config.lock_path).try_acquire().unwrap().is_some());

    // The next set overwrites the orphaned staging file
    writer.set("c", "3").unwrap();
    assert_eq!(fs::read_to_string(&config.store_path).unwrap(), "a,1\nc,3\n");
}

#[test]
fn test_abort_removes_staging_file() {
    let (_temp, writer) = setup_temp_writer();
    let config = writer.config().clone();
    writer.set("a", "1").unwrap();

    writer.stage("b", "2").unwrap().abort().unwrap();

    assert_eq!(fs::read_to_string(&config.store_path).unwrap(), "a,1\n");
    assert!(!config.staging_path.exists());
}

#[test]
fn test_set_without_dir_sync() {
    let (_temp, config) = setup_temp_config();
    let writer = StoreWriter::new(Config {
        sync_dir: false,
        ..config
    });

    writer.set("k", "v").unwrap();
    assert_eq!(fs::read_to_string(&writer.config().store_path).unwrap(), "k,v\n");
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_invalid_record_touches_nothing() {
    let (_temp, writer) = setup_temp_writer();
    let config = writer.config().clone();

    let err = writer.set("bad,key", "v").unwrap_err();

    assert!(matches!(
        err,
        StoreError::InvalidRecord(RecordError::KeyContainsSeparator)
    ));
    assert!(!config.store_path.exists());
    assert!(!config.staging_path.exists());
    assert!(!config.lock_path.exists());
}

#[test]
fn test_lock_timeout_is_lock_failed() {
    let (_temp, config) = setup_temp_config();
    let writer = StoreWriter::new(Config {
        lock_timeout: Some(Duration::from_millis(30)),
        ..config
    });

    let _held = FileLock::new(&writer.config().lock_path).acquire(None).unwrap();
    let err = writer.set("k", "v").unwrap_err();

    assert!(matches!(
        err,
        StoreError::LockFailed {
            op: LockOp::Acquire,
            source: LockError::Timeout { .. },
        }
    ));
    assert!(!err.is_committed());
    assert!(!writer.config().store_path.exists());
}

#[test]
fn test_unopenable_staging_is_open_failed_and_unlocks() {
    let (temp, config) = setup_temp_config();
    let writer = StoreWriter::new(Config {
        staging_path: temp.path().join("missing").join("staging"),
        ..config
    });

    let err = writer.set("k", "v").unwrap_err();

    assert!(matches!(err, StoreError::OpenFailed { .. }));
    assert!(FileLock::new(&writer.config().lock_path).try_acquire().unwrap().is_some());
}

#[test]
fn test_rename_failure_leaves_staging_behind() {
    let (temp, config) = setup_temp_config();
    // Store directory does not exist: copy sees no records, rename has no target dir
    let writer = StoreWriter::new(Config {
        store_path: temp.path().join("missing").join("database"),
        ..config
    });

    let err = writer.set("k", "v").unwrap_err();

    assert!(matches!(err, StoreError::RenameFailed { .. }));
    assert!(!err.is_committed());
    assert_eq!(fs::read_to_string(&writer.config().staging_path).unwrap(), "k,v\n");
    assert!(FileLock::new(&writer.config().lock_path).try_acquire().unwrap().is_some());
}

// =============================================================================
// Post-Commit Failure Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_dir_sync_failure_is_committed() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("store");
    fs::create_dir(&dir).unwrap();
    let writer = StoreWriter::new(Config::for_store(dir.join("database")));
    writer.set("a", "1").unwrap();

    // Write + search but no read: rename works, opening the directory does not
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o300)).unwrap();
    if fs::read_dir(&dir).is_ok() {
        // Privileged user; permission bits are not enforced
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = writer.set("b", "2");
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, StoreError::DirSyncFailed { .. }));
    assert!(err.is_committed());
    assert_eq!(
        fs::read_to_string(&writer.config().store_path).unwrap(),
        "a,1\nb,2\n"
    );
    assert!(!writer.config().staging_path.exists());
    assert!(FileLock::new(&writer.config().lock_path).try_acquire().unwrap().is_some());
}

#[test]
fn test_is_committed_classification() {
    let io_err = || std::io::Error::new(std::io::ErrorKind::Other, "boom");

    let release = StoreError::LockFailed {
        op: LockOp::Release,
        source: LockError::Io(io_err()),
    };
    let dir_sync = StoreError::DirSyncFailed {
        path: "dir".into(),
        source: io_err(),
    };
    let acquire = StoreError::LockFailed {
        op: LockOp::Acquire,
        source: LockError::Io(io_err()),
    };
    let fsync = StoreError::FsyncFailed {
        path: "staging".into(),
        source: io_err(),
    };
    let rename = StoreError::RenameFailed {
        from: "staging".into(),
        to: "store".into(),
        source: io_err(),
    };

    assert!(release.is_committed());
    assert!(dir_sync.is_committed());
    assert!(!acquire.is_committed());
    assert!(!fsync.is_committed());
    assert!(!rename.is_committed());
}
