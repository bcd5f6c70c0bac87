//! Store Reader
//!
//! Linear scan over the store file. Takes no lock: a concurrent `set`
//! only ever replaces the file by rename, so an open handle keeps seeing
//! the complete old file and a fresh open sees the complete new one.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::DuplicateKeys;
use crate::error::{Result, StoreError};
use crate::record::{self, Record};

/// Reads records from the store file
#[derive(Debug, Clone)]
pub struct StoreReader {
    path: PathBuf,
    duplicate_keys: DuplicateKeys,
}

impl StoreReader {
    pub fn new(path: impl Into<PathBuf>, duplicate_keys: DuplicateKeys) -> Self {
        Self {
            path: path.into(),
            duplicate_keys,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a key
    ///
    /// Returns:
    /// - `Ok(Some(value))`: a record for the key exists
    /// - `Ok(None)`: the file opened but holds no record for the key
    /// - `Err(OpenFailed)`: the store file could not be opened (e.g. absent)
    ///
    /// With `DuplicateKeys::Append` the first record in file order wins.
    /// With `Replace` the writer keeps one record per key; should a file
    /// edited by hand hold several, the last one wins.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut found = None;

        for record in self.records()? {
            let record = record?;
            if record.key != key {
                continue;
            }
            match self.duplicate_keys {
                // Append keeps every version; the oldest shadows later ones
                DuplicateKeys::Append => return Ok(Some(record.value)),
                // The writer leaves one record per key, so a later match can
                // only come from a hand-edited file; take the newest line
                DuplicateKeys::Replace => found = Some(record.value),
            }
        }

        Ok(found)
    }

    /// All decodable records in file order
    pub fn scan(&self) -> Result<Vec<Record>> {
        self.records()?.collect()
    }

    fn records(&self) -> Result<Records> {
        let file = File::open(&self.path).map_err(|source| StoreError::OpenFailed {
            path: self.path.clone(),
            source,
        })?;

        Ok(Records {
            lines: BufReader::new(file),
            line_no: 0,
            skipped: 0,
            path: self.path.clone(),
        })
    }
}

/// Iterator over the records of an open store file, skipping malformed lines
struct Records {
    lines: BufReader<File>,
    line_no: u64,
    skipped: u64,
    path: PathBuf,
}

impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        loop {
            line.clear();
            match self.lines.read_until(b'\n', &mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(StoreError::Io(e))),
            }
            self.line_no += 1;

            match std::str::from_utf8(&line).ok().and_then(record::decode) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.skipped += 1;
                    tracing::debug!(
                        path = %self.path.display(),
                        line = self.line_no,
                        "skipping malformed record"
                    );
                }
            }
        }
    }
}

impl Drop for Records {
    fn drop(&mut self) {
        if self.skipped > 0 {
            tracing::warn!(
                path = %self.path.display(),
                skipped = self.skipped,
                "store file contains malformed lines"
            );
        }
    }
}
