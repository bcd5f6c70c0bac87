//! Record codec
//!
//! Encoding and decoding of single-line records.

use crate::error::RecordError;
use super::Record;

/// Separates the key from the value
pub const SEPARATOR: char = ',';

/// Check that a pair can be stored as exactly one line
///
/// The empty key is allowed (`,value` decodes back to it). A value may not
/// end in `\r`, since `decode` strips that as part of a CRLF terminator.
pub fn validate(key: &str, value: &str) -> Result<(), RecordError> {
    if key.contains(SEPARATOR) {
        return Err(RecordError::KeyContainsSeparator);
    }
    if key.contains('\n') {
        return Err(RecordError::KeyContainsNewline);
    }
    if value.contains('\n') || value.ends_with('\r') {
        return Err(RecordError::ValueContainsNewline);
    }
    Ok(())
}

/// Encode a pair as `key,value` (no line terminator)
pub fn encode(key: &str, value: &str) -> Result<String, RecordError> {
    validate(key, value)?;

    let mut line = String::with_capacity(key.len() + 1 + value.len());
    line.push_str(key);
    line.push(SEPARATOR);
    line.push_str(value);
    Ok(line)
}

/// Encode a pair as `key,value\n`, ready to append to the store file
pub fn encode_line(key: &str, value: &str) -> Result<String, RecordError> {
    let mut line = encode(key, value)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line into a record
///
/// Splits on the first comma. Returns `None` when the line has no comma.
/// A trailing `\n` or `\r\n` is ignored.
pub fn decode(line: &str) -> Option<Record> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let (key, value) = line.split_once(SEPARATOR)?;
    Some(Record::new(key, value))
}
