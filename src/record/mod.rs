//! Record Module
//!
//! A record is one `key,value` pair stored as one line of text.
//!
//! ## Line Format
//! ```text
//! ┌───────────┬───┬──────────────────────────┬────┐
//! │    key    │ , │          value           │ \n │
//! └───────────┴───┴──────────────────────────┴────┘
//! ```
//!
//! The key ends at the first comma; the value may contain further commas.
//! There is no escaping, so the file stays greppable.

mod codec;

pub use codec::{decode, encode, encode_line, validate, SEPARATOR};

use std::fmt;

/// A single key-value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, SEPARATOR, self.value)
    }
}
