//! All error types for the stringdex crate.
//!
//! [`ParseError`] is per-file and recoverable: the scanner logs it and moves on.
//! [`StoreError`] is fatal for the invocation that hit it. [`Error`] is the
//! umbrella returned by the public operations.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl Error {
    /// Creates a new usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    /// Creates a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Error::Store(StoreError::Sqlite(value))
    }
}

/// A resource file that could not be decoded at all.
///
/// `offset` is where decoding gave up. For binary plists and for bytes that
/// could not be turned into text it counts bytes of the raw file. For XML
/// plists it counts bytes of the decoded UTF-8 text, so it only matches the
/// raw file when the source was UTF-8 without a byte-order mark.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("index not found at {}; run `add` first", .0.display())]
    Missing(PathBuf),

    #[error("index schema version {found} does not match expected version {expected}")]
    SchemaMismatch { found: i64, expected: i64 },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_parse_error_display_includes_offset() {
        let error = ParseError::new(42, "truncated trailer");
        assert_eq!(error.to_string(), "parse error at byte 42: truncated trailer");
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let error = Error::from(ParseError::new(3, "bad"));
        assert_eq!(error.to_string(), "parse error at byte 3: bad");
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_missing_store_error() {
        let error = StoreError::Missing(PathBuf::from("/tmp/none.db"));
        assert_eq!(
            error.to_string(),
            "index not found at /tmp/none.db; run `add` first"
        );
    }

    #[test]
    fn test_schema_mismatch_error() {
        let error = Error::from(StoreError::SchemaMismatch {
            found: 7,
            expected: 1,
        });
        assert!(error.to_string().contains("schema version 7"));
    }

    #[test]
    fn test_usage_and_config_helpers() {
        assert_eq!(
            Error::usage("empty pattern").to_string(),
            "invalid arguments: empty pattern"
        );
        assert_eq!(
            Error::config("bad toml").to_string(),
            "invalid configuration: bad toml"
        );
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Cancelled;
        let debug = format!("{:?}", error);
        assert!(debug.contains("Cancelled"));
    }
}
