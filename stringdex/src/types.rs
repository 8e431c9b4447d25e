//! Core types shared by the parsers, the scanner and the index.
//! Parsers decode into [`Pair`]s; the scanner wraps them into [`ClassifiedRecord`]s;
//! the store hands back [`SearchHit`]s and [`ExportRow`]s.

use std::{fmt::Display, path::PathBuf};

use serde::Serialize;

/// A single key-value pair decoded from a resource file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pair {
    /// The resource identifier, e.g. `UPDATECODE`.
    pub key: String,
    /// The localized text.
    pub value: String,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Pair {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An entry the parser dropped while keeping the rest of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// Byte offset into the decoded UTF-8 text for `.strings` and XML plists,
    /// into the raw file for binary plists.
    pub offset: usize,
    pub message: String,
}

impl ParseWarning {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        ParseWarning {
            offset,
            message: message.into(),
        }
    }
}

impl Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "byte {}: {}", self.offset, self.message)
    }
}

/// Kind of container found where a string was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Dictionary,
    Array,
    Set,
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionKind::Dictionary => write!(f, "dictionary"),
            CollectionKind::Array => write!(f, "array"),
            CollectionKind::Set => write!(f, "set"),
        }
    }
}

/// A decoded property-list value, as far as this crate cares about it.
///
/// Only strings are indexable; containers and scalar types are kept as tags so
/// callers can report what they skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlistValue {
    String(String),
    Collection(CollectionKind),
    Unsupported(&'static str),
}

impl PlistValue {
    pub fn describe(&self) -> String {
        match self {
            PlistValue::String(_) => "string".to_string(),
            PlistValue::Collection(kind) => format!("nested {}", kind),
            PlistValue::Unsupported(tag) => format!("unsupported <{}>", tag),
        }
    }
}

/// One decoded pair, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRecord {
    /// Path of the owning bundle; groups records into one bundle row.
    pub bundle: PathBuf,
    /// Language code taken from the `.lproj` directory, or `base`.
    pub language: String,
    /// Stem of the resource file, e.g. `Localizable`.
    pub table: String,
    pub key: String,
    pub value: String,
    /// The resource file the pair was read from.
    pub source: PathBuf,
}

/// A bundle row of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub file_id: i64,
    pub name: String,
    pub path: String,
}

/// One search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub file_id: i64,
    pub key: String,
    pub lang: String,
    pub value: String,
}

/// One language variant of an exported key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub lang: String,
    pub value: String,
}

/// Language tag with the number of entries stored for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageCount {
    pub lang: String,
    pub entries: i64,
}

/// Resource table of a bundle with the number of entries it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub entries: i64,
}

/// Summary counts for a single bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleInfo {
    pub bundle: Bundle,
    /// Number of distinct languages.
    pub languages: i64,
    /// Largest number of entries stored for a single language.
    pub max_translations: i64,
    /// Total number of entries across all languages.
    pub total: i64,
}

/// A bundle removed by `delete`, with the number of strings that went with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedBundle {
    pub bundle: Bundle,
    pub strings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plist_value_describe() {
        assert_eq!(PlistValue::String("x".into()).describe(), "string");
        assert_eq!(
            PlistValue::Collection(CollectionKind::Dictionary).describe(),
            "nested dictionary"
        );
        assert_eq!(
            PlistValue::Unsupported("integer").describe(),
            "unsupported <integer>"
        );
    }

    #[test]
    fn test_search_hit_serializes_flat() {
        let hit = SearchHit {
            file_id: 3,
            key: "OK".to_string(),
            lang: "de".to_string(),
            value: "Weiter".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            serde_json::json!({"file_id": 3, "key": "OK", "lang": "de", "value": "Weiter"})
        );
    }

    #[test]
    fn test_parse_warning_display() {
        let warning = ParseWarning::new(12, "missing `;`");
        assert_eq!(warning.to_string(), "byte 12: missing `;`");
    }
}
