//! Derives bundle identity and language from the location of a resource file.
//!
//! Pure path logic: nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::DEFAULT_BUNDLE_SUFFIXES;

/// Language assigned to files that do not live under an `.lproj` directory.
pub const BASE_LANGUAGE: &str = "base";

lazy_static! {
    static ref LPROJ_REGEX: Regex = Regex::new(r"(?i)^(.+)\.lproj$").unwrap();
}

/// Where a resource file belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Directory that groups the file into a bundle row.
    pub bundle: PathBuf,
    /// Language code, verbatim from the `.lproj` name, or [`BASE_LANGUAGE`].
    pub language: String,
    /// File stem, e.g. `Localizable`.
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    /// Lowercased directory suffixes that mark a bundle root.
    bundle_suffixes: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(DEFAULT_BUNDLE_SUFFIXES)
    }
}

impl Classifier {
    pub fn new<I, S>(bundle_suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Classifier {
            bundle_suffixes: bundle_suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Classifies `path`.
    ///
    /// The language comes from the nearest `<code>.lproj` ancestor. The bundle is
    /// the nearest non-`.lproj` ancestor carrying a bundle suffix; failing that,
    /// the nearest non-`.lproj` ancestor of the file.
    pub fn classify(&self, path: &Path) -> Classification {
        let mut language: Option<String> = None;
        let mut bundle: Option<&Path> = None;
        let mut fallback: Option<&Path> = None;

        for ancestor in path.ancestors().skip(1) {
            if language.is_some() && bundle.is_some() {
                break;
            }
            let Some(name) = ancestor.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };

            if let Some(code) = lproj_code(&name) {
                language.get_or_insert_with(|| code.to_string());
                continue;
            }

            fallback.get_or_insert(ancestor);
            if bundle.is_none() && self.is_bundle_root(&name) {
                bundle = Some(ancestor);
            }
        }

        let bundle = bundle
            .or(fallback)
            .or_else(|| path.parent())
            .unwrap_or_else(|| Path::new(""));

        Classification {
            bundle: bundle.to_path_buf(),
            language: language.unwrap_or_else(|| BASE_LANGUAGE.to_string()),
            table: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn is_bundle_root(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.bundle_suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
    }
}

/// Returns `de` for `de.lproj` (any case of the suffix).
pub fn lproj_code(name: &str) -> Option<&str> {
    LPROJ_REGEX
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
