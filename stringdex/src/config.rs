//! Typed configuration for scanning and searching.
//!
//! Everything has a default so an empty (or absent) config file is valid:
//!
//! ```toml
//! [scan]
//! resource_patterns = ["*.strings"]
//! bundle_suffixes = [".app", ".framework", ".bundle"]
//! fallback_encoding = "macintosh"
//! workers = 0
//! channel_capacity = 1024
//!
//! [search]
//! languages = ["en", "de", "Ger"]
//! case_insensitive = true
//! ```

use std::{fs, path::Path};

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scan: ScanConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(s).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or returns the defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        match fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                Error::config(format!("{}: {}", path.as_ref().display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.scan.channel_capacity == 0 {
            return Err(Error::config("scan.channel_capacity must be at least 1"));
        }
        if self.scan.resource_patterns.is_empty() {
            return Err(Error::config("scan.resource_patterns must not be empty"));
        }
        if let Some(label) = &self.scan.fallback_encoding {
            if Encoding::for_label(label.as_bytes()).is_none() {
                return Err(Error::config(format!("unknown fallback_encoding `{}`", label)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Glob patterns matched against file names.
    pub resource_patterns: Vec<String>,
    /// Directory suffixes that mark a bundle root.
    pub bundle_suffixes: Vec<String>,
    /// WHATWG label of the 8-bit encoding used for non-UTF text.
    pub fallback_encoding: Option<String>,
    /// Parse workers; 0 lets rayon decide.
    pub workers: usize,
    /// Capacity of each bounded channel in the pipeline.
    pub channel_capacity: usize,
}

impl ScanConfig {
    /// The resolved fallback encoding, if one is configured.
    pub fn fallback_encoding(&self) -> Option<&'static Encoding> {
        self.fallback_encoding
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            resource_patterns: vec!["*.strings".to_string()],
            bundle_suffixes: DEFAULT_BUNDLE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_encoding: Some("macintosh".to_string()),
            workers: 0,
            channel_capacity: 1024,
        }
    }
}

pub const DEFAULT_BUNDLE_SUFFIXES: &[&str] = &[
    ".app",
    ".framework",
    ".bundle",
    ".appex",
    ".plugin",
    ".kext",
    ".prefPane",
    ".xpc",
    ".qlgenerator",
    ".saver",
    ".component",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Language-tag prefixes whose text is matched when none are given.
    pub languages: Vec<String>,
    pub case_insensitive: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            languages: ["en", "de", "Ger"].iter().map(|s| s.to_string()).collect(),
            case_insensitive: true,
        }
    }
}
