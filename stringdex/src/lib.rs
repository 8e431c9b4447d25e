#![forbid(unsafe_code)]
//! Searchable index of localized UI strings harvested from Apple resource files.
//!
//! Scans directory trees for `.strings` resources, decodes them whatever their
//! on-disk encoding, and keeps a deduplicated SQLite index that answers
//! "how was this phrase translated into other languages?".
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stringdex::{CancelToken, IndexStore, Scanner, SearchOptions, config::Config};
//!
//! let config = Config::default();
//! let mut store = IndexStore::open("stringdex.db")?;
//!
//! let scanner = Scanner::new(&config.scan, CancelToken::new())?;
//! store.add_scan(scanner.scan("/Applications", true)?)?;
//!
//! for hit in store.search("Update s%", &SearchOptions::from(&config.search))? {
//!     println!("{} {} {}", hit.file_id, hit.lang, hit.value);
//! }
//! # Ok::<(), stringdex::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **Legacy `.strings`**: `"key" = "value";` text in UTF-8, UTF-16 or an 8-bit encoding
//! - **XML property lists**: a `<dict>` of `<key>`/`<string>` pairs
//! - **Binary property lists**: `bplist00` object tables
//!
//! The format is sniffed from the content, never from the file name.

pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod formats;
pub mod scanner;
pub mod store;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    classify::{Classification, Classifier},
    config::Config,
    error::{Error, ParseError, StoreError},
    export::Exporter,
    formats::{Decoded, FormatType, parse},
    scanner::{CancelToken, ScanReport, ScanStream, Scanner},
    store::{AddSummary, DeleteTarget, IndexStore, SearchOptions, SearchTarget},
    types::{ClassifiedRecord, ExportRow, Pair, SearchHit},
};
