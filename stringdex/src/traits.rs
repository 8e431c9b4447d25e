//! Traits for format-agnostic decoding of resource files.

use std::{fs, path::Path};

use crate::{
    error::{Error, ParseError},
    types::{Pair, ParseWarning},
};

/// A trait for decoding one resource file held in memory.
///
/// # Example
///
/// ```rust
/// use stringdex::traits::Parser;
/// let format = stringdex::formats::strings::Format::from_bytes(br#""OK" = "Weiter";"#)?;
/// assert_eq!(format.pairs()[0].value, "Weiter");
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Decode from raw file bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError>
    where
        Self: Sized;

    /// Read and decode a file.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }

    /// Decoded pairs in first-seen order.
    fn pairs(&self) -> &[Pair];

    /// Entries that were dropped while decoding.
    fn warnings(&self) -> &[ParseWarning];

    /// Splits into pairs and warnings.
    fn into_parts(self) -> (Vec<Pair>, Vec<ParseWarning>);
}
