//! All supported resource file encodings.
//!
//! [`parse`] sniffs the leading bytes of a file and dispatches to the matching
//! decoder. File extensions are never consulted: a `.strings` file may hold a
//! legacy dictionary, an XML plist, or a binary plist.

pub mod binary_plist;
pub mod encoding;
pub mod strings;
pub mod xml_plist;

use std::fmt::{Display, Formatter};

use encoding_rs::Encoding;

pub use binary_plist::Format as BinaryPlistFormat;
pub use strings::Format as StringsFormat;
pub use xml_plist::Format as XmlPlistFormat;

use crate::{
    error::ParseError,
    formats::encoding::decode_text,
    traits::Parser,
    types::{Pair, ParseWarning},
};

/// The on-disk encodings a resource file can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Legacy `"key" = "value";` text.
    Strings,
    /// Tagged-markup property list.
    XmlPlist,
    /// Compact `bplist00` property list.
    BinaryPlist,
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use stringdex::formats::FormatType;
/// assert_eq!(FormatType::Strings.to_string(), "strings");
/// assert_eq!(FormatType::BinaryPlist.to_string(), "binary-plist");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Strings => write!(f, "strings"),
            FormatType::XmlPlist => write!(f, "xml-plist"),
            FormatType::BinaryPlist => write!(f, "binary-plist"),
        }
    }
}

/// The result of decoding one resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub format: FormatType,
    /// Pairs in first-seen order.
    pub pairs: Vec<Pair>,
    /// Entries that were skipped.
    pub warnings: Vec<ParseWarning>,
}

/// Decodes a resource file held in memory.
///
/// `fallback` is the declared 8-bit encoding for text that is neither
/// BOM-marked, UTF-16, nor valid UTF-8.
///
/// # Example
/// ```rust
/// use stringdex::formats::{parse, FormatType};
/// let decoded = parse(br#""OK" = "Weiter";"#, None)?;
/// assert_eq!(decoded.format, FormatType::Strings);
/// assert_eq!(decoded.pairs[0].key, "OK");
/// # Ok::<(), stringdex::error::ParseError>(())
/// ```
pub fn parse(bytes: &[u8], fallback: Option<&'static Encoding>) -> Result<Decoded, ParseError> {
    if bytes.starts_with(binary_plist::MAGIC) {
        let (pairs, warnings) = BinaryPlistFormat::from_bytes(bytes)?.into_parts();
        return Ok(Decoded {
            format: FormatType::BinaryPlist,
            pairs,
            warnings,
        });
    }

    let decoded = decode_text(bytes, fallback)?;
    if looks_like_xml(&decoded.text) {
        let (pairs, warnings) = XmlPlistFormat::from_text(&decoded.text)?.into_parts();
        return Ok(Decoded {
            format: FormatType::XmlPlist,
            pairs,
            warnings,
        });
    }

    let (pairs, warnings) = StringsFormat::from_decoded(decoded).into_parts();
    Ok(Decoded {
        format: FormatType::Strings,
        pairs,
        warnings,
    })
}

fn looks_like_xml(text: &str) -> bool {
    let head = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    head.starts_with("<?xml") || head.starts_with("<!DOCTYPE") || head.starts_with("<plist")
}
