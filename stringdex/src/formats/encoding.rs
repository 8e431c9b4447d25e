//! Character-set detection for the textual resource formats.
//!
//! Legacy `.strings` files show up as UTF-8, UTF-16 with or without a BOM, and
//! occasionally as an 8-bit Mac/Windows codepage. Everything is decoded to a
//! Rust `String` before tokenizing.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::ParseError;

/// Text decoded from a resource file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    /// Malformed sequences were replaced with U+FFFD; entries containing the
    /// replacement character must not be trusted.
    pub lossy: bool,
}

/// Number of leading bytes inspected by the BOM-less UTF-16 heuristic.
const SNIFF_LEN: usize = 64;

/// Decodes raw bytes to text.
///
/// Order of preference: byte-order mark, BOM-less UTF-16, strict UTF-8, the
/// caller's `fallback` encoding, then lossy UTF-8. Bytes containing NULs that
/// do not look like UTF-16 are rejected as not being text at all.
pub fn decode_text(
    bytes: &[u8],
    fallback: Option<&'static Encoding>,
) -> Result<DecodedText, ParseError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Ok(decode_with(encoding, &bytes[bom_len..]));
    }

    if let Some(encoding) = sniff_utf16(bytes) {
        return Ok(decode_with(encoding, bytes));
    }

    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        return Err(ParseError::new(
            nul,
            "binary data without a recognizable format marker",
        ));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(DecodedText {
            text: text.to_string(),
            encoding: UTF_8,
            lossy: false,
        }),
        Err(_) => match fallback {
            Some(encoding) => Ok(decode_with(encoding, bytes)),
            None => Ok(decode_with(UTF_8, bytes)),
        },
    }
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> DecodedText {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding,
        lossy: had_errors,
    }
}

/// Guesses UTF-16 byte order from the position of NUL bytes in mostly-ASCII text.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return None;
    }

    let window = &bytes[..bytes.len().min(SNIFF_LEN)];
    let units = window.len() / 2;
    let (mut even_nuls, mut odd_nuls) = (0usize, 0usize);
    for unit in window.chunks_exact(2) {
        if unit[0] == 0 && unit[1] != 0 {
            even_nuls += 1;
        } else if unit[1] == 0 && unit[0] != 0 {
            odd_nuls += 1;
        }
    }

    if odd_nuls * 2 > units {
        Some(UTF_16LE)
    } else if even_nuls * 2 > units {
        Some(UTF_16BE)
    } else {
        None
    }
}
