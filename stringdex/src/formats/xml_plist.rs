//! Support for XML property lists used as `.strings` tables.
//!
//! Only a flat `<dict>` of `<key>`/`<string>` pairs is indexable. Nested
//! containers and non-string scalars are skipped with a warning.

use quick_xml::{Reader, events::Event};

use crate::{
    error::ParseError,
    formats::encoding::decode_text,
    traits::Parser,
    types::{CollectionKind, Pair, ParseWarning, PlistValue},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub pairs: Vec<Pair>,
    pub warnings: Vec<ParseWarning>,
}

impl Format {
    /// Parses an XML plist from decoded text.
    pub fn from_text(text: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(text);

        loop {
            match next_event(&mut reader)? {
                Event::Start(e) if e.name().as_ref() == b"plist" => continue,
                Event::Start(e) if e.name().as_ref() == b"dict" => {
                    let (pairs, warnings) = read_root_dict(&mut reader)?;
                    return Ok(Format { pairs, warnings });
                }
                Event::Empty(e) if e.name().as_ref() == b"dict" => {
                    return Ok(Format {
                        pairs: Vec::new(),
                        warnings: Vec::new(),
                    });
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(ParseError::new(
                        position(&reader),
                        format!(
                            "root object is <{}>, expected a dictionary",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    ));
                }
                Event::Eof => {
                    return Err(ParseError::new(position(&reader), "property list has no root object"));
                }
                _ => {}
            }
        }
    }
}

impl Parser for Format {
    fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::from_text(&decode_text(bytes, None)?.text)
    }

    fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    fn into_parts(self) -> (Vec<Pair>, Vec<ParseWarning>) {
        (self.pairs, self.warnings)
    }
}

fn read_root_dict(
    reader: &mut Reader<&[u8]>,
) -> Result<(Vec<Pair>, Vec<ParseWarning>), ParseError> {
    let mut pairs = Vec::new();
    let mut warnings = Vec::new();
    let mut pending_key: Option<(usize, String)> = None;

    loop {
        let at = position(reader);
        let event = next_event(reader)?;
        let value = match event {
            Event::Start(e) if e.name().as_ref() == b"key" => {
                let key = read_text(reader)?;
                if let Some((offset, orphan)) = pending_key.replace((at, key)) {
                    warnings.push(ParseWarning::new(
                        offset,
                        format!("key `{}` has no value", orphan),
                    ));
                }
                continue;
            }
            Event::Empty(e) if e.name().as_ref() == b"key" => {
                pending_key = Some((at, String::new()));
                continue;
            }
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"string" => PlistValue::String(read_text(reader)?),
                    other => {
                        skip_element(reader)?;
                        tag_value(other)
                    }
                }
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"string" => PlistValue::String(String::new()),
                other => tag_value(other),
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::new(at, "unterminated <dict>")),
            _ => continue,
        };

        match (pending_key.take(), value) {
            (Some((offset, key)), _) if key.is_empty() => {
                warnings.push(ParseWarning::new(offset, "empty key"));
            }
            (Some((_, key)), PlistValue::String(value)) => pairs.push(Pair { key, value }),
            (Some((offset, key)), other) => warnings.push(ParseWarning::new(
                offset,
                format!("skipping `{}`: {}", key, other.describe()),
            )),
            (None, other) => warnings.push(ParseWarning::new(
                at,
                format!("{} without a key", other.describe()),
            )),
        }
    }

    if let Some((offset, key)) = pending_key {
        warnings.push(ParseWarning::new(
            offset,
            format!("key `{}` has no value", key),
        ));
    }

    Ok((pairs, warnings))
}

fn tag_value(name: &[u8]) -> PlistValue {
    match name {
        b"dict" => PlistValue::Collection(CollectionKind::Dictionary),
        b"array" => PlistValue::Collection(CollectionKind::Array),
        b"integer" => PlistValue::Unsupported("integer"),
        b"real" => PlistValue::Unsupported("real"),
        b"true" => PlistValue::Unsupported("true"),
        b"false" => PlistValue::Unsupported("false"),
        b"date" => PlistValue::Unsupported("date"),
        b"data" => PlistValue::Unsupported("data"),
        _ => PlistValue::Unsupported("unknown"),
    }
}

/// Reads character data up to the closing tag of the current element.
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, ParseError> {
    let mut out = String::new();
    loop {
        let at = position(reader);
        match next_event(reader)? {
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| ParseError::new(at, err.to_string()))?;
                out.push_str(&text);
            }
            Event::CData(e) => out.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => return Ok(out),
            Event::Eof => return Err(ParseError::new(at, "unterminated text element")),
            Event::Start(_) | Event::Empty(_) => {
                return Err(ParseError::new(at, "unexpected element inside text"));
            }
            _ => {}
        }
    }
}

fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), ParseError> {
    let mut depth = 1usize;
    loop {
        match next_event(reader)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(ParseError::new(position(reader), "unterminated element"));
            }
            _ => {}
        }
    }
}

fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, ParseError> {
    reader
        .read_event()
        .map_err(|e| ParseError::new(position(reader), e.to_string()))
}

fn position(reader: &Reader<&[u8]>) -> usize {
    reader.buffer_position() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
"#;

    fn plist(body: &str) -> String {
        format!("{}<plist version=\"1.0\">\n{}\n</plist>\n", HEADER, body)
    }

    #[test]
    fn test_error_offsets_count_decoded_text() {
        let text = plist("<array/>");
        let from_utf8 = Format::from_bytes(text.as_bytes()).unwrap_err();

        let mut utf16 = vec![0xFF, 0xFE];
        utf16.extend(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()));
        let from_utf16 = Format::from_bytes(&utf16).unwrap_err();

        assert_eq!(from_utf16.offset, from_utf8.offset);
        assert!(from_utf8.offset > text.find("<plist").unwrap());
        assert!(from_utf8.offset <= text.len());
    }

    #[test]
    fn test_flat_dict() {
        let text = plist(
            "<dict>\n  <key>OK</key>\n  <string>Weiter</string>\n  <key>Amp</key>\n  <string>a &amp; b</string>\n</dict>",
        );
        let parsed = Format::from_text(&text).unwrap();
        assert_eq!(
            parsed.pairs,
            vec![Pair::new("OK", "Weiter"), Pair::new("Amp", "a & b")]
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_whitespace_inside_string_is_preserved() {
        let text = plist("<dict><key>k</key><string>  two  spaces\nnewline </string></dict>");
        let parsed = Format::from_text(&text).unwrap();
        assert_eq!(parsed.pairs[0].value, "  two  spaces\nnewline ");
    }

    #[test]
    fn test_nested_and_typed_values_are_skipped() {
        let text = plist(
            "<dict>
               <key>nested</key><dict><key>a</key><string>b</string></dict>
               <key>list</key><array><string>x</string></array>
               <key>count</key><integer>3</integer>
               <key>flag</key><true/>
               <key>empty</key><string/>
               <key>kept</key><string>yes</string>
             </dict>",
        );
        let parsed = Format::from_text(&text).unwrap();
        assert_eq!(
            parsed.pairs,
            vec![Pair::new("empty", ""), Pair::new("kept", "yes")]
        );
        assert_eq!(parsed.warnings.len(), 4);
        assert!(parsed.warnings[0].message.contains("nested dictionary"));
        assert!(parsed.warnings[2].message.contains("<integer>"));
    }

    #[test]
    fn test_empty_root_dict() {
        let parsed = Format::from_text(&plist("<dict/>")).unwrap();
        assert!(parsed.pairs.is_empty());
    }

    #[test]
    fn test_non_dict_root_is_an_error() {
        let err = Format::from_text(&plist("<array><string>x</string></array>")).unwrap_err();
        assert!(err.message.contains("expected a dictionary"));
    }

    #[test]
    fn test_unterminated_dict_is_an_error() {
        let text = format!("{}<plist><dict><key>a</key><string>b</string>", HEADER);
        assert!(Format::from_text(&text).is_err());
    }

    #[test]
    fn test_from_bytes_decodes_first() {
        let text = plist("<dict><key>k</key><string>v</string></dict>");
        let parsed = Format::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(parsed.pairs, vec![Pair::new("k", "v")]);
    }
}
