//! Support for the legacy Apple `.strings` dictionary format.
//!
//! The format is a sequence of `"key" = "value";` statements with C-style
//! comments. Keys and values may be quoted or bare words, values may span
//! lines, and `"key";` is shorthand for a key that is its own value.
//! A broken statement only costs that one entry: the tokenizer records a
//! [`ParseWarning`] and resynchronises on the next statement.

use std::{io::Write, str::FromStr};

use encoding_rs::{Encoding, UTF_8};

use crate::{
    error::{Error, ParseError},
    formats::encoding::{DecodedText, decode_text},
    traits::Parser,
    types::{Pair, ParseWarning},
};

/// A decoded `.strings` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    /// Character set the file was stored in.
    pub encoding: &'static Encoding,
    /// All key-value pairs in file order.
    pub pairs: Vec<Pair>,
    /// Statements that were skipped.
    pub warnings: Vec<ParseWarning>,
}

impl Format {
    /// Decodes raw bytes, using `fallback` for 8-bit files that are not UTF-8.
    pub fn from_bytes_with_fallback(
        bytes: &[u8],
        fallback: Option<&'static Encoding>,
    ) -> Result<Self, ParseError> {
        Ok(Self::from_decoded(decode_text(bytes, fallback)?))
    }

    /// Tokenizes text that has already been decoded.
    pub fn from_decoded(decoded: DecodedText) -> Self {
        let (pairs, warnings) = Tokenizer::new(&decoded.text, decoded.lossy).run();
        Format {
            encoding: decoded.encoding,
            pairs,
            warnings,
        }
    }

    /// Writes the pairs back out as UTF-8 `.strings` text.
    pub fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        for pair in &self.pairs {
            writeln!(writer, "{}", format_pair(pair))?;
        }
        Ok(())
    }
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_decoded(DecodedText {
            text: s.to_string(),
            encoding: UTF_8,
            lossy: false,
        }))
    }
}

impl Parser for Format {
    fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::from_bytes_with_fallback(bytes, None)
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

/// Renders one pair as a `"key" = "value";` statement.
pub fn format_pair(pair: &Pair) -> String {
    format!("\"{}\" = \"{}\";", escape(&pair.key), escape(&pair.value))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':' | '/' | '-')
}

/// A statement that could not be read, and where to pick up again.
struct Skip {
    warning: ParseWarning,
    resume: usize,
}

struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    lossy: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str, lossy: bool) -> Self {
        Tokenizer {
            text,
            pos: 0,
            lossy,
        }
    }

    fn run(mut self) -> (Vec<Pair>, Vec<ParseWarning>) {
        let mut pairs = Vec::new();
        let mut warnings = Vec::new();

        loop {
            if let Err(warning) = self.skip_trivia() {
                warnings.push(warning);
                break;
            }
            if self.peek().is_none() {
                break;
            }

            let start = self.pos;
            match self.statement() {
                Ok(pair) => match self.check(&pair, start) {
                    Some(warning) => warnings.push(warning),
                    None => pairs.push(pair),
                },
                Err(skip) => {
                    warnings.push(skip.warning);
                    self.pos = if skip.resume > start {
                        skip.resume
                    } else {
                        self.line_end(start)
                    };
                }
            }
        }

        (pairs, warnings)
    }

    fn check(&self, pair: &Pair, start: usize) -> Option<ParseWarning> {
        if pair.key.is_empty() {
            return Some(ParseWarning::new(start, "empty key"));
        }
        if self.lossy && (pair.key.contains('\u{FFFD}') || pair.value.contains('\u{FFFD}')) {
            return Some(ParseWarning::new(
                start,
                format!("undecodable text in entry `{}`", pair.key),
            ));
        }
        None
    }

    fn statement(&mut self) -> Result<Pair, Skip> {
        let key = self.token()?;
        self.skip_trivia_in_statement()?;

        match self.peek() {
            Some(';') => {
                self.bump();
                Ok(Pair::new(key.clone(), key))
            }
            Some('=') => {
                self.bump();
                self.skip_trivia_in_statement()?;
                let value = self.token()?;
                self.skip_trivia_in_statement()?;
                if self.peek() == Some(';') {
                    self.bump();
                    Ok(Pair::new(key, value))
                } else {
                    Err(Skip {
                        warning: ParseWarning::new(
                            self.pos,
                            format!("missing `;` after entry `{}`", key),
                        ),
                        resume: self.pos,
                    })
                }
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.eof("`=` or `;`")),
        }
    }

    fn token(&mut self) -> Result<String, Skip> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.quoted(quote),
            Some(c) if is_bare_char(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_bare_char) {
                    self.bump();
                }
                Ok(self.text[start..self.pos].to_string())
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.eof("a string")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, Skip> {
        let open = self.pos;
        self.bump();
        let mut out = String::new();
        let mut bad: Option<ParseWarning> = None;

        loop {
            let Some(c) = self.bump() else {
                return Err(Skip {
                    warning: ParseWarning::new(open, "unterminated quoted string"),
                    resume: self.line_end(open),
                });
            };
            match c {
                c if c == quote => break,
                '\\' => {
                    let escape_at = self.pos - 1;
                    match self.escape() {
                        Ok(Some(decoded)) => out.push_str(&decoded),
                        Ok(None) => {
                            return Err(Skip {
                                warning: ParseWarning::new(open, "unterminated quoted string"),
                                resume: self.line_end(open),
                            });
                        }
                        Err(message) => {
                            bad.get_or_insert(ParseWarning::new(escape_at, message));
                        }
                    }
                }
                c => out.push(c),
            }
        }

        match bad {
            Some(warning) => Err(Skip {
                warning,
                resume: self.statement_end(self.pos),
            }),
            None => Ok(out),
        }
    }

    /// Decodes the escape sequence after a backslash. `Ok(None)` means end of input.
    fn escape(&mut self) -> Result<Option<String>, String> {
        let Some(c) = self.bump() else {
            return Ok(None);
        };
        let decoded = match c {
            'n' => "\n".to_string(),
            't' => "\t".to_string(),
            'r' => "\r".to_string(),
            '0' => "\0".to_string(),
            'U' | 'u' => {
                let high = self.hex4()?;
                if (0xD800..0xDC00).contains(&high) {
                    let rest = &self.text[self.pos..];
                    if !(rest.starts_with("\\U") || rest.starts_with("\\u")) {
                        return Err("unpaired surrogate in \\U escape".to_string());
                    }
                    self.pos += 2;
                    let low = self.hex4()?;
                    char::decode_utf16([high, low])
                        .collect::<Result<String, _>>()
                        .map_err(|_| "invalid surrogate pair in \\U escape".to_string())?
                } else {
                    char::decode_utf16([high])
                        .collect::<Result<String, _>>()
                        .map_err(|_| "unpaired surrogate in \\U escape".to_string())?
                }
            }
            other => other.to_string(),
        };
        Ok(Some(decoded))
    }

    fn hex4(&mut self) -> Result<u16, String> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| "expected four hex digits after \\U".to_string())?;
        self.pos += 4;
        u16::from_str_radix(digits, 16).map_err(|e| e.to_string())
    }

    /// Skips whitespace and comments between statements.
    fn skip_trivia(&mut self) -> Result<(), ParseWarning> {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let rest = &self.text[self.pos..];
            if rest.starts_with("//") {
                self.pos = self.line_end(self.pos);
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => {
                        let at = self.pos;
                        self.pos = self.text.len();
                        return Err(ParseWarning::new(at, "unterminated block comment"));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn skip_trivia_in_statement(&mut self) -> Result<(), Skip> {
        self.skip_trivia().map_err(|warning| Skip {
            warning,
            resume: self.text.len(),
        })
    }

    fn unexpected(&self, c: char) -> Skip {
        Skip {
            warning: ParseWarning::new(self.pos, format!("unexpected character `{}`", c)),
            resume: self.statement_end(self.pos),
        }
    }

    fn eof(&self, expected: &str) -> Skip {
        Skip {
            warning: ParseWarning::new(self.pos, format!("expected {} before end of file", expected)),
            resume: self.text.len(),
        }
    }

    /// Position just past the next `;` or newline at or after `from`.
    fn statement_end(&self, from: usize) -> usize {
        self.text[from..]
            .find([';', '\n'])
            .map_or(self.text.len(), |i| from + i + 1)
    }

    /// Position just past the next newline at or after `from`.
    fn line_end(&self, from: usize) -> usize {
        self.text[from..]
            .find('\n')
            .map_or(self.text.len(), |i| from + i + 1)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Format {
        Format::from_str(content).unwrap()
    }

    fn keys_and_values(format: &Format) -> Vec<(&str, &str)> {
        format
            .pairs
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_basic_strings_with_comment() {
        let content = r#"
        /* Greeting for the user */
        "hello" = "Hello, world!";
        "#;
        let parsed = parse(content);
        assert_eq!(keys_and_values(&parsed), vec![("hello", "Hello, world!")]);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_several_statements_on_one_line() {
        let parsed = parse(r#""a"="1";"b" = "2" ;  "c"  =  "3";"#);
        assert_eq!(
            keys_and_values(&parsed),
            vec![("a", "1"), ("b", "2"), ("c", "3")]
        );
    }

    #[test]
    fn test_escapes_are_decoded() {
        let parsed = parse(r#""q" = "Say \"hi\"\nthen\tgo \\ \U00e9";"#);
        assert_eq!(parsed.pairs[0].value, "Say \"hi\"\nthen\tgo \\ é");
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let parsed = parse(r#""emoji" = "\UD83D\UDE00";"#);
        assert_eq!(parsed.pairs[0].value, "😀");
    }

    #[test]
    fn test_unpaired_surrogate_skips_entry_only() {
        let parsed = parse("\"bad\" = \"\\UD83D\";\n\"good\" = \"ok\";");
        assert_eq!(keys_and_values(&parsed), vec![("good", "ok")]);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_multiline_value_keeps_newlines() {
        let parsed = parse("\"multi\" = \"line 1\nline 2\";");
        assert_eq!(parsed.pairs[0].value, "line 1\nline 2");
    }

    #[test]
    fn test_comments_are_ignored_everywhere() {
        let content = r#"
        // leading comment
        "a" /* between */ = /* here too */ "x"; // trailing
        /* multi
           line "fake" = "entry"; */
        "b" = "y";
        "#;
        let parsed = parse(content);
        assert_eq!(keys_and_values(&parsed), vec![("a", "x"), ("b", "y")]);
    }

    #[test]
    fn test_bare_words_and_key_only_statement() {
        let parsed = parse("NSCameraUsageDescription = \"Camera\";\n\"Done\";");
        assert_eq!(
            keys_and_values(&parsed),
            vec![("NSCameraUsageDescription", "Camera"), ("Done", "Done")]
        );
    }

    #[test]
    fn test_missing_semicolon_skips_only_that_entry() {
        let content = "\"a\" = \"1\"\n\"b\" = \"2\";\n";
        let parsed = parse(content);
        assert_eq!(keys_and_values(&parsed), vec![("b", "2")]);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].message.contains("missing `;`"));
    }

    #[test]
    fn test_unterminated_quote_is_reported_at_opening_quote() {
        let content = "\"b\" = \"2\";\n\"a\" = \"never closed;\n";
        let parsed = parse(content);
        assert_eq!(keys_and_values(&parsed), vec![("b", "2")]);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].offset, 17);
        assert_eq!(parsed.warnings[0].message, "unterminated quoted string");
    }

    #[test]
    fn test_garbage_line_is_skipped() {
        let parsed = parse("bad line without equals\n\"good\" = \"yes\";");
        assert_eq!(keys_and_values(&parsed), vec![("good", "yes")]);
        assert!(!parsed.warnings.is_empty());
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let parsed = parse(r#""" = "nothing"; "k" = "v";"#);
        assert_eq!(keys_and_values(&parsed), vec![("k", "v")]);
        assert_eq!(parsed.warnings[0].message, "empty key");
    }

    #[test]
    fn test_empty_value_is_kept() {
        let parsed = parse(r#""empty" = "";"#);
        assert_eq!(keys_and_values(&parsed), vec![("empty", "")]);
    }

    #[test]
    fn test_unicode_values() {
        let parsed = parse("\"rtl\" = \"مرحبا\";\n\"combining\" = \"e\u{301}\";");
        assert_eq!(parsed.pairs[0].value, "مرحبا");
        assert_eq!(parsed.pairs[1].value, "e\u{301}");
    }

    #[test]
    fn test_from_utf16_bytes() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "\"OK\" = \"Weiter\";".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let parsed = Format::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.encoding, encoding_rs::UTF_16LE);
        assert_eq!(keys_and_values(&parsed), vec![("OK", "Weiter")]);
    }

    #[test]
    fn test_lossy_entries_are_skipped() {
        let parsed = Format::from_bytes(b"\"a\" = \"\xFF\";\n\"b\" = \"fine\";").unwrap();
        assert_eq!(keys_and_values(&parsed), vec![("b", "fine")]);
        assert!(parsed.warnings[0].message.contains("undecodable"));
    }

    #[test]
    fn test_round_trip_serialization() {
        let content = "\"bye\" = \"Good\\\"bye\\\"\\n!\";\n\"tab\" = \"a\\tb\";";
        let parsed = parse(content);
        let mut output = Vec::new();
        parsed.to_writer(&mut output).unwrap();
        let reparsed = parse(&String::from_utf8(output).unwrap());
        assert_eq!(parsed.pairs, reparsed.pairs);
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Localizable.strings");
        std::fs::write(&path, "\"OK\" = \"Weiter\";").unwrap();
        let parsed = Format::read_from(&path).unwrap();
        assert_eq!(keys_and_values(&parsed), vec![("OK", "Weiter")]);

        assert!(matches!(
            Format::read_from(dir.path().join("absent.strings")),
            Err(Error::Io(_))
        ));
    }
}
