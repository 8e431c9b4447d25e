//! Support for binary property lists (`bplist00`).
//!
//! Layout: an 8-byte magic header, the object table, an offset table, and a
//! fixed 32-byte trailer:
//!
//! | trailer bytes | meaning                           |
//! |---------------|-----------------------------------|
//! | 0..6          | unused / sort version             |
//! | 6             | size of each offset-table entry   |
//! | 7             | size of each object reference     |
//! | 8..16         | number of objects (BE u64)        |
//! | 16..24        | index of the root object          |
//! | 24..32        | byte offset of the offset table   |
//!
//! The root must be a dictionary. Only its string-to-string entries are
//! materialized; anything else is skipped with a warning.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    error::ParseError,
    traits::Parser,
    types::{CollectionKind, Pair, ParseWarning, PlistValue},
};

pub const MAGIC: &[u8] = b"bplist";
const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub pairs: Vec<Pair>,
    pub warnings: Vec<ParseWarning>,
}

impl Parser for Format {
    fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let table = ObjectTable::new(bytes)?;
        let (pairs, warnings) = table.root_entries()?;
        Ok(Format { pairs, warnings })
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

struct ObjectTable<'a> {
    bytes: &'a [u8],
    offset_size: usize,
    ref_size: usize,
    num_objects: u64,
    root: u64,
    table_offset: usize,
    /// Start of the trailer; no object may extend past it.
    limit: usize,
}

impl<'a> ObjectTable<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        if !bytes.starts_with(MAGIC) {
            return Err(ParseError::new(0, "missing bplist header"));
        }
        if bytes.len() < HEADER_LEN + TRAILER_LEN {
            return Err(ParseError::new(bytes.len(), "truncated trailer"));
        }

        let limit = bytes.len() - TRAILER_LEN;
        let trailer = &bytes[limit..];
        let offset_size = trailer[6] as usize;
        let ref_size = trailer[7] as usize;
        let num_objects = BigEndian::read_u64(&trailer[8..16]);
        let root = BigEndian::read_u64(&trailer[16..24]);
        let table_offset = BigEndian::read_u64(&trailer[24..32]);

        if !(1..=8).contains(&offset_size) || !(1..=8).contains(&ref_size) {
            return Err(ParseError::new(
                limit + 6,
                format!("invalid trailer sizes (offset {}, ref {})", offset_size, ref_size),
            ));
        }
        if root >= num_objects {
            return Err(ParseError::new(
                limit + 16,
                format!("root object {} out of range ({} objects)", root, num_objects),
            ));
        }

        let table_end = usize::try_from(num_objects)
            .ok()
            .and_then(|n| n.checked_mul(offset_size))
            .zip(usize::try_from(table_offset).ok())
            .and_then(|(len, start)| start.checked_add(len));
        let table_offset = match table_end {
            Some(end) if end <= limit && table_offset as usize >= HEADER_LEN => {
                table_offset as usize
            }
            _ => {
                return Err(ParseError::new(
                    limit + 24,
                    format!("offset table at {} does not fit in the file", table_offset),
                ));
            }
        };

        Ok(ObjectTable {
            bytes,
            offset_size,
            ref_size,
            num_objects,
            root,
            table_offset,
            limit,
        })
    }

    fn root_entries(&self) -> Result<(Vec<Pair>, Vec<ParseWarning>), ParseError> {
        let root_at = self.object_offset(self.root)?;
        let marker = self.bytes[root_at];
        if marker >> 4 != 0xD {
            return Err(ParseError::new(
                root_at,
                format!("root object has marker {:#04x}, expected a dictionary", marker),
            ));
        }

        let (len, refs_at) = self.length(root_at)?;
        let refs = self.slice(refs_at, len.checked_mul(2 * self.ref_size), root_at)?;
        let (key_refs, value_refs) = refs.split_at(len * self.ref_size);

        let mut pairs = Vec::with_capacity(len);
        let mut warnings = Vec::new();
        for i in 0..len {
            let span = i * self.ref_size..(i + 1) * self.ref_size;
            let key_ref = BigEndian::read_uint(&key_refs[span.clone()], self.ref_size);
            let value_ref = BigEndian::read_uint(&value_refs[span], self.ref_size);

            let key = match self.object(key_ref) {
                Ok(PlistValue::String(key)) if !key.is_empty() => key,
                Ok(PlistValue::String(_)) => {
                    warnings.push(ParseWarning::new(root_at, "empty key"));
                    continue;
                }
                Ok(other) => {
                    warnings.push(ParseWarning::new(
                        root_at,
                        format!("dictionary key is a {}", other.describe()),
                    ));
                    continue;
                }
                Err(err) => {
                    warnings.push(ParseWarning::new(err.offset, err.message));
                    continue;
                }
            };

            match self.object(value_ref) {
                Ok(PlistValue::String(value)) => pairs.push(Pair { key, value }),
                Ok(other) => warnings.push(ParseWarning::new(
                    root_at,
                    format!("skipping `{}`: {}", key, other.describe()),
                )),
                Err(err) => warnings.push(ParseWarning::new(
                    err.offset,
                    format!("skipping `{}`: {}", key, err.message),
                )),
            }
        }

        Ok((pairs, warnings))
    }

    /// Decodes one object far enough to tell whether it is a string.
    fn object(&self, index: u64) -> Result<PlistValue, ParseError> {
        let at = self.object_offset(index)?;
        let marker = self.bytes[at];
        let value = match marker >> 4 {
            0x0 => match marker {
                0x08 | 0x09 => PlistValue::Unsupported("boolean"),
                _ => PlistValue::Unsupported("null"),
            },
            0x1 => PlistValue::Unsupported("integer"),
            0x2 => PlistValue::Unsupported("real"),
            0x3 => PlistValue::Unsupported("date"),
            0x4 => PlistValue::Unsupported("data"),
            0x5 => {
                let (len, start) = self.length(at)?;
                let raw = self.slice(start, Some(len), at)?;
                PlistValue::String(raw.iter().map(|&b| b as char).collect())
            }
            0x6 => {
                let (len, start) = self.length(at)?;
                let raw = self.slice(start, len.checked_mul(2), at)?;
                let units = raw.chunks_exact(2).map(BigEndian::read_u16);
                let text = char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|_| ParseError::new(at, "invalid UTF-16 string"))?;
                PlistValue::String(text)
            }
            0x7 => {
                let (len, start) = self.length(at)?;
                let raw = self.slice(start, Some(len), at)?;
                let text = std::str::from_utf8(raw)
                    .map_err(|_| ParseError::new(at, "invalid UTF-8 string"))?;
                PlistValue::String(text.to_string())
            }
            0x8 => PlistValue::Unsupported("uid"),
            0xA => PlistValue::Collection(CollectionKind::Array),
            0xC => PlistValue::Collection(CollectionKind::Set),
            0xD => PlistValue::Collection(CollectionKind::Dictionary),
            _ => PlistValue::Unsupported("unknown"),
        };
        Ok(value)
    }

    fn object_offset(&self, index: u64) -> Result<usize, ParseError> {
        if index >= self.num_objects {
            return Err(ParseError::new(
                self.table_offset,
                format!("object reference {} out of range", index),
            ));
        }
        let entry = self.table_offset + index as usize * self.offset_size;
        let offset = BigEndian::read_uint(
            &self.bytes[entry..entry + self.offset_size],
            self.offset_size,
        );
        match usize::try_from(offset) {
            Ok(offset) if (HEADER_LEN..self.limit).contains(&offset) => Ok(offset),
            _ => Err(ParseError::new(
                entry,
                format!("object offset {} outside the object table", offset),
            )),
        }
    }

    /// Returns the element count encoded in the marker at `at` and where the
    /// payload begins. A low nibble of 0xF means an integer object follows.
    fn length(&self, at: usize) -> Result<(usize, usize), ParseError> {
        let nibble = (self.bytes[at] & 0x0F) as usize;
        if nibble != 0x0F {
            return Ok((nibble, at + 1));
        }

        let int_marker = *self
            .bytes
            .get(at + 1)
            .filter(|_| at + 1 < self.limit)
            .ok_or_else(|| ParseError::new(at + 1, "truncated length"))?;
        if int_marker >> 4 != 0x1 {
            return Err(ParseError::new(at + 1, "length is not an integer object"));
        }
        let width = 1usize << (int_marker & 0x0F);
        if width > 8 {
            return Err(ParseError::new(at + 1, "length integer too wide"));
        }
        let raw = self.slice(at + 2, Some(width), at)?;
        let len = usize::try_from(BigEndian::read_uint(raw, width))
            .map_err(|_| ParseError::new(at + 2, "length overflows"))?;
        Ok((len, at + 2 + width))
    }

    /// Bounds-checked view of `len` bytes starting at `start`.
    fn slice(&self, start: usize, len: Option<usize>, object: usize) -> Result<&'a [u8], ParseError> {
        len.and_then(|len| start.checked_add(len))
            .filter(|&end| end <= self.limit)
            .map(|end| &self.bytes[start..end])
            .ok_or_else(|| ParseError::new(object, "object runs past the end of the object table"))
    }
}
