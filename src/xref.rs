//! Cross-reference tables.
//!
//! Maps object numbers to where their bodies live: a byte offset for plain
//! objects, or a slot in an object stream for compressed ones. Both classic
//! `xref` tables and cross-reference streams are read, and `/Prev` chains
//! from incremental updates are merged newest-first.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{decode_with_dict, Object, PdfDict};
use crate::parser::{parse_indirect_object, parse_object};
use crate::parser_config::ParserOptions;
use std::collections::{BTreeMap, HashSet};

/// Where one object number points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free (deleted) object
    Free {
        /// Generation to use if the number is reused
        gen: u16,
    },
    /// Object body written at a byte offset
    InUse {
        /// Byte offset of the `N G obj` header
        offset: u64,
        /// Generation number
        gen: u16,
    },
    /// Object stored in an object stream
    Compressed {
        /// Object number of the containing object stream
        stream: u32,
        /// Index inside the object stream
        index: u32,
    },
}

/// Cross-reference table plus the trailer dictionary that came with it.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: PdfDict,
}

impl CrossRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `id`, if any.
    pub fn get(&self, id: u32) -> Option<&XRefEntry> {
        self.entries.get(&id)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, id: u32, entry: XRefEntry) {
        self.entries.insert(id, entry);
    }

    /// Trailer dictionary.
    pub fn trailer(&self) -> &PdfDict {
        &self.trailer
    }

    /// Replace the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: PdfDict) {
        self.trailer = trailer;
    }

    /// Number of entries, free ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Fold in a table from an earlier revision. Entries and trailer keys
    /// already present here win.
    pub fn merge_older(&mut self, older: CrossRefTable) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
        for (key, value) in older.trailer {
            if key != "Prev" && key != "XRefStm" {
                self.trailer.entry(key).or_insert(value);
            }
        }
    }
}

/// Offset named by the last `startxref` in the file.
pub fn find_startxref(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(4096);
    let tail = &data[tail_start..];
    let pos = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or(Error::InvalidXref)?;

    match token(&tail[pos + b"startxref".len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as u64),
        _ => Err(Error::InvalidXref),
    }
}

/// Read the table at `offset` and every older section reachable via `/Prev`.
pub fn parse_xref_chain(data: &[u8], offset: u64, options: &ParserOptions) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    let mut next = Some(offset);
    let mut merged: Option<CrossRefTable> = None;

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            log::warn!("xref /Prev chain loops back to offset {}", offset);
            break;
        }
        if visited.len() as u32 > options.max_recursion_depth {
            return Err(Error::RecursionLimitExceeded(options.max_recursion_depth));
        }

        let section = parse_section(data, offset, options)?;
        next = section
            .trailer
            .get("Prev")
            .and_then(Object::as_integer)
            .and_then(|prev| u64::try_from(prev).ok());

        match merged.as_mut() {
            Some(table) => table.merge_older(section),
            None => merged = Some(section),
        }
    }

    merged.ok_or(Error::InvalidXref)
}

/// One section: a classic table (with its optional `/XRefStm`) or an xref stream.
fn parse_section(data: &[u8], offset: u64, options: &ParserOptions) -> Result<CrossRefTable> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start < data.len())
        .ok_or(Error::InvalidXref)?;
    let input = &data[start..];

    match token(input) {
        Ok((rest, kw)) if kw.is_keyword(b"xref") => {
            log::debug!("Classic xref table at offset {}", offset);
            let mut table = parse_classic_table(rest, offset)?;
            if let Some(stream_offset) = table.trailer.get("XRefStm").and_then(Object::as_integer) {
                match parse_xref_stream(data, stream_offset as u64, options) {
                    Ok(hidden) => {
                        for (id, entry) in hidden.entries {
                            let visible = matches!(table.entries.get(&id), Some(XRefEntry::InUse { .. }));
                            if !visible {
                                table.entries.insert(id, entry);
                            }
                        }
                    },
                    Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stream_offset, e),
                }
            }
            Ok(table)
        },
        Ok((_, Token::Integer(_))) => {
            log::debug!("Cross-reference stream at offset {}", offset);
            parse_xref_stream(data, offset, options)
        },
        _ => Err(Error::InvalidXref),
    }
}

/// Subsections of `start count` followed by `offset gen n|f` triples, then `trailer <<...>>`.
fn parse_classic_table(mut input: &[u8], offset: u64) -> Result<CrossRefTable> {
    let bad = |reason: &str| Error::ParseError {
        offset: offset as usize,
        reason: format!("xref table: {}", reason),
    };
    let mut table = CrossRefTable::new();

    loop {
        let (rest, tok) = token(input).map_err(|_| bad("unexpected end of table"))?;
        match tok {
            Token::Keyword(b"trailer") => {
                let (_, trailer) = parse_object(rest).map_err(|_| bad("unreadable trailer"))?;
                match trailer {
                    Object::Dictionary(dict) => table.trailer = dict,
                    _ => return Err(bad("trailer is not a dictionary")),
                }
                return Ok(table);
            },
            Token::Integer(first) => {
                let (rest, count) = match token(rest) {
                    Ok((rest, Token::Integer(count))) if count >= 0 => (rest, count),
                    _ => return Err(bad("missing subsection count")),
                };
                input = rest;
                for i in 0..count {
                    let (rest, entry) = parse_classic_entry(input).ok_or_else(|| bad("malformed entry"))?;
                    input = rest;
                    let id = u32::try_from(first + i).map_err(|_| bad("object number out of range"))?;
                    table.entries.insert(id, entry);
                }
            },
            _ => return Err(bad("expected subsection header or 'trailer'")),
        }
    }
}

fn parse_classic_entry(input: &[u8]) -> Option<(&[u8], XRefEntry)> {
    let (rest, offset) = match token(input).ok()? {
        (rest, Token::Integer(n)) => (rest, n),
        _ => return None,
    };
    let (rest, gen) = match token(rest).ok()? {
        (rest, Token::Integer(n)) => (rest, n),
        _ => return None,
    };
    let (rest, kind) = token(rest).ok()?;
    let gen = u16::try_from(gen).unwrap_or(u16::MAX);
    let entry = if kind.is_keyword(b"n") {
        XRefEntry::InUse {
            offset: u64::try_from(offset).ok()?,
            gen,
        }
    } else if kind.is_keyword(b"f") {
        XRefEntry::Free { gen }
    } else {
        return None;
    };
    Some((rest, entry))
}

/// Cross-reference stream (`/Type /XRef`). Its dictionary doubles as the trailer.
fn parse_xref_stream(data: &[u8], offset: u64, options: &ParserOptions) -> Result<CrossRefTable> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start < data.len())
        .ok_or(Error::InvalidXref)?;
    let (_, (_, object)) = parse_indirect_object(&data[start..]).map_err(|_| Error::ParseError {
        offset: start,
        reason: "unreadable cross-reference stream".to_string(),
    })?;

    let (dict, raw) = match object {
        Object::Stream { dict, data } => (dict, data),
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    if dict.get("Type").and_then(Object::as_name) != Some("XRef") {
        return Err(Error::InvalidPdf(format!("object at {} is not an xref stream", offset)));
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|w| w.iter().filter_map(Object::as_integer).map(|n| n.max(0) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(Error::InvalidPdf("invalid /W in xref stream".to_string()));
    }

    let size = dict.get("Size").and_then(Object::as_integer).unwrap_or(0);
    let index: Vec<i64> = match dict.get("Index").and_then(Object::as_array) {
        Some(arr) => arr.iter().filter_map(Object::as_integer).collect(),
        None => vec![0, size],
    };

    let decoded = decode_with_dict(&dict, &raw, options)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(Error::InvalidPdf("xref stream /W sums to zero".to_string()));
    }

    let mut table = CrossRefTable::new();
    let mut rows = decoded.chunks_exact(row_len);
    for pair in index.chunks(2) {
        let (first, count) = match pair {
            [first, count] => (*first, *count),
            _ => break,
        };
        for i in 0..count.max(0) {
            let row = match rows.next() {
                Some(row) => row,
                None => {
                    log::warn!("xref stream at {} ends early", offset);
                    break;
                },
            };
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_be(f1) };
            let entry = match kind {
                0 => XRefEntry::Free { gen: read_be(f3) as u16 },
                1 => XRefEntry::InUse {
                    offset: read_be(f2),
                    gen: read_be(f3) as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: read_be(f2) as u32,
                    index: read_be(f3) as u32,
                },
                other => {
                    log::debug!("Skipping xref stream entry of unknown type {}", other);
                    continue;
                },
            };
            if let Ok(id) = u32::try_from(first + i) {
                table.entries.insert(id, entry);
            }
        }
    }

    table.trailer = dict;
    Ok(table)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
