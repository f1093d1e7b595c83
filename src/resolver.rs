//! Primitive resolution over a raw document buffer.
//!
//! [`PrimitiveResolver`] is the seam between the byte-level parser and the
//! lazy object graph: it hands back primitive [`Object`]s, either for an
//! indirect `(number, generation)` pair or for a piece of object text.
//! [`BufferResolver`] is the implementation used by
//! [`crate::document::PdfDocument`].

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, PdfDict};
use crate::objstm::ObjectStream;
use crate::parser::{parse_complete, parse_indirect_object};
use crate::parser_config::ParserOptions;
use crate::xref::{find_startxref, parse_xref_chain, CrossRefTable, XRefEntry};
use crate::xref_reconstruction::{find_object_header, header_at, reconstruct_xref};
use bytes::Bytes;
use std::collections::HashMap;

/// Where an indirect object is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Written directly in the file body at this byte offset
    Offset(u64),
    /// Stored inside an object stream
    InObjectStream {
        /// Object number of the object stream
        stream: u32,
        /// Index inside the object stream
        index: u32,
    },
}

/// Source of primitive values for the object graph.
pub trait PrimitiveResolver {
    /// Primitive value of an indirect object, `None` when it is free or missing.
    fn resolve_indirect(&mut self, reference: ObjectRef) -> Result<Option<Object>>;

    /// Parse one object written as text, e.g. `<< /V (x) >>`.
    fn resolve_representation(&self, text: &[u8]) -> Result<Object>;

    /// The trailer dictionary.
    fn trailer(&self) -> &PdfDict;

    /// Where `reference` lives, according to the cross-reference data.
    fn location(&self, reference: ObjectRef) -> Option<ObjectLocation>;

    /// Options the resolver parses with.
    fn options(&self) -> &ParserOptions;
}

/// [`PrimitiveResolver`] over an immutable snapshot of a document's bytes.
pub struct BufferResolver {
    data: Bytes,
    version: String,
    xref: CrossRefTable,
    options: ParserOptions,
    object_streams: HashMap<u32, ObjectStream>,
}

impl std::fmt::Debug for BufferResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferResolver")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("objects", &self.xref.len())
            .finish()
    }
}

impl BufferResolver {
    /// Check the header, then load cross-reference data.
    ///
    /// Without strict parsing a broken or empty cross-reference table (or one
    /// whose trailer has no `/Root`) is replaced by scanning for object headers.
    pub fn new(data: Bytes, options: ParserOptions) -> Result<Self> {
        let version = parse_header(&data)?;

        let xref = match load_xref(&data, &options) {
            Ok(xref) if !xref.is_empty() && xref.trailer().contains_key("Root") => xref,
            Ok(_) if options.strict => {
                return Err(Error::InvalidPdf("trailer has no /Root".to_string()));
            },
            Err(e) if options.strict => return Err(e),
            Ok(_) => {
                log::warn!("Cross-reference data is incomplete, scanning file instead");
                reconstruct_xref(&data, &options)?
            },
            Err(e) => {
                log::warn!("Cross-reference data unusable ({}), scanning file instead", e);
                reconstruct_xref(&data, &options)?
            },
        };

        log::debug!("PDF {} with {} cross-reference entries", version, xref.len());
        Ok(Self {
            data,
            version,
            xref,
            options,
            object_streams: HashMap::new(),
        })
    }

    /// Version from the `%PDF-x.y` header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The cross-reference table in use.
    pub fn xref(&self) -> &CrossRefTable {
        &self.xref
    }

    /// The snapshot this resolver reads from.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn load_at_offset(&self, reference: ObjectRef, offset: u64) -> Result<Option<Object>> {
        let offset = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
        let start = match header_at(&self.data, offset) {
            Some(found) if found.id == reference.id => offset,
            _ if self.options.strict => {
                return Err(Error::ParseError {
                    offset,
                    reason: format!("no header for {} at its cross-reference offset", reference),
                });
            },
            _ => match find_object_header(&self.data, reference) {
                Some(found) => {
                    log::warn!("Stale offset {} for {}, found header at {}", offset, reference, found);
                    found
                },
                None => {
                    log::warn!("Object {} not found at offset {} or by scanning", reference, offset);
                    return Ok(None);
                },
            },
        };

        let (_, (_, object)) = parse_indirect_object(&self.data[start..]).map_err(|_| Error::ParseError {
            offset: start,
            reason: format!("unreadable body for {}", reference),
        })?;
        Ok(Some(object))
    }

    fn load_from_stream(&mut self, reference: ObjectRef, stream_id: u32, index: u32) -> Result<Option<Object>> {
        if !self.object_streams.contains_key(&stream_id) {
            let stream_ref = ObjectRef::new(stream_id, 0);
            let stream = match self.xref.get(stream_id) {
                Some(XRefEntry::InUse { offset, .. }) => self.load_at_offset(stream_ref, *offset)?,
                _ => None,
            }
            .ok_or(Error::ObjectNotFound(stream_id, 0))?;
            let parsed = ObjectStream::parse(&stream, &self.options)?;
            log::debug!("Loaded object stream {} with {} objects", stream_id, parsed.len());
            self.object_streams.insert(stream_id, parsed);
        }

        let stream = self
            .object_streams
            .get(&stream_id)
            .ok_or(Error::ObjectNotFound(stream_id, 0))?;
        match stream.get(index as usize) {
            Ok((id, object)) if id == reference.id => Ok(Some(object)),
            _ => stream.find(reference.id),
        }
    }
}

impl PrimitiveResolver for BufferResolver {
    fn resolve_indirect(&mut self, reference: ObjectRef) -> Result<Option<Object>> {
        let entry = self.xref.get(reference.id).copied();
        log::debug!("Resolving {} ({:?})", reference, entry);
        match entry {
            Some(XRefEntry::InUse { offset, gen }) => {
                if gen != reference.gen {
                    log::debug!("{} requested but xref has generation {}", reference, gen);
                    return Ok(None);
                }
                self.load_at_offset(reference, offset)
            },
            Some(XRefEntry::Compressed { stream, index }) => {
                if reference.gen != 0 {
                    return Ok(None);
                }
                self.load_from_stream(reference, stream, index)
            },
            Some(XRefEntry::Free { .. }) => Ok(None),
            None if self.options.strict => Ok(None),
            None => match find_object_header(&self.data, reference) {
                Some(offset) => {
                    log::warn!("{} missing from cross-reference table, found by scanning", reference);
                    self.load_at_offset(reference, offset as u64)
                },
                None => Ok(None),
            },
        }
    }

    fn resolve_representation(&self, text: &[u8]) -> Result<Object> {
        parse_complete(text)
    }

    fn trailer(&self) -> &PdfDict {
        self.xref.trailer()
    }

    fn location(&self, reference: ObjectRef) -> Option<ObjectLocation> {
        match self.xref.get(reference.id)? {
            XRefEntry::InUse { offset, gen } if *gen == reference.gen => Some(ObjectLocation::Offset(*offset)),
            XRefEntry::Compressed { stream, index } if reference.gen == 0 => Some(ObjectLocation::InObjectStream {
                stream: *stream,
                index: *index,
            }),
            _ => None,
        }
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }
}

/// Version string from a `%PDF-x.y` header in the first kilobyte.
pub fn parse_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidHeader(String::from_utf8_lossy(&window[..window.len().min(8)]).into_owned()))?;
    let version: String = window[pos + 5..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();
    if version.is_empty() {
        return Err(Error::InvalidHeader(
            String::from_utf8_lossy(&window[pos..window.len().min(pos + 8)]).into_owned(),
        ));
    }
    if pos > 0 {
        log::warn!("PDF header found at offset {} instead of 0", pos);
    }
    Ok(version)
}

fn load_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    let offset = find_startxref(data)?;
    parse_xref_chain(data, offset, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(objects: &[&str], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(format!("trailer\n{}\nstartxref\n{}\n%%EOF\n", trailer, xref_at).as_bytes());
        out
    }

    #[test]
    fn test_header_version() {
        assert_eq!(parse_header(b"%PDF-1.7\n").unwrap(), "1.7");
        assert!(matches!(parse_header(b"hello"), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_resolve_indirect() {
        let data = build(&["<< /Type /Catalog >>", "(two)"], "<< /Size 3 /Root 1 0 R >>");
        let mut resolver = BufferResolver::new(Bytes::from(data), ParserOptions::default()).unwrap();
        assert_eq!(resolver.version(), "1.4");
        assert_eq!(
            resolver.resolve_indirect(ObjectRef::new(2, 0)).unwrap(),
            Some(Object::String(b"two".to_vec()))
        );
        assert_eq!(resolver.resolve_indirect(ObjectRef::new(2, 5)).unwrap(), None);
        assert_eq!(resolver.resolve_indirect(ObjectRef::new(9, 0)).unwrap(), None);
        assert!(matches!(resolver.location(ObjectRef::new(1, 0)), Some(ObjectLocation::Offset(9))));
    }

    #[test]
    fn test_stale_offset_recovered_by_scan() {
        let data = build(&["<< /Type /Catalog >>", "(two)"], "<< /Size 3 /Root 1 0 R >>");
        let real = data.windows(7).position(|w| w == b"2 0 obj").unwrap();
        let text = String::from_utf8(data).unwrap().replace(
            &format!("{:010} 00000 n", real),
            &format!("{:010} 00000 n", real - 3),
        );
        let mut resolver = BufferResolver::new(Bytes::from(text.into_bytes()), ParserOptions::default()).unwrap();
        assert_eq!(
            resolver.resolve_indirect(ObjectRef::new(2, 0)).unwrap(),
            Some(Object::String(b"two".to_vec()))
        );
    }

    #[test]
    fn test_missing_xref_reconstructed() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
        let mut resolver = BufferResolver::new(Bytes::from(data), ParserOptions::default()).unwrap();
        assert!(resolver.trailer().contains_key("Root"));
        assert!(resolver.resolve_indirect(ObjectRef::new(1, 0)).unwrap().is_some());
    }

    #[test]
    fn test_missing_xref_strict_fails() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
        assert!(BufferResolver::new(Bytes::from(data), ParserOptions::strict()).is_err());
    }

    #[test]
    fn test_resolve_representation() {
        let data = build(&["<< /Type /Catalog >>"], "<< /Size 2 /Root 1 0 R >>");
        let resolver = BufferResolver::new(Bytes::from(data), ParserOptions::default()).unwrap();
        assert_eq!(resolver.resolve_representation(b"/Yes").unwrap(), Object::Name("Yes".into()));
    }
}
