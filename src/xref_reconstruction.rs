//! Object-header scanning.
//!
//! Used when the cross-reference table is missing or unusable, and to find
//! objects whose xref offsets have gone stale after an in-place edit that
//! changed the file length.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, PdfDict};
use crate::objstm::ObjectStream;
use crate::parser::{parse_indirect_header, parse_indirect_object, parse_object};
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_OBJ_HEADER: Regex =
        Regex::new(r"(?-u)(\d+)\s+(\d+)\s+obj\b").expect("object header pattern is valid");
    static ref RE_TRAILER: Regex = Regex::new(r"(?-u)trailer\s*<<").expect("trailer pattern is valid");
}

/// Every plausible `N G obj` header in `data`, as `(reference, offset)`.
///
/// A match must not be glued to a preceding regular character and must be
/// followed by something that can start an object.
pub fn scan_object_headers(data: &[u8]) -> Vec<(ObjectRef, usize)> {
    let mut found = Vec::new();
    for caps in RE_OBJ_HEADER.captures_iter(data) {
        let (whole, id, gen) = match (caps.get(0), caps.get(1), caps.get(2)) {
            (Some(whole), Some(id), Some(gen)) => (whole, id, gen),
            _ => continue,
        };
        let start = whole.start();
        if start > 0 && crate::lexer::is_regular(data[start - 1]) {
            continue;
        }
        let next = data[whole.end()..]
            .iter()
            .find(|&&b| !crate::utility::is_pdf_whitespace(b))
            .copied();
        let starts_object = matches!(
            next,
            Some(b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.' | b'0'..=b'9')
        );
        if !starts_object {
            log::debug!("Skipping false object header at offset {}", start);
            continue;
        }

        let parsed = std::str::from_utf8(id.as_bytes())
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .zip(std::str::from_utf8(gen.as_bytes()).ok().and_then(|s| s.parse::<u16>().ok()));
        if let Some((id, gen)) = parsed {
            found.push((ObjectRef::new(id, gen), start));
        }
    }
    found
}

/// Offset of the last header for `reference`, if the file has one.
pub fn find_object_header(data: &[u8], reference: ObjectRef) -> Option<usize> {
    scan_object_headers(data)
        .into_iter()
        .filter(|(found, _)| *found == reference)
        .map(|(_, offset)| offset)
        .last()
}

/// The object header starting at `offset`, if one is there.
pub fn header_at(data: &[u8], offset: usize) -> Option<ObjectRef> {
    let input = data.get(offset..)?;
    parse_indirect_header(input).ok().map(|(_, reference)| reference)
}

/// Rebuild a cross-reference table by scanning the whole file.
///
/// Later definitions of an object win, as they would in an incremental
/// update. Objects inside object streams are added when no plain
/// definition exists. The trailer is the last `trailer` dictionary in the
/// file; if it has no `/Root`, the first `/Type /Catalog` object is used.
pub fn reconstruct_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Reconstructing cross-reference table by scanning {} bytes", data.len());

    let mut table = CrossRefTable::new();
    for (reference, offset) in scan_object_headers(data) {
        table.insert(
            reference.id,
            XRefEntry::InUse {
                offset: offset as u64,
                gen: reference.gen,
            },
        );
    }
    if table.is_empty() {
        return Err(Error::InvalidPdf("no objects found while scanning file".to_string()));
    }

    let plain: Vec<(u32, u64)> = table
        .iter()
        .filter_map(|(id, entry)| match entry {
            XRefEntry::InUse { offset, .. } => Some((id, *offset)),
            _ => None,
        })
        .collect();

    let mut catalog = None;
    for (id, offset) in plain {
        let body = match data.get(offset as usize..) {
            Some(body) => body,
            None => continue,
        };
        let object = match parse_indirect_object(body) {
            Ok((_, (_, object))) => object,
            Err(_) => continue,
        };
        let dict = match object.as_dict() {
            Some(dict) => dict,
            None => continue,
        };
        match dict.get("Type").and_then(Object::as_name) {
            Some("Catalog") if catalog.is_none() => {
                if let Some(XRefEntry::InUse { gen, .. }) = table.get(id) {
                    catalog = Some(ObjectRef::new(id, *gen));
                }
            },
            Some("ObjStm") => add_object_stream_entries(&mut table, id, &object, options),
            _ => {},
        }
    }

    let mut trailer = last_trailer(data).unwrap_or_default();
    if !trailer.contains_key("Root") {
        let root = catalog.ok_or_else(|| Error::InvalidPdf("no catalog found while scanning file".to_string()))?;
        log::info!("Using scanned catalog {} as /Root", root);
        trailer.insert("Root".to_string(), Object::Reference(root));
    }
    trailer.shift_remove("Prev");
    trailer.shift_remove("XRefStm");
    table.set_trailer(trailer);

    log::info!("Reconstructed cross-reference table with {} objects", table.len());
    Ok(table)
}

fn add_object_stream_entries(table: &mut CrossRefTable, stream_id: u32, stream: &Object, options: &ParserOptions) {
    let parsed = match ObjectStream::parse(stream, options) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Skipping unreadable object stream {}: {}", stream_id, e);
            return;
        },
    };
    let ids: Vec<u32> = parsed.object_numbers().collect();
    for (index, id) in ids.into_iter().enumerate() {
        if table.get(id).is_none() {
            table.insert(
                id,
                XRefEntry::Compressed {
                    stream: stream_id,
                    index: index as u32,
                },
            );
        }
    }
}

fn last_trailer(data: &[u8]) -> Option<PdfDict> {
    let found = RE_TRAILER.find_iter(data).last()?;
    // Start at the "<<" that ends the match.
    let dict_start = found.end() - 2;
    match parse_object(&data[dict_start..]) {
        Ok((_, Object::Dictionary(dict))) => Some(dict),
        _ => {
            log::warn!("Unreadable trailer dictionary at offset {}", found.start());
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n(text 3 0 objection)\n";

    #[test]
    fn test_scan_headers() {
        let headers = scan_object_headers(BODY);
        let ids: Vec<u32> = headers.iter().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(headers[0].1, 9);
    }

    #[test]
    fn test_glued_digits_rejected() {
        assert!(scan_object_headers(b"x12 0 obj <<>>").is_empty());
    }

    #[test]
    fn test_header_at() {
        assert_eq!(header_at(BODY, 9), Some(ObjectRef::new(1, 0)));
        assert_eq!(header_at(BODY, 10), None);
    }

    #[test]
    fn test_find_last_definition() {
        let data = b"4 0 obj (old) endobj\n4 0 obj (new) endobj\n";
        assert_eq!(find_object_header(data, ObjectRef::new(4, 0)), Some(21));
        assert_eq!(find_object_header(data, ObjectRef::new(5, 0)), None);
    }

    #[test]
    fn test_reconstruct_finds_catalog_without_trailer() {
        let table = reconstruct_xref(BODY, &ParserOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.trailer().get("Root"),
            Some(&Object::Reference(ObjectRef::new(1, 0)))
        );
    }

    #[test]
    fn test_reconstruct_prefers_trailer() {
        let mut data = BODY.to_vec();
        data.extend_from_slice(b"trailer\n<< /Root 2 0 R /Size 3 >>\n");
        let table = reconstruct_xref(&data, &ParserOptions::default()).unwrap();
        assert_eq!(
            table.trailer().get("Root"),
            Some(&Object::Reference(ObjectRef::new(2, 0)))
        );
    }

    #[test]
    fn test_reconstruct_empty_fails() {
        assert!(reconstruct_xref(b"%PDF-1.4\nnothing here", &ParserOptions::default()).is_err());
    }
}
