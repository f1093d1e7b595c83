//! Object streams (`/Type /ObjStm`).
//!
//! The decoded stream starts with `/N` pairs of `object-number offset`,
//! offsets relative to `/First`, followed by the object bodies themselves.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{decode_with_dict, Object};
use crate::parser::parse_object;
use crate::parser_config::ParserOptions;

/// A decoded object stream, objects parsed on request.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    /// `(object number, absolute offset into data)` in stream order
    slots: Vec<(u32, usize)>,
    data: Vec<u8>,
}

impl ObjectStream {
    /// Decode `stream` and read its offset table.
    pub fn parse(stream: &Object, options: &ParserOptions) -> Result<Self> {
        let (dict, raw) = match stream {
            Object::Stream { dict, data } => (dict, data),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };
        if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
            if kind != "ObjStm" {
                return Err(Error::InvalidPdf(format!("expected /Type /ObjStm, got /{}", kind)));
            }
        }

        let count = dict
            .get("N")
            .and_then(Object::as_integer)
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| Error::InvalidPdf("object stream has no valid /N".to_string()))?
            as usize;
        let first = dict
            .get("First")
            .and_then(Object::as_integer)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::InvalidPdf("object stream has no valid /First".to_string()))?;

        let data = decode_with_dict(dict, raw, options)?;
        if data.len() < first {
            return Err(Error::InvalidPdf(format!(
                "object stream data is {} bytes, /First is {}",
                data.len(),
                first
            )));
        }

        let mut slots = Vec::with_capacity(count);
        let mut header = &data[..first];
        for _ in 0..count {
            let (rest, id) = match token(header) {
                Ok((rest, Token::Integer(id))) => (rest, id),
                _ => break,
            };
            let (rest, offset) = match token(rest) {
                Ok((rest, Token::Integer(offset))) => (rest, offset),
                _ => break,
            };
            header = rest;
            if let (Ok(id), Ok(offset)) = (u32::try_from(id), usize::try_from(offset)) {
                slots.push((id, first + offset));
            }
        }
        if slots.len() < count {
            log::warn!("Object stream declares {} objects, header lists {}", count, slots.len());
        }

        Ok(Self { slots, data })
    }

    /// Number of objects listed in the header.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the header lists no objects.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Object numbers in stream order.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().map(|(id, _)| *id)
    }

    /// Parse the object at `index`.
    pub fn get(&self, index: usize) -> Result<(u32, Object)> {
        let (id, offset) = *self
            .slots
            .get(index)
            .ok_or_else(|| Error::InvalidPdf(format!("object stream has no index {}", index)))?;
        let body = self.data.get(offset..).ok_or(Error::UnexpectedEof)?;
        let (_, object) = parse_object(body).map_err(|_| Error::ParseError {
            offset,
            reason: format!("object {} in object stream", id),
        })?;
        Ok((id, object))
    }

    /// Parse the object numbered `id`, wherever it sits.
    pub fn find(&self, id: u32) -> Result<Option<Object>> {
        match self.slots.iter().position(|(n, _)| *n == id) {
            Some(index) => self.get(index).map(|(_, object)| Some(object)),
            None => Ok(None),
        }
    }
}
