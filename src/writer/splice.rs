//! In-place textual edits of object bodies.
//!
//! A save never rewrites the cross-reference table or trailer. Each edited
//! entry is located by walking the object's source text and its value bytes
//! are swapped for new PDF syntax. Planning reads the buffer only; nothing
//! is written until [`apply_splices`] has checked the whole batch.

use crate::error::{Error, Result};
use crate::graph::ChildKey;
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Object, ObjectRef};
use crate::parser::{parse_indirect_header, parse_object};
use crate::parser_config::ParserOptions;
use crate::resolver::{BufferResolver, ObjectLocation, PrimitiveResolver};
use crate::writer::ObjectSerializer;
use crate::xref_reconstruction::{find_object_header, header_at};
use bytes::Bytes;

/// An entry to rewrite: the value at `path` inside indirect object `object`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTarget {
    /// Nearest indirect object holding the entry
    pub object: ObjectRef,
    /// Keys and indices leading from the object down to the entry
    pub path: Vec<ChildKey>,
    /// New value
    pub value: Object,
}

/// Replace `start..end` of the buffer with `replacement`.
///
/// `start == end` is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub replacement: Vec<u8>,
}

impl Splice {
    /// Change in buffer length once applied.
    pub fn growth(&self) -> isize {
        self.replacement.len() as isize - (self.end - self.start) as isize
    }
}

/// Turns [`EntryTarget`]s into [`Splice`]s against one buffer.
pub struct SplicePlanner {
    resolver: BufferResolver,
    pad_shorter_values: bool,
}

impl std::fmt::Debug for SplicePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplicePlanner")
            .field("resolver", &self.resolver)
            .field("pad_shorter_values", &self.pad_shorter_values)
            .finish()
    }
}

impl SplicePlanner {
    /// Read cross-reference data from `data` as it is now.
    ///
    /// Encrypted documents are refused: their strings cannot be edited as text.
    pub fn new(data: Bytes, options: ParserOptions, pad_shorter_values: bool) -> Result<Self> {
        let resolver = BufferResolver::new(data, options)?;
        if resolver.trailer().contains_key("Encrypt") {
            return Err(Error::UnsupportedSave("document is encrypted".to_string()));
        }
        Ok(Self {
            resolver,
            pad_shorter_values,
        })
    }

    fn data(&self) -> &[u8] {
        self.resolver.data()
    }

    /// Byte offset of the `N G obj` header for `reference`.
    pub fn object_offset(&self, reference: ObjectRef) -> Result<usize> {
        let data = self.data();
        match self.resolver.location(reference) {
            Some(ObjectLocation::InObjectStream { stream, .. }) => Err(Error::UnsupportedSave(format!(
                "{} is stored in compressed object stream {}",
                reference, stream
            ))),
            Some(ObjectLocation::Offset(offset)) => {
                let offset = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
                if header_at(data, offset) == Some(reference) {
                    return Ok(offset);
                }
                log::warn!("Stale cross-reference offset for {}, scanning for its header", reference);
                find_object_header(data, reference).ok_or(Error::ObjectNotFound(reference.id, reference.gen))
            },
            None => find_object_header(data, reference).ok_or(Error::ObjectNotFound(reference.id, reference.gen)),
        }
    }

    /// Locate the entry and build the edit that gives it the new value.
    pub fn plan(&self, target: &EntryTarget) -> Result<Splice> {
        let data = self.data();
        let header = self.object_offset(target.object)?;
        let (body, _) = parse_indirect_header(&data[header..]).map_err(|_| Error::ParseError {
            offset: header,
            reason: format!("unreadable header for {}", target.object),
        })?;

        let value = ObjectSerializer::compact().serialize(&target.value);
        let position = locate(data, offset_of(data, body), &target.path)?;
        let splice = match position {
            EntryPosition::Value { start, end } => {
                let mut replacement = value;
                let old_len = end - start;
                if self.pad_shorter_values && replacement.len() < old_len {
                    replacement.resize(old_len, b' ');
                }
                Splice {
                    start,
                    end,
                    replacement,
                }
            },
            EntryPosition::Missing { insert_at, key } => {
                let mut replacement = Vec::with_capacity(value.len() + key.len() + 3);
                ObjectSerializer::compact().write_name(&mut replacement, &key);
                replacement.push(b' ');
                replacement.extend_from_slice(&value);
                replacement.push(b' ');
                Splice {
                    start: insert_at,
                    end: insert_at,
                    replacement,
                }
            },
        };
        log::debug!(
            "Planned edit of {} at {}..{} ({} bytes)",
            target.object,
            splice.start,
            splice.end,
            splice.replacement.len()
        );
        Ok(splice)
    }
}

#[derive(Debug, PartialEq)]
enum EntryPosition {
    Value { start: usize, end: usize },
    Missing { insert_at: usize, key: String },
}

fn offset_of(data: &[u8], rest: &[u8]) -> usize {
    data.len() - rest.len()
}

fn parse_error(offset: usize, reason: impl Into<String>) -> Error {
    Error::ParseError {
        offset,
        reason: reason.into(),
    }
}

/// Walk the source text from `start` along `path` to the entry's value.
fn locate(data: &[u8], start: usize, path: &[ChildKey]) -> Result<EntryPosition> {
    let (last, parents) = match path.split_last() {
        Some(split) => split,
        None => return Err(parse_error(start, "empty entry path")),
    };

    let mut pos = start;
    for step in parents {
        match find_member(data, pos, step)? {
            Some((value_start, _)) => pos = value_start,
            None => return Err(parse_error(pos, format!("no {} in object body", step))),
        }
    }

    match find_member(data, pos, last)? {
        Some((start, end)) => Ok(EntryPosition::Value { start, end }),
        None => match last {
            ChildKey::Key(key) => {
                let (after_ws, _) = skip_ws(&data[pos..]).map_err(|_| parse_error(pos, "unreadable body"))?;
                // Right after the opening "<<".
                let insert_at = offset_of(data, after_ws) + 2;
                Ok(EntryPosition::Missing {
                    insert_at,
                    key: key.clone(),
                })
            },
            ChildKey::Index(index) => Err(parse_error(pos, format!("array has no element {}", index))),
        }
    }
}

/// Span of the member `step` of the container starting at `pos`.
fn find_member(data: &[u8], pos: usize, step: &ChildKey) -> Result<Option<(usize, usize)>> {
    let (mut rest, open) = token(&data[pos..]).map_err(|_| parse_error(pos, "expected a container"))?;

    match (step, open) {
        (ChildKey::Key(wanted), Token::DictStart) => loop {
            let here = offset_of(data, rest);
            let (after_key, tok) = token(rest).map_err(|_| parse_error(here, "unterminated dictionary"))?;
            let key = match tok {
                Token::DictEnd => return Ok(None),
                Token::Name(key) => key,
                _ => return Err(parse_error(here, "expected a dictionary key")),
            };
            let (value_start, after_value) = member_span(data, after_key)?;
            if key == *wanted {
                return Ok(Some((value_start, offset_of(data, after_value))));
            }
            rest = after_value;
        },
        (ChildKey::Index(wanted), Token::ArrayStart) => {
            let mut index = 0;
            loop {
                let (after_ws, _) = skip_ws(rest).map_err(|_| parse_error(offset_of(data, rest), "bad array"))?;
                if after_ws.starts_with(b"]") || after_ws.is_empty() {
                    return Ok(None);
                }
                let (value_start, after_value) = member_span(data, after_ws)?;
                if index == *wanted {
                    return Ok(Some((value_start, offset_of(data, after_value))));
                }
                index += 1;
                rest = after_value;
            }
        },
        _ => Err(parse_error(pos, format!("container does not match {}", step))),
    }
}

fn member_span<'a>(data: &'a [u8], input: &'a [u8]) -> Result<(usize, &'a [u8])> {
    let (value, _) = skip_ws(input).map_err(|_| parse_error(offset_of(data, input), "bad value"))?;
    let start = offset_of(data, value);
    let (after, _) = parse_object(value).map_err(|_| parse_error(start, "unreadable value"))?;
    Ok((start, after))
}

/// Apply every splice to a copy of `data`, highest offset first.
///
/// Fails without producing anything if two edits overlap.
pub fn apply_splices(data: &[u8], mut splices: Vec<Splice>) -> Result<Vec<u8>> {
    splices.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    for pair in splices.windows(2) {
        let (later, earlier) = (&pair[0], &pair[1]);
        if earlier.end > later.start {
            return Err(Error::UnsupportedSave(format!(
                "overlapping edits at bytes {}..{} and {}..{}",
                earlier.start, earlier.end, later.start, later.end
            )));
        }
    }
    if let Some(out_of_range) = splices.iter().find(|s| s.start > s.end || s.end > data.len()) {
        return Err(Error::UnsupportedSave(format!(
            "edit {}..{} outside the document",
            out_of_range.start, out_of_range.end
        )));
    }

    let growth: isize = splices.iter().map(Splice::growth).sum();
    let mut out = data.to_vec();
    out.reserve(growth.max(0) as usize);
    for splice in splices {
        out.splice(splice.start..splice.end, splice.replacement);
    }
    Ok(out)
}
