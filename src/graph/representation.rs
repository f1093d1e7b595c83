//! Structural equality and PDF syntax output for graph nodes.

use super::node::Slot;
use super::{NodeId, ObjectGraph, PdfDictionary, PdfObject};
use crate::error::Result;
use crate::writer::ObjectSerializer;
use std::collections::HashSet;

type Visiting = HashSet<(NodeId, NodeId)>;

impl ObjectGraph {
    /// Structural equality of two optional nodes.
    ///
    /// Absent equals only absent. Numbers compare numerically across
    /// integer and real. Containers are compared member by member, which
    /// resolves every member on both sides. A pair already being compared
    /// further up (a `/Parent` loop) counts as equal.
    pub fn is_equal(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> Result<bool> {
        let mut visiting = Visiting::new();
        self.equal_nodes(a, b, &mut visiting)
    }

    /// Dictionary equality: same number of keys, and every key's value equal.
    ///
    /// False if either side is not a plain dictionary.
    pub fn is_equal_to_dictionary(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        let both_dicts = matches!(self.object(a)?, PdfObject::Dictionary(_))
            && matches!(self.object(b)?, PdfObject::Dictionary(_));
        if !both_dicts {
            return Ok(false);
        }
        self.is_equal(Some(a), Some(b))
    }

    fn equal_nodes(&mut self, a: Option<NodeId>, b: Option<NodeId>, visiting: &mut Visiting) -> Result<bool> {
        let (a, b) = match (a, b) {
            (None, None) => return Ok(true),
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(false),
        };
        if a == b {
            self.check(a)?;
            return Ok(true);
        }
        if !visiting.insert((a, b)) {
            return Ok(true);
        }
        self.equal_present(a, b, visiting)
    }

    fn equal_present(&mut self, a: NodeId, b: NodeId, visiting: &mut Visiting) -> Result<bool> {
        let (left, right) = (self.object(a)?, self.object(b)?);
        match (left, right) {
            (PdfObject::Integer(x), PdfObject::Integer(y)) => Ok(x == y),
            (PdfObject::Integer(_) | PdfObject::Real(_), PdfObject::Integer(_) | PdfObject::Real(_)) => {
                Ok(left.as_number() == right.as_number())
            },
            (PdfObject::Boolean(x), PdfObject::Boolean(y)) => Ok(x == y),
            (PdfObject::Name(x), PdfObject::Name(y)) => Ok(x == y),
            (PdfObject::String(x), PdfObject::String(y)) => Ok(x == y),
            (PdfObject::Reference(x), PdfObject::Reference(y)) => Ok(x == y),
            (PdfObject::Array(x), PdfObject::Array(y)) => {
                let len = x.len();
                if len != y.len() {
                    return Ok(false);
                }
                for index in 0..len {
                    let left = self.object_at_index(a, index)?;
                    let right = self.object_at_index(b, index)?;
                    if !self.equal_nodes(left, right, visiting)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            (PdfObject::Dictionary(_), PdfObject::Dictionary(_)) => self.equal_entries(a, b, visiting),
            (PdfObject::Stream(x), PdfObject::Stream(y)) => {
                if x.data != y.data {
                    return Ok(false);
                }
                self.equal_entries(a, b, visiting)
            },
            _ => Ok(false),
        }
    }

    fn equal_entries(&mut self, a: NodeId, b: NodeId, visiting: &mut Visiting) -> Result<bool> {
        let (keys, other_keys) = {
            let left = self.object(a)?.as_dictionary();
            let right = self.object(b)?.as_dictionary();
            match (left, right) {
                (Some(left), Some(right)) if left.len() == right.len() => (
                    left.keys().map(str::to_string).collect::<Vec<_>>(),
                    right.keys().map(str::to_string).collect::<HashSet<_>>(),
                ),
                _ => return Ok(false),
            }
        };
        if keys.iter().any(|key| !other_keys.contains(key)) {
            return Ok(false);
        }
        for key in &keys {
            let left = self.object_for_key(a, key)?;
            let right = self.object_for_key(b, key)?;
            if !self.equal_nodes(left, right, visiting)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// PDF syntax for the node, as it would be written in a file body.
    ///
    /// Members that are indirect objects print as `N G R`; unresolved
    /// members print from their primitive value. Nothing gets resolved.
    pub fn pdf_file_representation(&self, id: NodeId) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_node(&ObjectSerializer::compact(), &mut out, id, true)?;
        Ok(out)
    }

    /// Readable multi-line dump of the node.
    pub fn description(&self, id: NodeId) -> Result<String> {
        let mut out = Vec::new();
        self.write_node(&ObjectSerializer::spaced(), &mut out, id, true)?;
        let mut text = String::from_utf8_lossy(&out).into_owned();
        if let Some(reference) = self.reference(id)? {
            text = format!("{} obj {}", reference.to_string().trim_end_matches(" R"), text);
        }
        Ok(text)
    }

    fn write_node(&self, serializer: &ObjectSerializer, out: &mut Vec<u8>, id: NodeId, root: bool) -> Result<()> {
        let node = self.node(id)?;
        if !root {
            if let Some(reference) = node.reference {
                serializer.write_reference(out, reference);
                return Ok(());
            }
        }
        match &node.object {
            PdfObject::Boolean(b) => serializer.write_bool(out, *b),
            PdfObject::Integer(i) => serializer.write_integer(out, *i),
            PdfObject::Real(r) => serializer.write_real(out, *r),
            PdfObject::Name(n) => serializer.write_name(out, n),
            PdfObject::String(s) => serializer.write_string(out, s),
            PdfObject::Reference(r) => serializer.write_reference(out, *r),
            PdfObject::Array(array) => {
                serializer.open_array(out);
                for (index, slot) in array.items.iter().enumerate() {
                    serializer.array_separator(out, index);
                    self.write_slot(serializer, out, slot)?;
                }
                serializer.close_array(out);
            },
            PdfObject::Dictionary(dict) => self.write_dictionary(serializer, out, dict)?,
            PdfObject::Stream(stream) => {
                self.write_dictionary(serializer, out, &stream.dictionary)?;
                serializer.write_stream_body(out, &stream.data);
            },
        }
        Ok(())
    }

    fn write_dictionary(&self, serializer: &ObjectSerializer, out: &mut Vec<u8>, dict: &PdfDictionary) -> Result<()> {
        serializer.open_dictionary(out);
        let mut written = 0;
        for (key, slot) in &dict.entries {
            // Null entries are the same as missing ones.
            if matches!(slot, Slot::Resolved(None)) {
                continue;
            }
            serializer.dictionary_key(out, key);
            self.write_slot(serializer, out, slot)?;
            written += 1;
        }
        serializer.close_dictionary(out, written == 0);
        Ok(())
    }

    fn write_slot(&self, serializer: &ObjectSerializer, out: &mut Vec<u8>, slot: &Slot) -> Result<()> {
        match slot {
            Slot::Unresolved(raw) => serializer.write_object(out, raw),
            Slot::Resolved(Some(child)) => self.write_node(serializer, out, *child, false)?,
            Slot::Resolved(None) | Slot::Resolving => out.extend_from_slice(b"null"),
        }
        Ok(())
    }
}
