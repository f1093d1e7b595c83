//! Node types stored in an [`super::ObjectGraph`].

use crate::graph::NodeId;
use crate::object::{Object, ObjectRef, PdfDict, PrimitiveKind};
use bytes::Bytes;
use indexmap::IndexMap;

/// Memo state of one container entry.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// Primitive value not yet turned into a node
    Unresolved(Object),
    /// Resolution in progress
    Resolving,
    /// Resolved; `None` when the value is null or points at nothing
    Resolved(Option<NodeId>),
}

/// Position of a node inside its parent container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildKey {
    /// Dictionary key
    Key(String),
    /// Array index
    Index(usize),
}

impl std::fmt::Display for ChildKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildKey::Key(key) => write!(f, "/{}", key),
            ChildKey::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Whether stream data is wanted as stored or with its filters undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// Bytes exactly as stored in the file
    #[default]
    Raw,
    /// Bytes after running the `/Filter` pipeline
    Decoded,
}

/// Lazily resolved dictionary.
///
/// The key set is fixed by the primitive dictionary it was built from; values
/// become nodes one key at a time as they are asked for.
#[derive(Debug, Clone, Default)]
pub struct PdfDictionary {
    pub(crate) entries: IndexMap<String, Slot>,
}

impl PdfDictionary {
    pub(crate) fn from_primitive(dict: &PdfDict) -> Self {
        Self {
            entries: dict
                .iter()
                .map(|(key, value)| (key.clone(), Slot::Unresolved(value.clone())))
                .collect(),
        }
    }

    /// Number of entries. Does not resolve anything.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in source order. Does not resolve anything.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True once the value under `key` has been turned into a node.
    pub fn is_resolved(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Slot::Resolved(_)))
    }
}

/// Lazily resolved array.
#[derive(Debug, Clone, Default)]
pub struct PdfArray {
    pub(crate) items: Vec<Slot>,
}

impl PdfArray {
    pub(crate) fn from_primitive(items: &[Object]) -> Self {
        Self {
            items: items.iter().cloned().map(Slot::Unresolved).collect(),
        }
    }

    /// Number of elements. Does not resolve anything.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True once element `index` has been turned into a node.
    pub fn is_resolved(&self, index: usize) -> bool {
        matches!(self.items.get(index), Some(Slot::Resolved(_)))
    }
}

/// A stream: its own dictionary plus undecoded payload.
#[derive(Debug, Clone)]
pub struct PdfStream {
    pub(crate) dictionary: PdfDictionary,
    pub(crate) data: Bytes,
    pub(crate) filtered: bool,
}

impl PdfStream {
    /// The stream dictionary (`/Length`, `/Filter`, ...).
    pub fn dictionary(&self) -> &PdfDictionary {
        &self.dictionary
    }

    /// Payload as stored in the file.
    pub fn raw_data(&self) -> &Bytes {
        &self.data
    }

    /// True if the stream declares a `/Filter`.
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }
}

/// A resolved PDF value.
///
/// Scalars carry their value directly; containers are lazy and resolve
/// their members through the owning [`super::ObjectGraph`]. A `Reference`
/// only exists in graphs without a document, where references cannot be
/// followed.
#[derive(Debug, Clone)]
pub enum PdfObject {
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real value
    Real(f64),
    /// Name, without the leading `/`
    Name(String),
    /// String bytes
    String(Vec<u8>),
    /// Array
    Array(PdfArray),
    /// Dictionary
    Dictionary(PdfDictionary),
    /// Stream
    Stream(PdfStream),
    /// Unfollowed indirect reference
    Reference(ObjectRef),
}

impl PdfObject {
    /// Primitive tag of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PdfObject::Boolean(_) => PrimitiveKind::Boolean,
            PdfObject::Integer(_) => PrimitiveKind::Integer,
            PdfObject::Real(_) => PrimitiveKind::Real,
            PdfObject::Name(_) => PrimitiveKind::Name,
            PdfObject::String(_) => PrimitiveKind::String,
            PdfObject::Array(_) => PrimitiveKind::Array,
            PdfObject::Dictionary(_) => PrimitiveKind::Dictionary,
            PdfObject::Stream(_) => PrimitiveKind::Stream,
            PdfObject::Reference(_) => PrimitiveKind::Reference,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real, as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// String decoded as a PDF text string (PDFDocEncoding or UTF-16BE).
    pub fn as_text(&self) -> Option<String> {
        self.as_string_bytes().map(crate::utility::decode_text_string)
    }

    /// Dictionary view. A stream answers with its own dictionary.
    pub fn as_dictionary(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dictionary),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn dictionary_mut(&mut self) -> Option<&mut PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&mut s.dictionary),
            _ => None,
        }
    }

    pub(crate) fn array_mut(&mut self) -> Option<&mut PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) object: PdfObject,
    pub(crate) reference: Option<ObjectRef>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) key_in_parent: Option<ChildKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_return_none_on_mismatch() {
        let obj = PdfObject::Integer(3);
        assert_eq!(obj.as_integer(), Some(3));
        assert_eq!(obj.as_number(), Some(3.0));
        assert!(obj.as_name().is_none());
        assert!(obj.as_dictionary().is_none());
        assert_eq!(PdfObject::Real(0.5).as_integer(), None);
    }

    #[test]
    fn test_stream_answers_as_dictionary() {
        let mut dict = PdfDict::new();
        dict.insert("Length".into(), Object::Integer(0));
        let stream = PdfObject::Stream(PdfStream {
            dictionary: PdfDictionary::from_primitive(&dict),
            data: Bytes::new(),
            filtered: false,
        });
        assert_eq!(stream.as_dictionary().map(PdfDictionary::len), Some(1));
        assert_eq!(stream.kind(), PrimitiveKind::Stream);
    }

    #[test]
    fn test_dictionary_len_without_resolution() {
        let mut dict = PdfDict::new();
        dict.insert("A".into(), Object::Reference(ObjectRef::new(99, 0)));
        dict.insert("B".into(), Object::Integer(1));
        let lazy = PdfDictionary::from_primitive(&dict);
        assert_eq!(lazy.len(), 2);
        assert!(!lazy.is_resolved("A"));
        assert_eq!(lazy.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_child_key_display() {
        assert_eq!(ChildKey::Key("Kids".into()).to_string(), "/Kids");
        assert_eq!(ChildKey::Index(2).to_string(), "[2]");
    }
}
