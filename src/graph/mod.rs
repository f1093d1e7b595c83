//! Lazy object graph.
//!
//! Primitive values handed back by a [`PrimitiveResolver`] are turned into
//! [`PdfObject`] nodes only when something asks for them. Nodes live in an
//! arena owned by [`ObjectGraph`] and are addressed by [`NodeId`]; parents are
//! stored as plain ids, so nothing in the graph owns anything above it.
//!
//! Every graph takes a fresh epoch when it is built. Ids issued by an older
//! graph (for example before [`crate::PdfDocument::refresh`]) fail with
//! [`Error::StaleHandle`] instead of silently pointing at the wrong node.
//!
//! ```
//! use pdf_forms::graph::ObjectGraph;
//!
//! let (mut graph, root) = ObjectGraph::from_representation(b"<< /T (City) /Ff 2 >>").unwrap();
//! let root = root.unwrap();
//! assert_eq!(graph.count(root).unwrap(), Some(2));
//! assert_eq!(graph.text_for_key(root, "T").unwrap().as_deref(), Some("City"));
//! ```

mod node;
mod representation;

pub use node::{ChildKey, DataFormat, PdfArray, PdfDictionary, PdfObject, PdfStream};

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, PdfDict, PrimitiveKind};
use crate::parser_config::ParserOptions;
use crate::resolver::PrimitiveResolver;
use node::{Node, Slot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_EPOCH: AtomicU32 = AtomicU32::new(1);

/// Handle to a node in an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    epoch: u32,
}

#[derive(Debug, Clone, Copy)]
enum IndirectState {
    Resolving,
    Resolved(Option<NodeId>),
}

/// Arena of lazily materialized PDF objects.
pub struct ObjectGraph {
    epoch: u32,
    nodes: Vec<Node>,
    indirect: HashMap<ObjectRef, IndirectState>,
    resolver: Option<Box<dyn PrimitiveResolver>>,
    options: ParserOptions,
}

impl std::fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectGraph")
            .field("epoch", &self.epoch)
            .field("nodes", &self.nodes.len())
            .field("indirect", &self.indirect.len())
            .field("detached", &self.resolver.is_none())
            .finish()
    }
}

impl ObjectGraph {
    /// Graph backed by a document's resolver.
    pub fn new(resolver: Box<dyn PrimitiveResolver>) -> Self {
        let options = *resolver.options();
        Self {
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            indirect: HashMap::new(),
            resolver: Some(resolver),
            options,
        }
    }

    /// Graph with no document behind it. References stay as
    /// [`PdfObject::Reference`] nodes.
    pub fn detached() -> Self {
        Self::detached_with_options(ParserOptions::default())
    }

    /// Detached graph with explicit parser options.
    pub fn detached_with_options(options: ParserOptions) -> Self {
        Self {
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            indirect: HashMap::new(),
            resolver: None,
            options,
        }
    }

    /// Parse `text` into a new detached graph and return its root.
    pub fn from_representation(text: &[u8]) -> Result<(Self, Option<NodeId>)> {
        let mut graph = Self::detached();
        let root = graph.insert_representation(text)?;
        Ok((graph, root))
    }

    /// Parse `text` as one object and add it to this graph as a root node.
    pub fn insert_representation(&mut self, text: &[u8]) -> Result<Option<NodeId>> {
        let raw = match &self.resolver {
            Some(resolver) => resolver.resolve_representation(text)?,
            None => crate::parser::parse_complete(text)?,
        };
        self.insert_primitive(&raw, None, None, None)
    }

    /// Epoch shared by every id this graph hands out.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing has been materialized yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if references can be followed.
    pub fn is_attached(&self) -> bool {
        self.resolver.is_some()
    }

    /// Options used for decoding and depth limits.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn check(&self, id: NodeId) -> Result<usize> {
        let index = id.index as usize;
        if id.epoch != self.epoch || index >= self.nodes.len() {
            return Err(Error::StaleHandle);
        }
        Ok(index)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        let index = self.check(id)?;
        Ok(&self.nodes[index])
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let index = self.check(id)?;
        Ok(&mut self.nodes[index])
    }

    /// The value behind `id`.
    pub fn object(&self, id: NodeId) -> Result<&PdfObject> {
        Ok(&self.node(id)?.object)
    }

    /// Container the node was first reached through. `None` for roots.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Key or index the node occupies in its parent.
    pub fn key_in_parent(&self, id: NodeId) -> Result<Option<&ChildKey>> {
        Ok(self.node(id)?.key_in_parent.as_ref())
    }

    /// Indirect reference the node was loaded from, `None` for direct objects.
    pub fn reference(&self, id: NodeId) -> Result<Option<ObjectRef>> {
        Ok(self.node(id)?.reference)
    }

    pub fn object_number(&self, id: NodeId) -> Result<Option<u32>> {
        Ok(self.reference(id)?.map(|r| r.id))
    }

    pub fn generation_number(&self, id: NodeId) -> Result<Option<u16>> {
        Ok(self.reference(id)?.map(|r| r.gen))
    }

    /// Generation number, or `-1` for a direct object.
    pub fn generation_number_or_sentinel(&self, id: NodeId) -> Result<i32> {
        Ok(self.generation_number(id)?.map_or(-1, i32::from))
    }

    /// Primitive tag of the node's value.
    pub fn kind(&self, id: NodeId) -> Result<PrimitiveKind> {
        Ok(self.object(id)?.kind())
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId {
            index: self.nodes.len() as u32,
            epoch: self.epoch,
        };
        self.nodes.push(node);
        id
    }

    /// Record `parent` as the first container an indirect object was reached from.
    fn adopt(&mut self, id: NodeId, parent: Option<NodeId>, key: Option<ChildKey>) -> Result<()> {
        let parent = match parent {
            Some(parent) if parent != id => parent,
            _ => return Ok(()),
        };
        let node = self.node_mut(id)?;
        if node.parent.is_none() {
            node.parent = Some(parent);
            node.key_in_parent = key;
        }
        Ok(())
    }

    fn insert_primitive(
        &mut self,
        raw: &Object,
        parent: Option<NodeId>,
        key: Option<ChildKey>,
        reference: Option<ObjectRef>,
    ) -> Result<Option<NodeId>> {
        let object = match raw {
            Object::Null => return Ok(None),
            Object::Reference(target) if self.resolver.is_some() => {
                return self.resolve_indirect_from(*target, parent, key);
            },
            Object::Reference(target) => PdfObject::Reference(*target),
            Object::Boolean(b) => PdfObject::Boolean(*b),
            Object::Integer(i) => PdfObject::Integer(*i),
            Object::Real(r) => PdfObject::Real(*r),
            Object::Name(n) => PdfObject::Name(n.clone()),
            Object::String(s) => PdfObject::String(s.clone()),
            Object::Array(items) => PdfObject::Array(PdfArray::from_primitive(items)),
            Object::Dictionary(dict) => PdfObject::Dictionary(PdfDictionary::from_primitive(dict)),
            Object::Stream { dict, data } => PdfObject::Stream(PdfStream {
                dictionary: PdfDictionary::from_primitive(dict),
                data: data.clone(),
                filtered: dict.contains_key("Filter"),
            }),
        };
        Ok(Some(self.push_node(Node {
            object,
            reference,
            parent,
            key_in_parent: key,
        })))
    }

    /// Node for an indirect object, loading it on first use.
    ///
    /// `None` when the object is free, missing, or null.
    pub fn resolve_indirect(&mut self, reference: ObjectRef) -> Result<Option<NodeId>> {
        self.resolve_indirect_from(reference, None, None)
    }

    fn resolve_indirect_from(
        &mut self,
        reference: ObjectRef,
        parent: Option<NodeId>,
        key: Option<ChildKey>,
    ) -> Result<Option<NodeId>> {
        match self.indirect.get(&reference).copied() {
            Some(IndirectState::Resolved(id)) => {
                if let Some(id) = id {
                    self.adopt(id, parent, key)?;
                }
                return Ok(id);
            },
            Some(IndirectState::Resolving) => return Err(Error::CircularReference(reference)),
            None => {},
        }

        self.indirect.insert(reference, IndirectState::Resolving);
        let result = self.load_indirect(reference).and_then(|raw| match raw {
            Some(raw) => self.insert_primitive(&raw, parent, key, Some(reference)),
            None => Ok(None),
        });
        match result {
            Ok(id) => {
                self.indirect.insert(reference, IndirectState::Resolved(id));
                Ok(id)
            },
            Err(e) => {
                self.indirect.remove(&reference);
                Err(e)
            },
        }
    }

    /// Primitive value of `reference`, following `N G R` chains to a real value.
    fn load_indirect(&mut self, reference: ObjectRef) -> Result<Option<Object>> {
        let limit = self.options.max_recursion_depth;
        let resolver = match self.resolver.as_mut() {
            Some(resolver) => resolver,
            None => return Ok(None),
        };
        log::debug!("Resolving indirect object {}", reference);

        let mut seen = vec![reference];
        let mut current = resolver.resolve_indirect(reference)?;
        while let Some(Object::Reference(next)) = current {
            if seen.contains(&next) {
                return Err(Error::CircularReference(next));
            }
            if seen.len() as u32 >= limit {
                return Err(Error::RecursionLimitExceeded(limit));
            }
            seen.push(next);
            current = resolver.resolve_indirect(next)?;
        }
        Ok(current.filter(|obj| !obj.is_null()))
    }

    /// Trailer entry as a node (`Root`, `Info`, ...).
    pub fn trailer_entry(&mut self, key: &str) -> Result<Option<NodeId>> {
        let raw = match self.resolver.as_ref().and_then(|r| r.trailer().get(key)) {
            Some(raw) => raw.clone(),
            None => return Ok(None),
        };
        self.insert_primitive(&raw, None, None, None)
    }

    fn slot_mut(&mut self, container: NodeId, key: &ChildKey) -> Result<Option<&mut Slot>> {
        let object = &mut self.node_mut(container)?.object;
        Ok(match key {
            ChildKey::Key(name) => object.dictionary_mut().and_then(|d| d.entries.get_mut(name)),
            ChildKey::Index(index) => object.array_mut().and_then(|a| a.items.get_mut(*index)),
        })
    }

    fn resolve_child(&mut self, container: NodeId, key: ChildKey) -> Result<Option<NodeId>> {
        let raw = {
            let slot = match self.slot_mut(container, &key)? {
                Some(slot) => slot,
                None => return Ok(None),
            };
            match std::mem::replace(slot, Slot::Resolving) {
                Slot::Resolved(id) => {
                    *slot = Slot::Resolved(id);
                    return Ok(id);
                },
                Slot::Resolving => return Err(Error::ReentrantResolution(key.to_string())),
                Slot::Unresolved(raw) => raw,
            }
        };

        let result = self.insert_primitive(&raw, Some(container), Some(key.clone()), None);
        let settled = match &result {
            Ok(id) => Slot::Resolved(*id),
            Err(e) => {
                log::warn!("Failed to resolve {}: {}", key, e);
                Slot::Unresolved(raw)
            },
        };
        if let Some(slot) = self.slot_mut(container, &key)? {
            *slot = settled;
        }
        result
    }

    /// Value under `key`, resolved and cached on first access.
    ///
    /// `None` for a missing key, a null value, or when `dict` is not a
    /// dictionary or stream.
    pub fn object_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<NodeId>> {
        self.resolve_child(dict, ChildKey::Key(key.to_string()))
    }

    /// Element `index`, resolved and cached on first access.
    pub fn object_at_index(&mut self, array: NodeId, index: usize) -> Result<Option<NodeId>> {
        self.resolve_child(array, ChildKey::Index(index))
    }

    /// Primitive tag of the value under `key`.
    pub fn type_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<PrimitiveKind>> {
        match self.object_for_key(dict, key)? {
            Some(id) => Ok(Some(self.kind(id)?)),
            None => Ok(None),
        }
    }

    /// Entry or element count of a container. Nothing is resolved.
    pub fn count(&self, id: NodeId) -> Result<Option<usize>> {
        let object = self.object(id)?;
        Ok(match object {
            PdfObject::Array(array) => Some(array.len()),
            other => other.as_dictionary().map(PdfDictionary::len),
        })
    }

    /// Every key of a dictionary, after resolving every value.
    pub fn all_keys(&mut self, dict: NodeId) -> Result<Vec<String>> {
        let keys = self.keys(dict)?;
        for key in &keys {
            self.object_for_key(dict, key)?;
        }
        Ok(keys)
    }

    /// Every non-null value of a dictionary, in key order.
    pub fn all_values(&mut self, dict: NodeId) -> Result<Vec<NodeId>> {
        let keys = self.keys(dict)?;
        let mut values = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(id) = self.object_for_key(dict, key)? {
                values.push(id);
            }
        }
        Ok(values)
    }

    /// Every element of an array, `None` where an element is null.
    pub fn array_values(&mut self, array: NodeId) -> Result<Vec<Option<NodeId>>> {
        let len = match self.object(array)? {
            PdfObject::Array(a) => a.len(),
            _ => return Ok(Vec::new()),
        };
        (0..len).map(|i| self.object_at_index(array, i)).collect()
    }

    fn keys(&self, dict: NodeId) -> Result<Vec<String>> {
        Ok(self
            .object(dict)?
            .as_dictionary()
            .map(|d| d.keys().map(str::to_string).collect())
            .unwrap_or_default())
    }

    pub fn name_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<String>> {
        self.typed_for_key(dict, key, |obj| obj.as_name().map(str::to_string))
    }

    /// String value decoded as a PDF text string.
    pub fn text_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<String>> {
        self.typed_for_key(dict, key, PdfObject::as_text)
    }

    pub fn integer_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<i64>> {
        self.typed_for_key(dict, key, PdfObject::as_integer)
    }

    pub fn number_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<f64>> {
        self.typed_for_key(dict, key, PdfObject::as_number)
    }

    pub fn bool_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<bool>> {
        self.typed_for_key(dict, key, PdfObject::as_bool)
    }

    /// Value under `key` if it is a dictionary (or stream).
    pub fn dictionary_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<NodeId>> {
        let id = self.object_for_key(dict, key)?;
        self.filter_node(id, |obj| obj.as_dictionary().is_some())
    }

    /// Value under `key` if it is an array.
    pub fn array_for_key(&mut self, dict: NodeId, key: &str) -> Result<Option<NodeId>> {
        let id = self.object_for_key(dict, key)?;
        self.filter_node(id, |obj| obj.as_array().is_some())
    }

    fn typed_for_key<T>(
        &mut self,
        dict: NodeId,
        key: &str,
        extract: impl FnOnce(&PdfObject) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.object_for_key(dict, key)? {
            Some(id) => Ok(extract(self.object(id)?)),
            None => Ok(None),
        }
    }

    fn filter_node(&self, id: Option<NodeId>, keep: impl FnOnce(&PdfObject) -> bool) -> Result<Option<NodeId>> {
        match id {
            Some(id) if keep(self.object(id)?) => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    /// The dictionary of a stream node.
    pub fn stream_dictionary(&self, stream: NodeId) -> Result<Option<&PdfDictionary>> {
        Ok(self.object(stream)?.as_stream().map(PdfStream::dictionary))
    }

    /// Stream payload, raw or with its filters undone. `None` if `stream`
    /// is not a stream. Nothing is decoded until asked for.
    pub fn stream_data(&mut self, stream: NodeId, format: DataFormat) -> Result<Option<Vec<u8>>> {
        let data = match self.object(stream)?.as_stream() {
            Some(s) => s.data.clone(),
            None => return Ok(None),
        };
        match format {
            DataFormat::Raw => Ok(Some(data.to_vec())),
            DataFormat::Decoded => {
                let mut filters = PdfDict::new();
                for key in ["Filter", "DecodeParms"] {
                    if let Some(id) = self.object_for_key(stream, key)? {
                        let value = self.to_primitive(id)?;
                        filters.insert(key.to_string(), value);
                    }
                }
                crate::object::decode_with_dict(&filters, &data, &self.options).map(Some)
            },
        }
    }

    /// Fully resolved primitive copy of a node.
    ///
    /// Indirect children are inlined, so this fails with
    /// [`Error::RecursionLimitExceeded`] on cyclic structures.
    pub fn to_primitive(&mut self, id: NodeId) -> Result<Object> {
        self.to_primitive_at(id, 0)
    }

    fn to_primitive_at(&mut self, id: NodeId, depth: usize) -> Result<Object> {
        if depth > self.options.max_nesting {
            return Err(Error::RecursionLimitExceeded(self.options.max_nesting as u32));
        }
        let object = self.object(id)?.clone();
        Ok(match object {
            PdfObject::Boolean(b) => Object::Boolean(b),
            PdfObject::Integer(i) => Object::Integer(i),
            PdfObject::Real(r) => Object::Real(r),
            PdfObject::Name(n) => Object::Name(n),
            PdfObject::String(s) => Object::String(s),
            PdfObject::Reference(r) => Object::Reference(r),
            PdfObject::Array(array) => {
                let mut items = Vec::with_capacity(array.len());
                for index in 0..array.len() {
                    items.push(match self.object_at_index(id, index)? {
                        Some(child) => self.to_primitive_at(child, depth + 1)?,
                        None => Object::Null,
                    });
                }
                Object::Array(items)
            },
            PdfObject::Dictionary(dict) => Object::Dictionary(self.dictionary_to_primitive(id, &dict, depth)?),
            PdfObject::Stream(stream) => Object::Stream {
                dict: self.dictionary_to_primitive(id, &stream.dictionary, depth)?,
                data: stream.data,
            },
        })
    }

    fn dictionary_to_primitive(&mut self, id: NodeId, dict: &PdfDictionary, depth: usize) -> Result<PdfDict> {
        let mut out = PdfDict::new();
        for key in dict.keys() {
            if let Some(child) = self.object_for_key(id, key)? {
                let value = self.to_primitive_at(child, depth + 1)?;
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }
}
