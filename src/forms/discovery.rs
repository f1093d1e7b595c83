//! Walks the AcroForm field tree and builds [`Field`]s.
//!
//! See ISO 32000-1:2008, Section 12.7.3 - Field Dictionaries.

use super::field::{Field, FieldFlags, FieldId, FieldType};
use crate::error::Result;
use crate::graph::{NodeId, ObjectGraph, PdfArray, PdfObject};
use std::collections::{HashMap, HashSet};

/// Entries a field inherits from its nearest ancestor that has them.
#[derive(Debug, Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<String>,
    value: Option<NodeId>,
    default_value: Option<NodeId>,
    flags: Option<i64>,
    options: Option<NodeId>,
}

struct Walker<'g> {
    graph: &'g mut ObjectGraph,
    page_of: HashMap<NodeId, usize>,
    pages: Vec<NodeId>,
    visited: HashSet<NodeId>,
    max_depth: usize,
    fields: Vec<Field>,
}

/// Every widget of every terminal field reachable from `/AcroForm /Fields`.
pub(crate) fn discover_fields(graph: &mut ObjectGraph, catalog: NodeId, pages: &[NodeId]) -> Result<Vec<Field>> {
    let acroform = match graph.dictionary_for_key(catalog, "AcroForm")? {
        Some(acroform) => acroform,
        None => return Ok(Vec::new()),
    };
    let roots = match graph.array_for_key(acroform, "Fields")? {
        Some(fields) => graph.array_values(fields)?,
        None => return Ok(Vec::new()),
    };

    let mut page_of = HashMap::new();
    for (index, &page) in pages.iter().enumerate() {
        if let Some(annots) = graph.array_for_key(page, "Annots")? {
            for annot in graph.array_values(annots)?.into_iter().flatten() {
                page_of.entry(annot).or_insert(index);
            }
        }
    }

    let max_depth = graph.options().max_nesting;
    let mut walker = Walker {
        graph,
        page_of,
        pages: pages.to_vec(),
        visited: HashSet::new(),
        max_depth,
        fields: Vec::new(),
    };
    for root in roots.into_iter().flatten() {
        walker.walk(root, &Inherited::default(), 0)?;
    }
    log::debug!("Discovered {} form widgets", walker.fields.len());
    Ok(walker.fields)
}

impl Walker<'_> {
    fn has_key(&self, node: NodeId, key: &str) -> Result<bool> {
        Ok(self
            .graph
            .object(node)?
            .as_dictionary()
            .is_some_and(|d| d.contains_key(key)))
    }

    fn walk(&mut self, node: NodeId, parent: &Inherited, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            log::warn!("Field tree deeper than {} levels, ignoring the rest", self.max_depth);
            return Ok(());
        }
        if !self.visited.insert(node) {
            log::warn!("Field tree revisits a node, skipping it");
            return Ok(());
        }
        if self.graph.object(node)?.as_dictionary().is_none() {
            return Ok(());
        }

        let partial = self.graph.text_for_key(node, "T")?.unwrap_or_default();
        let name = match (parent.name.is_empty(), partial.is_empty()) {
            (true, _) => partial.clone(),
            (false, true) => parent.name.clone(),
            (false, false) => format!("{}.{}", parent.name, partial),
        };
        let inherited = Inherited {
            name,
            field_type: self.graph.name_for_key(node, "FT")?.or_else(|| parent.field_type.clone()),
            value: self.graph.object_for_key(node, "V")?.or(parent.value),
            default_value: self.graph.object_for_key(node, "DV")?.or(parent.default_value),
            flags: self.graph.integer_for_key(node, "Ff")?.or(parent.flags),
            options: self.graph.array_for_key(node, "Opt")?.or(parent.options),
        };

        let kids = match self.graph.array_for_key(node, "Kids")? {
            Some(kids) => self.graph.array_values(kids)?.into_iter().flatten().collect(),
            None => Vec::new(),
        };
        let mut has_named_kid = false;
        for &kid in &kids {
            has_named_kid |= self.has_key(kid, "T")?;
        }

        if has_named_kid {
            for kid in kids {
                self.walk(kid, &inherited, depth + 1)?;
            }
            return Ok(());
        }

        let widgets = if kids.is_empty() { vec![node] } else { kids };
        for widget in widgets {
            let field = self.build_field(node, widget, &partial, &inherited)?;
            self.fields.push(field);
        }
        Ok(())
    }

    fn build_field(&mut self, terminal: NodeId, widget: NodeId, partial: &str, inherited: &Inherited) -> Result<Field> {
        let field_type = FieldType::from_pdf_name(inherited.field_type.as_deref());
        let value = match inherited.value {
            Some(value) => self.value_text(value)?,
            None => String::new(),
        };
        let default_value = match inherited.default_value {
            Some(dv) => Some(self.value_text(dv)?),
            None => None,
        };
        let options = match inherited.options {
            Some(opt) => self.option_texts(opt)?,
            None => Vec::new(),
        };
        let export_value = if field_type == FieldType::Button {
            self.export_value(widget)?
        } else {
            None
        };

        Ok(Field {
            id: FieldId(0),
            name: inherited.name.clone(),
            partial_name: partial.to_string(),
            alternate_name: self.graph.text_for_key(terminal, "TU")?,
            field_type,
            flags: FieldFlags::from_bits_truncate(inherited.flags.unwrap_or(0) as u32),
            stored_value: Some(value.clone()),
            value,
            default_value,
            export_value,
            options,
            rect: self.rect(widget)?,
            page_index: self.page_index(widget)?,
            backing_dictionary: Some(widget),
            value_owner: Some(terminal),
        })
    }

    /// Field value as text. A multi-select array contributes its first entry.
    fn value_text(&mut self, value: NodeId) -> Result<String> {
        let is_array = self.graph.object(value)?.as_array().is_some();
        let value = if is_array {
            match self.graph.object_at_index(value, 0)? {
                Some(first) => first,
                None => return Ok(String::new()),
            }
        } else {
            value
        };
        Ok(match self.graph.object(value)? {
            PdfObject::String(bytes) => crate::utility::decode_text_string(bytes),
            PdfObject::Name(name) => name.clone(),
            PdfObject::Integer(i) => i.to_string(),
            PdfObject::Real(r) => r.to_string(),
            PdfObject::Boolean(b) => b.to_string(),
            _ => String::new(),
        })
    }

    /// Display strings of `/Opt`; `[export display]` pairs give the display part.
    fn option_texts(&mut self, opt: NodeId) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for item in self.graph.array_values(opt)?.into_iter().flatten() {
            let shown = match self.graph.object(item)?.as_array().map(PdfArray::len) {
                Some(len) if len >= 2 => self.graph.object_at_index(item, 1)?,
                Some(_) => self.graph.object_at_index(item, 0)?,
                None => Some(item),
            };
            if let Some(shown) = shown {
                texts.push(self.value_text(shown)?);
            }
        }
        Ok(texts)
    }

    /// First "on" appearance state of a button widget.
    fn export_value(&mut self, widget: NodeId) -> Result<Option<String>> {
        let appearances = match self.graph.dictionary_for_key(widget, "AP")? {
            Some(ap) => ap,
            None => return Ok(None),
        };
        for kind in ["N", "D"] {
            if let Some(states) = self.graph.dictionary_for_key(appearances, kind)? {
                let on = self
                    .graph
                    .object(states)?
                    .as_dictionary()
                    .and_then(|d| d.keys().find(|k| *k != "Off").map(str::to_string));
                if on.is_some() {
                    return Ok(on);
                }
            }
        }
        Ok(None)
    }

    fn rect(&mut self, widget: NodeId) -> Result<Option<[f64; 4]>> {
        let rect = match self.graph.array_for_key(widget, "Rect")? {
            Some(rect) => rect,
            None => return Ok(None),
        };
        let mut coords = [0.0; 4];
        for (i, coord) in coords.iter_mut().enumerate() {
            match self.graph.object_at_index(rect, i)? {
                Some(id) => match self.graph.object(id)?.as_number() {
                    Some(n) => *coord = n,
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        }
        Ok(Some(coords))
    }

    fn page_index(&mut self, widget: NodeId) -> Result<Option<usize>> {
        if let Some(&index) = self.page_of.get(&widget) {
            return Ok(Some(index));
        }
        Ok(match self.graph.dictionary_for_key(widget, "P")? {
            Some(page) => self.pages.iter().position(|&p| p == page),
            None => None,
        })
    }
}
