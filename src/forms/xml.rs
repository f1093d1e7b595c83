//! XML export of form values.
//!
//! Field names are split on `.` and nested, so `address.city` becomes
//! `<address><city>...</city></address>` under a `<fields>` root.
//! Components that are not valid element names are rewritten, and the
//! element then carries the original component in a `name` attribute.
//! Siblings whose rewritten names collide get `_2`, `_3`... suffixes.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

#[derive(Debug, Default)]
struct XmlNode {
    value: Option<String>,
    children: IndexMap<String, XmlNode>,
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::Xml(e.to_string())
}

/// Make a name component usable as an element name.
pub(crate) fn element_name(component: &str) -> String {
    let mut name: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        name.insert(0, '_');
    }
    name
}

/// Write `(group name, value)` pairs as a nested XML document.
pub(crate) fn groups_to_xml<'a>(groups: impl IntoIterator<Item = (&'a str, String)>) -> Result<String> {
    let mut root = XmlNode::default();
    for (name, value) in groups {
        let mut node = &mut root;
        for component in name.split('.') {
            node = node.children.entry(component.to_string()).or_default();
        }
        node.value = Some(value);
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut writer, "fields", None, &root)?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Element names for `components`, unique among themselves.
fn sibling_names<'a>(components: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut used = HashSet::new();
    components
        .map(|component| {
            let base = element_name(component);
            let mut name = base.clone();
            let mut n = 1;
            while !used.insert(name.clone()) {
                n += 1;
                name = format!("{}_{}", base, n);
            }
            name
        })
        .collect()
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    original: Option<&str>,
    node: &XmlNode,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    if let Some(original) = original.filter(|o| *o != name) {
        start.push_attribute(("name", original));
    }

    let text = node.value.as_deref().filter(|v| !v.is_empty());
    if text.is_none() && node.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
    }
    let names = sibling_names(node.children.keys());
    for ((component, child), child_name) in node.children.iter().zip(&names) {
        write_element(writer, child_name, Some(component.as_str()), child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}
