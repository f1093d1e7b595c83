//! AcroForm fields grouped by name.
//!
//! Fields that share a fully qualified name are one logical field: setting
//! the value of a name sets it on every member. For buttons the shared value
//! is the export value of the selected widget, so a member is checked exactly
//! when its export value equals the group value and the group is mutually
//! exclusive by construction.
//!
//! ```
//! use pdf_forms::forms::{Field, FieldType, FormContainer};
//!
//! let mut forms = FormContainer::new();
//! forms.add_form(Field::new("Agree", FieldType::Button).with_export_value("Yes"));
//! forms.add_form(Field::new("Agree", FieldType::Button).with_export_value("No"));
//!
//! forms.set_value("Yes", "Agree");
//! let checked: Vec<bool> = forms.forms_with_name("Agree").iter().map(|f| f.is_checked()).collect();
//! assert_eq!(checked, vec![true, false]);
//! ```

mod discovery;
mod field;
mod script;
mod xml;

pub(crate) use discovery::discover_fields;
pub use field::{Field, FieldFlags, FieldId, FieldSnapshot, FieldType};
pub use script::{ScriptBridge, ScriptEngine, ScriptHost};

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// All form fields of a document, grouped by name.
#[derive(Default)]
pub struct FormContainer {
    fields: IndexMap<FieldId, Field>,
    groups: IndexMap<String, Vec<FieldId>>,
    document_values: HashMap<String, String>,
    script_engine: Option<Box<dyn ScriptEngine>>,
    next_id: usize,
}

impl std::fmt::Debug for FormContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormContainer")
            .field("fields", &self.fields.len())
            .field("groups", &self.groups.len())
            .field("document_values", &self.document_values.len())
            .field("script_engine", &self.script_engine.is_some())
            .finish()
    }
}

impl FormContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container holding `fields`, in order.
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut container = Self::new();
        for field in fields {
            container.add_form(field);
        }
        container
    }

    /// Number of fields (widgets, not groups).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values()
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(&id)
    }

    /// Group names in first-seen order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Every field named `name`. Empty if there are none.
    pub fn forms_with_name(&self, name: &str) -> Vec<&Field> {
        self.groups
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.fields.get(id)).collect())
            .unwrap_or_default()
    }

    /// Every field of type `field_type`.
    pub fn forms_with_type(&self, field_type: FieldType) -> Vec<&Field> {
        self.fields.values().filter(|f| f.field_type == field_type).collect()
    }

    /// The shared value of group `name`.
    pub fn value_for_name(&self, name: &str) -> Option<&str> {
        let first = self.groups.get(name)?.first()?;
        self.fields.get(first).map(Field::value)
    }

    /// Set `value` on every field named `name`. Returns how many changed hands.
    pub fn set_value(&mut self, value: &str, name: &str) -> usize {
        let ids = match self.groups.get(name) {
            Some(ids) => ids,
            None => {
                log::debug!("No form field named {:?}", name);
                return 0;
            },
        };
        let mut updated = 0;
        for id in ids {
            if let Some(field) = self.fields.get_mut(id) {
                field.value = value.to_string();
                updated += 1;
            }
        }
        updated
    }

    /// Add a field. A field joining an existing group takes the group's value.
    pub fn add_form(&mut self, mut field: Field) -> FieldId {
        let id = FieldId(self.next_id);
        self.next_id += 1;
        field.id = id;
        if let Some(value) = self.value_for_name(&field.name) {
            if field.value != value {
                log::debug!("Field {:?} joins its group with value {:?}", field.name, value);
                field.value = value.to_string();
            }
        }
        self.groups.entry(field.name.clone()).or_default().push(id);
        self.fields.insert(id, field);
        id
    }

    /// Remove a field. Sibling values are untouched; an emptied group goes away.
    pub fn remove_form(&mut self, id: FieldId) -> Option<Field> {
        let field = self.fields.shift_remove(&id)?;
        if let Some(ids) = self.groups.get_mut(&field.name) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.groups.shift_remove(&field.name);
            }
        }
        Some(field)
    }

    /// Set a document-level script variable.
    pub fn set_document_value(&mut self, value: &str, key: &str) {
        self.document_values.insert(key.to_string(), value.to_string());
    }

    /// A document-level script variable, `None` if never set.
    pub fn get_document_value(&self, key: &str) -> Option<&str> {
        self.document_values.get(key).map(String::as_str)
    }

    /// Attach the interpreter used by [`execute_js`](Self::execute_js).
    pub fn set_script_engine(&mut self, engine: Box<dyn ScriptEngine>) {
        self.script_engine = Some(engine);
    }

    /// Detach and return the interpreter.
    pub fn take_script_engine(&mut self) -> Option<Box<dyn ScriptEngine>> {
        self.script_engine.take()
    }

    pub fn has_script_engine(&self) -> bool {
        self.script_engine.is_some()
    }

    /// Run `script` to completion.
    ///
    /// The engine works through a [`ScriptBridge`]; its value changes go
    /// through [`set_value`](Self::set_value) and are visible as soon as
    /// they are made. Engine errors are returned as they come.
    pub fn execute_js(&mut self, script: &str) -> Result<()> {
        let mut engine = self.script_engine.take().ok_or(Error::NoScriptEngine)?;
        let result = {
            let mut bridge = ScriptBridge::new(self);
            engine.execute(script, &mut bridge)
        };
        self.script_engine = Some(engine);
        if let Err(e) = &result {
            log::warn!("Script failed: {}", e);
        }
        result
    }

    /// Value a group shows in exports: buttons only count when a member is checked.
    fn export_text(&self, name: &str) -> String {
        let members = self.forms_with_name(name);
        let value = members.first().map(|f| f.value().to_string()).unwrap_or_default();
        let is_button = members.iter().any(|f| f.field_type == FieldType::Button);
        if is_button && !members.iter().any(|f| f.is_checked()) {
            return String::new();
        }
        value
    }

    /// XML description of every group's value, nested by name.
    pub fn form_xml(&self) -> Result<String> {
        let values: Vec<(&str, String)> = self
            .groups
            .keys()
            .map(|name| (name.as_str(), self.export_text(name)))
            .collect();
        xml::groups_to_xml(values)
    }

    /// Field snapshots as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        let snapshots: Vec<FieldSnapshot> = self.fields.values().map(Field::snapshot).collect();
        Ok(serde_json::to_string_pretty(&snapshots)?)
    }

    /// Fields whose value differs from the document's.
    pub(crate) fn modified_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values().filter(|f| f.is_modified())
    }

    /// Record that the document now holds every field's current value.
    ///
    /// A cleared button was written as `/Off` and takes that value here, so
    /// it reads the same before and after a reload.
    pub(crate) fn mark_saved(&mut self) {
        for field in self.fields.values_mut() {
            if field.value_owner.is_none() {
                continue;
            }
            if field.is_modified() && field.field_type == FieldType::Button && field.value.is_empty() {
                field.value = "Off".to_string();
            }
            field.stored_value = Some(field.value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a FormContainer {
    type Item = &'a Field;
    type IntoIter = indexmap::map::Values<'a, FieldId, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.values()
    }
}
