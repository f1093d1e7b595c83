//! Form field values and metadata.

use crate::graph::NodeId;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Handle of a field inside its [`super::FormContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub(crate) usize);

/// Semantic field type, from `/FT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    /// No or unknown `/FT`
    #[default]
    None,
    /// `/Tx`
    Text,
    /// `/Btn`: check boxes, radio buttons, push buttons
    Button,
    /// `/Ch`: list and combo boxes
    Choice,
    /// `/Sig`
    Signature,
}

impl FieldType {
    /// Parse from the `/FT` name.
    pub fn from_pdf_name(name: Option<&str>) -> Self {
        match name {
            Some("Tx") => FieldType::Text,
            Some("Btn") => FieldType::Button,
            Some("Ch") => FieldType::Choice,
            Some("Sig") => FieldType::Signature,
            _ => FieldType::None,
        }
    }

    /// The `/FT` name, `None` for [`FieldType::None`].
    pub fn to_pdf_name(self) -> Option<&'static str> {
        match self {
            FieldType::None => None,
            FieldType::Text => Some("Tx"),
            FieldType::Button => Some("Btn"),
            FieldType::Choice => Some("Ch"),
            FieldType::Signature => Some("Sig"),
        }
    }
}

bitflags! {
    /// Field flags (`/Ff`).
    ///
    /// Bits from the common, button, text and choice tables share one
    /// set; which ones are meaningful depends on the field type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FieldFlags: u32 {
        /// Bit 1: user cannot change the value
        const READ_ONLY = 1 << 0;
        /// Bit 2: must have a value before submit
        const REQUIRED = 1 << 1;
        /// Bit 3: not exported by submit-form
        const NO_EXPORT = 1 << 2;

        /// Bit 13: multi-line text
        const MULTILINE = 1 << 12;
        /// Bit 14: password text
        const PASSWORD = 1 << 13;
        /// Bit 15: radio group cannot be switched off
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Bit 16: radio button
        const RADIO = 1 << 15;
        /// Bit 17: push button
        const PUSH_BUTTON = 1 << 16;
        /// Bit 18: combo box
        const COMBO = 1 << 17;
        /// Bit 19: editable combo box
        const EDIT = 1 << 18;
        /// Bit 20: sorted options
        const SORT = 1 << 19;
        /// Bit 22: multiple selection
        const MULTI_SELECT = 1 << 21;
        /// Bit 26: radios with the same export value turn on together
        const RADIOS_IN_UNISON = 1 << 25;
    }
}

/// One widget of a form field.
///
/// Several fields may share a name; they then form one group with one
/// logical value, kept in sync by the container.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) id: FieldId,
    pub(crate) name: String,
    pub(crate) partial_name: String,
    pub(crate) alternate_name: Option<String>,
    pub(crate) field_type: FieldType,
    pub(crate) flags: FieldFlags,
    pub(crate) value: String,
    pub(crate) stored_value: Option<String>,
    pub(crate) default_value: Option<String>,
    pub(crate) export_value: Option<String>,
    pub(crate) options: Vec<String>,
    pub(crate) rect: Option<[f64; 4]>,
    pub(crate) page_index: Option<usize>,
    pub(crate) backing_dictionary: Option<NodeId>,
    pub(crate) value_owner: Option<NodeId>,
}

impl Field {
    /// A field not backed by any document object.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let partial_name = name.rsplit('.').next().unwrap_or_default().to_string();
        Self {
            id: FieldId(0),
            name,
            partial_name,
            alternate_name: None,
            field_type,
            flags: FieldFlags::empty(),
            value: String::new(),
            stored_value: None,
            default_value: None,
            export_value: None,
            options: Vec::new(),
            rect: None,
            page_index: None,
            backing_dictionary: None,
            value_owner: None,
        }
    }

    /// Value a checked button contributes to its group.
    pub fn with_export_value(mut self, export_value: impl Into<String>) -> Self {
        self.export_value = Some(export_value.into());
        self
    }

    /// Initial value. Ignored when the field joins an existing group.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Fully qualified name, `.`-joined from the field tree.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This field's own `/T`.
    pub fn partial_name(&self) -> &str {
        &self.partial_name
    }

    /// `/TU`, the name shown to users.
    pub fn alternate_name(&self) -> Option<&str> {
        self.alternate_name.as_deref()
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Current value. Empty when the field has none.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn export_value(&self) -> Option<&str> {
        self.export_value.as_deref()
    }

    /// Display strings from `/Opt`.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Widget rectangle `[x1, y1, x2, y2]`.
    pub fn rect(&self) -> Option<[f64; 4]> {
        self.rect
    }

    /// Zero-based page the widget sits on.
    pub fn page_index(&self) -> Option<usize> {
        self.page_index
    }

    /// True when this button's export value is the group's value.
    pub fn is_checked(&self) -> bool {
        self.export_value.as_deref() == Some(self.value.as_str())
    }

    /// True when the value differs from what the document holds.
    pub fn is_modified(&self) -> bool {
        self.stored_value.as_deref() != Some(self.value.as_str())
    }

    /// Widget dictionary this field was read from.
    pub fn backing_dictionary(&self) -> Option<NodeId> {
        self.backing_dictionary
    }

    /// Terminal field dictionary that holds `/V`.
    pub fn value_owner(&self) -> Option<NodeId> {
        self.value_owner
    }

    /// Serializable copy of the field's state.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            name: self.name.clone(),
            field_type: self.field_type,
            value: self.value.clone(),
            export_value: self.export_value.clone(),
            checked: self.is_checked(),
            flags: self.flags.bits(),
            page_index: self.page_index,
        }
    }
}

/// Plain data view of a [`Field`], for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub field_type: FieldType,
    pub value: String,
    pub export_value: Option<String>,
    pub checked: bool,
    pub flags: u32,
    pub page_index: Option<usize>,
}
