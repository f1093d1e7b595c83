//! Bridge between form values and a host-supplied script engine.
//!
//! The engine never sees the object graph. It gets a [`ScriptHost`] with four
//! operations, and everything it changes through them is applied to the
//! container before [`super::FormContainer::execute_js`] returns.

use super::FormContainer;
use crate::error::Result;

/// What a running script may do to the document.
pub trait ScriptHost {
    /// Value of the field group `name`.
    fn get_field_value(&self, name: &str) -> Option<String>;

    /// Set the value of every field named `name`. False if there are none.
    fn set_field_value(&mut self, name: &str, value: &str) -> bool;

    /// Document-level script variable.
    fn get_document_value(&self, key: &str) -> Option<String>;

    /// Set a document-level script variable.
    fn set_document_value(&mut self, key: &str, value: &str);
}

/// A script interpreter.
///
/// `execute` blocks until the script is done; there is no timeout.
pub trait ScriptEngine {
    fn execute(&mut self, script: &str, host: &mut dyn ScriptHost) -> Result<()>;
}

/// The [`ScriptHost`] handed to engines, borrowing a container for one call.
pub struct ScriptBridge<'a> {
    container: &'a mut FormContainer,
}

impl<'a> ScriptBridge<'a> {
    pub(crate) fn new(container: &'a mut FormContainer) -> Self {
        Self { container }
    }
}

impl ScriptHost for ScriptBridge<'_> {
    fn get_field_value(&self, name: &str) -> Option<String> {
        self.container.value_for_name(name).map(str::to_string)
    }

    fn set_field_value(&mut self, name: &str, value: &str) -> bool {
        log::debug!("Script sets {} = {:?}", name, value);
        self.container.set_value(value, name) > 0
    }

    fn get_document_value(&self, key: &str) -> Option<String> {
        self.container.get_document_value(key).map(str::to_string)
    }

    fn set_document_value(&mut self, key: &str, value: &str) {
        self.container.set_document_value(value, key);
    }
}
