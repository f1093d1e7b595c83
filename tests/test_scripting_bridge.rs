//! Running scripts against a document's form values.

mod common;

use pdf_forms::forms::{ScriptEngine, ScriptHost};
use pdf_forms::{Error, PdfDocument, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// A tiny statement language standing in for a real interpreter.
///
/// One statement per line:
/// `name = 'text'` sets a field, `name = other` copies a field,
/// `doc.key = 'text'` sets a document value, `log name` records a value,
/// `fail` aborts.
#[derive(Default)]
struct Statements {
    log: Rc<RefCell<Vec<Option<String>>>>,
}

impl ScriptEngine for Statements {
    fn execute(&mut self, script: &str, host: &mut dyn ScriptHost) -> Result<()> {
        for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "fail" {
                return Err(Error::Script("fail statement".to_string()));
            }
            if let Some(name) = line.strip_prefix("log ") {
                let value = match name.strip_prefix("doc.") {
                    Some(key) => host.get_document_value(key),
                    None => host.get_field_value(name),
                };
                self.log.borrow_mut().push(value);
                continue;
            }
            let (target, source) = line
                .split_once(" = ")
                .ok_or_else(|| Error::Script(format!("cannot parse {:?}", line)))?;
            let value = match source.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                Some(literal) => literal.to_string(),
                None => host
                    .get_field_value(source)
                    .ok_or_else(|| Error::Script(format!("no field {}", source)))?,
            };
            match target.strip_prefix("doc.") {
                Some(key) => host.set_document_value(key, &value),
                None => {
                    if !host.set_field_value(target, &value) {
                        return Err(Error::Script(format!("no field {}", target)));
                    }
                },
            }
        }
        Ok(())
    }
}

fn load_with_engine() -> (PdfDocument, Rc<RefCell<Vec<Option<String>>>>) {
    let mut doc = PdfDocument::from_bytes(common::form_pdf()).expect("fixture loads");
    let engine = Statements::default();
    let log = Rc::clone(&engine.log);
    doc.forms_mut().set_script_engine(Box::new(engine));
    (doc, log)
}

#[test]
fn test_no_engine() {
    let mut doc = PdfDocument::from_bytes(common::form_pdf()).unwrap();
    assert!(matches!(doc.forms_mut().execute_js("x = 'y'"), Err(Error::NoScriptEngine)));
}

#[test]
fn test_script_reads_and_writes_groups() {
    let (mut doc, log) = load_with_engine();
    doc.forms_mut()
        .execute_js("log address.city\nphone = address.city\ncolor = 'Blue'\nlog phone")
        .unwrap();

    assert_eq!(
        *log.borrow(),
        vec![Some("Ndola".to_string()), Some("Ndola".to_string())]
    );
    assert!(doc.forms().forms_with_name("phone").iter().all(|f| f.value() == "Ndola"));
    let color: Vec<bool> = doc.forms().forms_with_name("color").iter().map(|f| f.is_checked()).collect();
    assert_eq!(color, vec![false, true]);
}

#[test]
fn test_unknown_field_reads_as_absent() {
    let (mut doc, log) = load_with_engine();
    doc.forms_mut().execute_js("log nothing\nlog doc.total").unwrap();
    assert_eq!(*log.borrow(), vec![None, None]);
}

#[test]
fn test_document_values() {
    let (mut doc, log) = load_with_engine();
    doc.forms_mut().execute_js("doc.total = '42'\nlog doc.total").unwrap();
    assert_eq!(doc.forms().get_document_value("total"), Some("42"));
    assert_eq!(*log.borrow(), vec![Some("42".to_string())]);

    doc.forms_mut().set_document_value("7", "total");
    doc.forms_mut().execute_js("log doc.total").unwrap();
    assert_eq!(log.borrow().last().cloned().flatten().as_deref(), Some("7"));
}

#[test]
fn test_engine_errors_propagate() {
    let (mut doc, _) = load_with_engine();
    let result = doc.forms_mut().execute_js("address.city = 'Kabwe'\nfail\nphone = '1'");
    assert!(matches!(result, Err(Error::Script(_))));
    assert_eq!(doc.forms().value_for_name("address.city"), Some("Kabwe"));
    assert_eq!(doc.forms().value_for_name("phone"), Some("555"));

    let result = doc.forms_mut().execute_js("missing = 'x'");
    assert!(matches!(result, Err(Error::Script(msg)) if msg.contains("missing")));
}

#[test]
fn test_script_changes_can_be_saved() {
    let (mut doc, _) = load_with_engine();
    doc.forms_mut().execute_js("address.zip = '10101'\nagree = 'Yes'").unwrap();
    doc.save_forms_to_document_data().unwrap();
    doc.refresh().unwrap();

    assert_eq!(doc.forms().value_for_name("address.zip"), Some("10101"));
    assert!(doc.forms().forms_with_name("agree")[0].is_checked());
}

#[test]
fn test_engine_survives_refresh() {
    let (mut doc, log) = load_with_engine();
    doc.refresh().unwrap();
    assert!(doc.forms().has_script_engine());
    doc.forms_mut().execute_js("log fruit").unwrap();
    assert_eq!(*log.borrow(), vec![Some("Pear".to_string())]);
}
