//! Form discovery and value groups on a real document.

mod common;

use pdf_forms::forms::{Field, FieldFlags, FieldType};
use pdf_forms::PdfDocument;

fn load() -> PdfDocument {
    PdfDocument::from_bytes(common::form_pdf()).expect("fixture loads")
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_every_widget_is_discovered() {
    let doc = load();
    let forms = doc.forms();
    assert_eq!(forms.len(), 8);
    let names: Vec<&str> = forms.group_names().collect();
    assert_eq!(names, vec!["address.city", "address.zip", "color", "agree", "fruit", "phone"]);
}

#[test]
fn test_values_and_types() {
    let doc = load();
    let forms = doc.forms();
    assert_eq!(forms.value_for_name("address.city"), Some("Ndola"));
    assert_eq!(forms.value_for_name("address.zip"), Some(""));
    assert_eq!(forms.value_for_name("color"), Some("Red"));
    assert_eq!(forms.value_for_name("agree"), Some("Off"));
    assert_eq!(forms.value_for_name("fruit"), Some("Pear"));
    assert_eq!(forms.value_for_name("phone"), Some("555"));

    assert_eq!(forms.forms_with_type(FieldType::Text).len(), 4);
    assert_eq!(forms.forms_with_type(FieldType::Button).len(), 3);
    assert_eq!(forms.forms_with_type(FieldType::Choice).len(), 1);
    assert!(forms.forms_with_type(FieldType::Signature).is_empty());
}

#[test]
fn test_field_metadata() {
    let doc = load();
    let forms = doc.forms();

    let city = forms.forms_with_name("address.city")[0];
    assert_eq!(city.partial_name(), "city");
    assert_eq!(city.alternate_name(), Some("City of residence"));
    assert_eq!(city.rect(), Some([10.0, 10.0, 200.0, 30.0]));
    assert_eq!(city.page_index(), Some(0));

    let zip = forms.forms_with_name("address.zip")[0];
    assert!(zip.flags().contains(FieldFlags::MULTILINE));

    let color = forms.forms_with_name("color")[0];
    assert!(color.flags().contains(FieldFlags::RADIO | FieldFlags::NO_TOGGLE_TO_OFF));

    let fruit = forms.forms_with_name("fruit")[0];
    assert!(fruit.flags().contains(FieldFlags::COMBO));
    assert_eq!(fruit.options(), ["Apple".to_string(), "Pear".to_string()]);
}

#[test]
fn test_page_index_from_annots_or_parent_page() {
    let doc = load();
    let phone = doc.forms().forms_with_name("phone");
    assert_eq!(phone.len(), 2);
    assert_eq!(phone[0].page_index(), Some(0));
    assert_eq!(phone[1].page_index(), Some(0));
}

#[test]
fn test_widgets_share_value_owner() {
    let doc = load();
    let color = doc.forms().forms_with_name("color");
    assert_eq!(color[0].value_owner(), color[1].value_owner());
    assert_ne!(color[0].backing_dictionary(), color[1].backing_dictionary());

    let owner = color[0].value_owner().unwrap();
    assert_eq!(doc.objects().object_number(owner).unwrap(), Some(8));
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn test_radio_group_is_mutually_exclusive() {
    let mut doc = load();
    let checked = |doc: &PdfDocument| -> Vec<bool> {
        doc.forms().forms_with_name("color").iter().map(|f| f.is_checked()).collect()
    };
    assert_eq!(checked(&doc), vec![true, false]);

    assert_eq!(doc.forms_mut().set_value("Blue", "color"), 2);
    assert_eq!(checked(&doc), vec![false, true]);

    doc.forms_mut().set_value("Off", "color");
    assert_eq!(checked(&doc), vec![false, false]);
}

#[test]
fn test_check_box_exports() {
    let mut doc = load();
    let agree = doc.forms().forms_with_name("agree")[0];
    assert_eq!(agree.export_value(), Some("Yes"));
    assert!(!agree.is_checked());

    doc.forms_mut().set_value("Yes", "agree");
    assert!(doc.forms().forms_with_name("agree")[0].is_checked());
}

#[test]
fn test_set_value_reaches_every_widget() {
    let mut doc = load();
    doc.forms_mut().set_value("555-0199", "phone");
    assert!(doc
        .forms()
        .forms_with_name("phone")
        .iter()
        .all(|f| f.value() == "555-0199" && f.is_modified()));
    assert!(!doc.forms().forms_with_name("fruit")[0].is_modified());
}

#[test]
fn test_add_and_remove_forms() {
    let mut doc = load();
    let id = doc.forms_mut().add_form(Field::new("phone", FieldType::Text));
    assert_eq!(doc.forms().get(id).unwrap().value(), "555");
    assert_eq!(doc.forms().forms_with_name("phone").len(), 3);

    let removed = doc.forms_mut().remove_form(id).unwrap();
    assert_eq!(removed.name(), "phone");
    assert_eq!(doc.forms().forms_with_name("phone").len(), 2);
    assert_eq!(doc.forms().value_for_name("phone"), Some("555"));
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_form_xml() {
    let doc = load();
    let xml = doc.form_xml().unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<city>Ndola</city>"));
    assert!(xml.contains("<zip/>"));
    assert!(xml.contains("<color>Red</color>"));
    assert!(xml.contains("<agree/>"));
    assert!(xml.contains("<fruit>Pear</fruit>"));

    let re = regex::Regex::new(r"(?s)<address>\s*<city>Ndola</city>\s*<zip/>\s*</address>").unwrap();
    assert!(re.is_match(&xml), "unexpected nesting:\n{}", xml);
}

#[test]
fn test_form_xml_follows_changes() {
    let mut doc = load();
    doc.forms_mut().set_value("Tom & Jerry", "address.city");
    doc.forms_mut().set_value("Green", "color");
    let xml = doc.form_xml().unwrap();
    assert!(xml.contains("<city>Tom &amp; Jerry</city>"));
    assert!(xml.contains("<color/>"));
}

#[test]
fn test_to_json() {
    let doc = load();
    let json: serde_json::Value = serde_json::from_str(&doc.forms().to_json().unwrap()).unwrap();
    let fields = json.as_array().unwrap();
    assert_eq!(fields.len(), 8);
    assert_eq!(fields[0]["name"], "address.city");
    assert_eq!(fields[0]["value"], "Ndola");
    assert_eq!(fields[2]["checked"], true);
    assert_eq!(fields[3]["checked"], false);
}
