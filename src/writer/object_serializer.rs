//! PDF object serialization.
//!
//! Turns primitive values back into PDF syntax. Output goes straight into a
//! `Vec<u8>`, so none of these writers can fail.

use crate::object::{Object, ObjectRef, PdfDict};
use std::io::Write;

/// Serializer for PDF objects.
///
/// The compact form is what gets spliced into documents. The spaced form puts
/// every dictionary entry on its own line and is meant for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    spaced: bool,
}

impl ObjectSerializer {
    /// Minimal whitespace.
    pub fn compact() -> Self {
        Self { spaced: false }
    }

    /// One dictionary entry per line.
    pub fn spaced() -> Self {
        Self { spaced: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Append `obj` to `out`.
    pub fn write_object(&self, out: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => out.extend_from_slice(b"null"),
            Object::Boolean(b) => self.write_bool(out, *b),
            Object::Integer(i) => self.write_integer(out, *i),
            Object::Real(r) => self.write_real(out, *r),
            Object::String(s) => self.write_string(out, s),
            Object::Name(n) => self.write_name(out, n),
            Object::Array(items) => {
                self.open_array(out);
                for (i, item) in items.iter().enumerate() {
                    self.array_separator(out, i);
                    self.write_object(out, item);
                }
                self.close_array(out);
            },
            Object::Dictionary(dict) => self.write_dictionary(out, dict),
            Object::Stream { dict, data } => {
                self.write_dictionary(out, dict);
                self.write_stream_body(out, data);
            },
            Object::Reference(r) => self.write_reference(out, *r),
        }
    }

    /// `true` / `false`.
    pub fn write_bool(&self, out: &mut Vec<u8>, value: bool) {
        out.extend_from_slice(if value { b"true" } else { b"false" });
    }

    /// Plain decimal integer.
    pub fn write_integer(&self, out: &mut Vec<u8>, value: i64) {
        out.extend_from_slice(value.to_string().as_bytes());
    }

    /// Real number with at most five decimals and no trailing zeros.
    ///
    /// ```
    /// # use pdf_forms::writer::ObjectSerializer;
    /// let mut out = Vec::new();
    /// ObjectSerializer::compact().write_real(&mut out, 0.50);
    /// assert_eq!(out, b"0.5");
    /// ```
    pub fn write_real(&self, out: &mut Vec<u8>, value: f64) {
        if !value.is_finite() {
            out.push(b'0');
            return;
        }
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        match trimmed {
            "-0" | "" => out.push(b'0'),
            text => out.extend_from_slice(text.as_bytes()),
        }
    }

    /// `N G R`.
    pub fn write_reference(&self, out: &mut Vec<u8>, reference: ObjectRef) {
        // Writes into a Vec cannot fail.
        let _ = write!(out, "{} {} R", reference.id, reference.gen);
    }

    /// Literal string when every byte is printable, hex string otherwise.
    pub fn write_string(&self, out: &mut Vec<u8>, data: &[u8]) {
        let printable = data
            .iter()
            .all(|&b| matches!(b, b'\n' | b'\r' | b'\t') || (0x20..=0x7E).contains(&b));

        if printable {
            out.push(b'(');
            for &byte in data {
                match byte {
                    b'(' => out.extend_from_slice(b"\\("),
                    b')' => out.extend_from_slice(b"\\)"),
                    b'\\' => out.extend_from_slice(b"\\\\"),
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    b'\t' => out.extend_from_slice(b"\\t"),
                    _ => out.push(byte),
                }
            }
            out.push(b')');
        } else {
            out.push(b'<');
            for byte in data {
                let _ = write!(out, "{:02X}", byte);
            }
            out.push(b'>');
        }
    }

    /// `/Name`, with `#XX` escapes for anything that is not a regular character.
    pub fn write_name(&self, out: &mut Vec<u8>, name: &str) {
        out.push(b'/');
        out.extend_from_slice(crate::utility::pdf_encoded_string(name).as_bytes());
    }

    /// Dictionary in insertion order.
    pub fn write_dictionary(&self, out: &mut Vec<u8>, dict: &PdfDict) {
        self.open_dictionary(out);
        for (key, value) in dict {
            self.dictionary_key(out, key);
            self.write_object(out, value);
        }
        self.close_dictionary(out, dict.is_empty());
    }

    /// `stream`, the raw bytes, `endstream`. The dictionary must already be written.
    pub fn write_stream_body(&self, out: &mut Vec<u8>, data: &[u8]) {
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\nendstream");
    }

    pub(crate) fn open_array(&self, out: &mut Vec<u8>) {
        out.push(b'[');
    }

    pub(crate) fn array_separator(&self, out: &mut Vec<u8>, index: usize) {
        if index > 0 {
            out.push(b' ');
        }
    }

    pub(crate) fn close_array(&self, out: &mut Vec<u8>) {
        out.push(b']');
    }

    pub(crate) fn open_dictionary(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"<<");
    }

    pub(crate) fn dictionary_key(&self, out: &mut Vec<u8>, key: &str) {
        if self.spaced {
            out.extend_from_slice(b"\n  ");
        }
        self.write_name(out, key);
        out.push(b' ');
    }

    pub(crate) fn close_dictionary(&self, out: &mut Vec<u8>, empty: bool) {
        if self.spaced && !empty {
            out.push(b'\n');
        }
        out.extend_from_slice(b">>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(obj: &Object) -> String {
        ObjectSerializer::compact().serialize_to_string(obj)
    }

    #[test]
    fn test_numbers() {
        assert_eq!(compact(&Object::Integer(-42)), "-42");
        assert_eq!(compact(&Object::Real(1.0)), "1");
        assert_eq!(compact(&Object::Real(2.125)), "2.125");
        assert_eq!(compact(&Object::Real(1.0 / 3.0)), "0.33333");
        assert_eq!(compact(&Object::Real(-0.000001)), "0");
    }

    #[test]
    fn test_name_escaping() {
        assert_eq!(compact(&Object::Name("Off".into())), "/Off");
        assert_eq!(compact(&Object::Name("A B#".into())), "/A#20B#23");
        assert_eq!(compact(&Object::Name("x/y".into())), "/x#2Fy");
    }

    #[test]
    fn test_literal_string_escaping() {
        assert_eq!(compact(&Object::String(b"a(b)\\c".to_vec())), r"(a\(b\)\\c)");
        assert_eq!(compact(&Object::String(b"line\n".to_vec())), r"(line\n)");
    }

    #[test]
    fn test_binary_string_uses_hex() {
        assert_eq!(compact(&Object::String(vec![0xFE, 0xFF, 0x00, 0x41])), "<FEFF0041>");
    }

    #[test]
    fn test_dictionary_keeps_insertion_order() {
        let mut dict = PdfDict::new();
        dict.insert("T".into(), Object::String(b"City".to_vec()));
        dict.insert("FT".into(), Object::Name("Tx".into()));
        dict.insert("Parent".into(), Object::Reference(ObjectRef::new(3, 0)));
        assert_eq!(compact(&Object::Dictionary(dict)), "<</T (City)/FT /Tx/Parent 3 0 R>>");
    }

    #[test]
    fn test_spaced_dictionary() {
        let mut dict = PdfDict::new();
        dict.insert("V".into(), Object::Integer(1));
        let text = ObjectSerializer::spaced().serialize_to_string(&Object::Dictionary(dict));
        assert_eq!(text, "<<\n  /V 1\n>>");
    }

    #[test]
    fn test_stream() {
        let mut dict = PdfDict::new();
        dict.insert("Length".into(), Object::Integer(2));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"hi"),
        };
        assert_eq!(compact(&obj), "<</Length 2>>\nstream\nhi\nendstream");
    }
}
