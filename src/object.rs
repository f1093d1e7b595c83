//! Primitive PDF values.
//!
//! `Object` is what the low-level parser hands back: a value exactly as it is
//! written in the file, with indirect references left unresolved. The lazy,
//! navigable view built on top of these values lives in [`crate::graph`].

use crate::decoders::DecodeParams;
use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;
use indexmap::IndexMap;

/// Dictionary of primitive values, in source order.
pub type PdfDict = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(PdfDict),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: PdfDict,
        /// Raw (still encoded) stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Primitive type tag, as reported by the primitive resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PrimitiveKind {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// Integer number
    Integer,
    /// Real number
    Real,
    /// `/Name`
    Name,
    /// Literal or hex string
    String,
    /// `[ ... ]`
    Array,
    /// `<< ... >>`
    Dictionary,
    /// Dictionary followed by `stream ... endstream`
    Stream,
    /// `N G R`
    Reference,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// The primitive tag of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Object::Null => PrimitiveKind::Null,
            Object::Boolean(_) => PrimitiveKind::Boolean,
            Object::Integer(_) => PrimitiveKind::Integer,
            Object::Real(_) => PrimitiveKind::Real,
            Object::String(_) => PrimitiveKind::String,
            Object::Name(_) => PrimitiveKind::Name,
            Object::Array(_) => PrimitiveKind::Array,
            Object::Dictionary(_) => PrimitiveKind::Dictionary,
            Object::Stream { .. } => PrimitiveKind::Stream,
            Object::Reference(_) => PrimitiveKind::Reference,
        }
    }

    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            PrimitiveKind::Null => "Null",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Integer => "Integer",
            PrimitiveKind::Real => "Real",
            PrimitiveKind::String => "String",
            PrimitiveKind::Name => "Name",
            PrimitiveKind::Array => "Array",
            PrimitiveKind::Dictionary => "Dictionary",
            PrimitiveKind::Stream => "Stream",
            PrimitiveKind::Reference => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&PdfDict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode stream data through the filters named in the stream dictionary.
    pub fn decode_stream_data(&self, options: &ParserOptions) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => decode_with_dict(dict, data, options),
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

/// Run `data` through the `/Filter` pipeline declared in `dict`.
pub(crate) fn decode_with_dict(dict: &PdfDict, data: &[u8], options: &ParserOptions) -> Result<Vec<u8>> {
    let filters = filter_names(dict);
    if filters.is_empty() {
        return Ok(data.to_vec());
    }
    let params = decode_params(dict.get("DecodeParms"));
    crate::decoders::decode_stream_with_options(data, &filters, params.as_ref(), options)
}

/// Filter names from a `/Filter` entry (single name or array of names).
pub(crate) fn filter_names(dict: &PdfDict) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Predictor parameters from a `/DecodeParms` entry.
pub(crate) fn decode_params(params_obj: Option<&Object>) -> Option<DecodeParams> {
    let dict = match params_obj? {
        Object::Dictionary(d) => d,
        Object::Array(arr) => arr.iter().find_map(|obj| obj.as_dict())?,
        _ => return None,
    };

    let int = |key: &str, default: i64| dict.get(key).and_then(Object::as_integer).unwrap_or(default);

    Some(DecodeParams {
        predictor: int("Predictor", 1),
        columns: int("Columns", 1).max(1) as usize,
        colors: int("Colors", 1).max(1) as usize,
        bits_per_component: int("BitsPerComponent", 8).max(1) as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kinds() {
        assert_eq!(Object::Null.kind(), PrimitiveKind::Null);
        assert_eq!(Object::Integer(3).kind(), PrimitiveKind::Integer);
        assert_eq!(Object::Name("Tx".into()).kind(), PrimitiveKind::Name);
        assert_eq!(Object::Reference(ObjectRef::new(1, 0)).kind(), PrimitiveKind::Reference);
    }

    #[test]
    fn test_stream_dict_access() {
        let mut dict = PdfDict::new();
        dict.insert("Length".to_string(), Object::Integer(4));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"abcd"),
        };
        assert_eq!(stream.as_dict().and_then(|d| d.get("Length")).and_then(Object::as_integer), Some(4));
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(12, 3).to_string(), "12 3 R");
    }

    #[test]
    fn test_decode_stream_without_filter() {
        let stream = Object::Stream {
            dict: PdfDict::new(),
            data: bytes::Bytes::from_static(b"plain"),
        };
        let decoded = stream.decode_stream_data(&ParserOptions::default()).unwrap();
        assert_eq!(decoded, b"plain");
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let err = Object::Integer(1)
            .decode_stream_data(&ParserOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidObjectType { .. }));
    }

    #[test]
    fn test_filter_names_array() {
        let mut dict = PdfDict::new();
        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![
                Object::Name("ASCIIHexDecode".into()),
                Object::Name("FlateDecode".into()),
            ]),
        );
        assert_eq!(filter_names(&dict), vec!["ASCIIHexDecode", "FlateDecode"]);
    }

    #[test]
    fn test_decode_params_defaults() {
        let mut parms = PdfDict::new();
        parms.insert("Predictor".to_string(), Object::Integer(12));
        parms.insert("Columns".to_string(), Object::Integer(4));
        let params = decode_params(Some(&Object::Dictionary(parms))).unwrap();
        assert_eq!(params.predictor, 12);
        assert_eq!(params.columns, 4);
        assert_eq!(params.colors, 1);
        assert_eq!(params.bits_per_component, 8);
    }
}
