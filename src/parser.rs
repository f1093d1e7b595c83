//! PDF object parser.
//!
//! Recursive descent over [`crate::lexer`] tokens, producing primitive
//! [`Object`]s. Indirect references (`12 0 R`) are recognized with a
//! two-token lookahead after an integer; a dictionary directly followed by
//! the `stream` keyword becomes an [`Object::Stream`].

use crate::decoders::{AsciiHexDecoder, StreamDecoder};
use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Object, ObjectRef, PdfDict};
use nom::IResult;

/// Arrays and dictionaries nested deeper than this are rejected.
const MAX_NESTING: usize = 256;

fn nom_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode the escape sequences of a literal string body.
///
/// Handles the single-character escapes, `\ddd` octal codes, and
/// backslash line continuations. An unknown escape drops the backslash.
/// End-of-line sequences inside the string are normalized to `\n`.
///
/// ```
/// # use pdf_forms::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(br"a\(b\)\101"), b"a(b)A");
/// assert_eq!(decode_literal_string_escapes(b"line\\\nwrap"), b"linewrap");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let byte = raw[i];
        i += 1;
        match byte {
            b'\\' if i < raw.len() => {
                let escaped = raw[i];
                i += 1;
                match escaped {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'\r' => {
                        if raw.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    },
                    b'\n' => {},
                    b'0'..=b'7' => {
                        let mut code = u32::from(escaped - b'0');
                        for _ in 0..2 {
                            match raw.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    code = code * 8 + u32::from(d - b'0');
                                    i += 1;
                                },
                                _ => break,
                            }
                        }
                        out.push((code & 0xFF) as u8);
                    },
                    other => out.push(other),
                }
            },
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
                out.push(b'\n');
            },
            other => out.push(other),
        }
    }

    out
}

/// Decode the digits of a hex string body.
pub fn decode_hex(digits: &[u8]) -> Result<Vec<u8>> {
    AsciiHexDecoder.decode(digits).map_err(|e| Error::ParseError {
        offset: 0,
        reason: e.to_string(),
    })
}

/// Parse one object.
///
/// ```
/// use pdf_forms::object::Object;
/// use pdf_forms::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /T (City) /Kids [4 0 R] >>").unwrap();
/// let dict = obj.as_dict().unwrap();
/// assert_eq!(dict.get("T"), Some(&Object::String(b"City".to_vec())));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_nested(input, 0)
}

fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (rest, tok) = token(input)?;
    match tok {
        Token::Integer(n) => Ok(match parse_reference_tail(rest, n) {
            Some((after, reference)) => (after, Object::Reference(reference)),
            None => (rest, Object::Integer(n)),
        }),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(digits) => {
            let bytes = decode_hex(digits).map_err(|_| nom_error(input, nom::error::ErrorKind::HexDigit))?;
            Ok((rest, Object::String(bytes)))
        },
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => parse_array_body(rest, depth),
        Token::DictStart => {
            let (rest, dict) = parse_dict_body(rest, depth)?;
            match token(rest) {
                Ok((after_kw, kw)) if kw.is_keyword(b"stream") => {
                    let (after, data) = parse_stream_data(after_kw, &dict)?;
                    Ok((
                        after,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((rest, Object::Dictionary(dict))),
            }
        },
        Token::Keyword(b"true") => Ok((rest, Object::Boolean(true))),
        Token::Keyword(b"false") => Ok((rest, Object::Boolean(false))),
        Token::Keyword(b"null") => Ok((rest, Object::Null)),
        Token::Keyword(_) | Token::ArrayEnd | Token::DictEnd => {
            Err(nom_error(input, nom::error::ErrorKind::Tag))
        },
    }
}

/// After an integer `id`, try to read `gen R`.
fn parse_reference_tail(input: &[u8], id: i64) -> Option<(&[u8], ObjectRef)> {
    let (rest, gen) = match token(input) {
        Ok((rest, Token::Integer(gen))) => (rest, gen),
        _ => return None,
    };
    let (rest, kw) = token(rest).ok()?;
    if !kw.is_keyword(b"R") {
        return None;
    }
    let id = u32::try_from(id).ok()?;
    let gen = u16::try_from(gen).ok()?;
    Some((rest, ObjectRef::new(id, gen)))
}

fn parse_array_body(mut input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    loop {
        let (rest, _) = skip_ws(input)?;
        if let Some(after) = rest.strip_prefix(b"]") {
            return Ok((after, Object::Array(items)));
        }
        if rest.is_empty() {
            return Err(nom_error(rest, nom::error::ErrorKind::Eof));
        }
        let (rest, item) = parse_nested(rest, depth + 1)?;
        items.push(item);
        input = rest;
    }
}

fn parse_dict_body(mut input: &[u8], depth: usize) -> IResult<&[u8], PdfDict> {
    let mut dict = PdfDict::new();
    loop {
        let (rest, tok) = token(input)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_nested(rest, depth + 1)?;
                // A null value is equivalent to an absent entry.
                if !value.is_null() {
                    dict.insert(key, value);
                }
                input = rest;
            },
            _ => return Err(nom_error(input, nom::error::ErrorKind::Tag)),
        }
    }
}

fn parse_stream_data<'a>(input: &'a [u8], dict: &PdfDict) -> IResult<&'a [u8], Vec<u8>> {
    let body = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n").or_else(|| input.strip_prefix(b"\r")) {
        rest
    } else {
        log::warn!("No end-of-line after 'stream' keyword");
        input
    };

    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        if let Some(end) = usize::try_from(length).ok().filter(|&len| len <= body.len()) {
            let (after_data, _) = skip_ws(&body[end..])?;
            if let Ok((after, kw)) = token(after_data) {
                if kw.is_keyword(b"endstream") {
                    return Ok((after, body[..end].to_vec()));
                }
            }
        }
        log::warn!("Stream /Length {} does not reach 'endstream', scanning instead", length);
    }

    let pos = find_endstream(body).ok_or_else(|| nom_error(body, nom::error::ErrorKind::Eof))?;
    let mut data_end = pos;
    if body[..data_end].ends_with(b"\r\n") {
        data_end -= 2;
    } else if body[..data_end].ends_with(b"\n") || body[..data_end].ends_with(b"\r") {
        data_end -= 1;
    }
    Ok((&body[pos + b"endstream".len()..], body[..data_end].to_vec()))
}

fn find_endstream(input: &[u8]) -> Option<usize> {
    input.windows(b"endstream".len()).position(|w| w == b"endstream")
}

/// Parse an indirect object header `N G obj`.
pub fn parse_indirect_header(input: &[u8]) -> IResult<&[u8], ObjectRef> {
    let (rest, id) = token(input)?;
    let (rest, gen) = token(rest)?;
    let (rest, kw) = token(rest)?;
    match (id, gen) {
        (Token::Integer(id), Token::Integer(gen)) if kw.is_keyword(b"obj") => {
            let id = u32::try_from(id).map_err(|_| nom_error(input, nom::error::ErrorKind::Digit))?;
            let gen = u16::try_from(gen).map_err(|_| nom_error(input, nom::error::ErrorKind::Digit))?;
            Ok((rest, ObjectRef::new(id, gen)))
        },
        _ => Err(nom_error(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse `N G obj <object> endobj`. A missing `endobj` is tolerated.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, reference) = parse_indirect_header(input)?;
    let (rest, object) = parse_object(rest)?;
    let rest = match token(rest) {
        Ok((after, kw)) if kw.is_keyword(b"endobj") => after,
        _ => rest,
    };
    Ok((rest, (reference, object)))
}

/// Parse text that must hold exactly one object and nothing else.
pub fn parse_complete(text: &[u8]) -> Result<Object> {
    let (rest, object) = parse_object(text).map_err(|e| Error::ParseError {
        offset: 0,
        reason: format!("invalid object syntax: {:?}", e.map(|err| err.code)),
    })?;
    let (rest, _) = skip_ws(rest).map_err(|_| Error::UnexpectedEof)?;
    if !rest.is_empty() {
        return Err(Error::ParseError {
            offset: text.len() - rest.len(),
            reason: "trailing data after object".to_string(),
        });
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Scalars
    // ========================================================================

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_object(b"true").unwrap().1, Object::Boolean(true));
        assert_eq!(parse_object(b"null").unwrap().1, Object::Null);
        assert_eq!(parse_object(b"-3.25").unwrap().1, Object::Real(-3.25));
        assert_eq!(parse_object(b"/Tx").unwrap().1, Object::Name("Tx".into()));
    }

    #[test]
    fn test_integer_not_reference() {
        let (rest, obj) = parse_object(b"5 6 ]").unwrap();
        assert_eq!(obj, Object::Integer(5));
        assert_eq!(rest, b" 6 ]");
    }

    #[test]
    fn test_reference() {
        let (_, obj) = parse_object(b"12 0 R").unwrap();
        assert_eq!(obj, Object::Reference(ObjectRef::new(12, 0)));
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(parse_object(b"<48 69>").unwrap().1, Object::String(b"Hi".to_vec()));
    }

    #[test]
    fn test_literal_string_octal_and_eol() {
        assert_eq!(decode_literal_string_escapes(b"a\\0b"), vec![b'a', 0, b'b']);
        assert_eq!(decode_literal_string_escapes(b"a\r\nb"), b"a\nb");
        assert_eq!(decode_literal_string_escapes(br"\q"), b"q");
    }

    // ========================================================================
    // Containers
    // ========================================================================

    #[test]
    fn test_dictionary_keeps_order() {
        let (_, obj) = parse_object(b"<</Z 1 /A 2 /M 3>>").unwrap();
        let keys: Vec<&str> = obj.as_dict().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_dictionary_drops_null_values() {
        let (_, obj) = parse_object(b"<</A null /B 1>>").unwrap();
        assert_eq!(obj.as_dict().unwrap().len(), 1);
    }

    #[test]
    fn test_nested_array() {
        let (_, obj) = parse_object(b"[1 [2 3 0 R] (x)]").unwrap();
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(
            arr[1],
            Object::Array(vec![Object::Integer(2), Object::Reference(ObjectRef::new(3, 0))])
        );
    }

    #[test]
    fn test_unclosed_array_fails() {
        assert!(parse_object(b"[1 2").is_err());
    }

    #[test]
    fn test_dict_with_non_name_key_fails() {
        assert!(parse_object(b"<< 1 2 >>").is_err());
    }

    // ========================================================================
    // Streams and indirect objects
    // ========================================================================

    #[test]
    fn test_stream_with_length() {
        let (_, obj) = parse_object(b"<</Length 5>>\nstream\nhello\nendstream").unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"hello"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_with_wrong_length_scans() {
        let (_, obj) = parse_object(b"<</Length 99>>stream\r\nabc\r\nendstream").unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"abc"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_indirect_object() {
        let (rest, (reference, obj)) =
            parse_indirect_object(b"7 0 obj\n<</T (A)>>\nendobj\n8 0 obj").unwrap();
        assert_eq!(reference, ObjectRef::new(7, 0));
        assert!(obj.as_dict().is_some());
        assert_eq!(rest, b"\n8 0 obj");
    }

    #[test]
    fn test_parse_complete_rejects_trailing() {
        assert!(parse_complete(b"(a) (b)").is_err());
        assert_eq!(parse_complete(b"  42  ").unwrap(), Object::Integer(42));
    }

    #[test]
    fn test_excessive_nesting() {
        let deep = vec![b'['; MAX_NESTING + 10];
        assert!(parse_object(&deep).is_err());
    }
}
