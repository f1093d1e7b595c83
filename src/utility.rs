//! Stateless helpers for PDF text, names and URL/XML escaping.
//!
//! ```
//! use pdf_forms::utility::{pdf_encoded_string, replace_whitespace_with_single_space};
//!
//! assert_eq!(pdf_encoded_string("Last Name"), "Last#20Name");
//! assert_eq!(replace_whitespace_with_single_space("a \r\n\t b % note\nc"), "a b c");
//! ```

use crate::object::PrimitiveKind;
use crate::writer::ObjectSerializer;

/// The six PDF whitespace bytes: NUL, TAB, LF, FF, CR and space.
pub const PDF_WHITESPACE: [u8; 6] = [0x00, 0x09, 0x0A, 0x0C, 0x0D, 0x20];

/// True for a PDF whitespace byte.
pub fn is_pdf_whitespace(byte: u8) -> bool {
    PDF_WHITESPACE.contains(&byte)
}

/// PDFDocEncoding code points 0x80..=0x9E. 0x9F is undefined.
const PDFDOC_HIGH: [char; 31] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}',
];

fn pdfdoc_char(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9E => Some(PDFDOC_HIGH[(byte - 0x80) as usize]),
        0x9F => None,
        _ => Some(byte as char),
    }
}

fn pdfdoc_byte(c: char) -> Option<u8> {
    match c as u32 {
        code @ (0x00..=0x7F | 0xA0..=0xFF) => Some(code as u8),
        _ => PDFDOC_HIGH.iter().position(|&high| high == c).map(|i| 0x80 + i as u8),
    }
}

/// Decode a PDF text string: UTF-16BE when it starts with a byte order
/// mark, PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().filter_map(|&b| pdfdoc_char(b)).collect()
}

/// Encode text as a PDF text string: PDFDocEncoding when every character
/// has a code, UTF-16BE with a byte order mark otherwise.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if let Some(bytes) = text.chars().map(pdfdoc_byte).collect::<Option<Vec<u8>>>() {
        // "þÿ" would read back as a byte order mark.
        if !bytes.starts_with(&[0xFE, 0xFF]) {
            return bytes;
        }
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Escape a name body with `#XX`.
///
/// Printable ASCII other than delimiters and `#` is kept; everything else,
/// including whitespace and each byte of a non-ASCII character, is escaped.
/// Names read from a file with bytes that are not UTF-8 escape those
/// original bytes.
pub fn pdf_encoded_string(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in crate::lexer::name_to_bytes(name) {
        let keep = (0x21..=0x7E).contains(&byte) && byte != b'#' && !crate::lexer::is_delimiter(byte);
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("#{:02X}", byte));
        }
    }
    out
}

/// PDF syntax for `value` read as `kind`.
///
/// `None` when the text is not a valid value of that kind, or the kind has
/// no textual form (arrays, dictionaries, streams...).
///
/// ```
/// use pdf_forms::object::PrimitiveKind;
/// use pdf_forms::utility::pdf_object_representation;
///
/// assert_eq!(pdf_object_representation("Yes", PrimitiveKind::Name).as_deref(), Some("/Yes"));
/// assert_eq!(pdf_object_representation("2.50", PrimitiveKind::Real).as_deref(), Some("2.5"));
/// assert_eq!(pdf_object_representation("abc", PrimitiveKind::Integer), None);
/// ```
pub fn pdf_object_representation(value: &str, kind: PrimitiveKind) -> Option<String> {
    let serializer = ObjectSerializer::compact();
    let mut out = Vec::new();
    match kind {
        PrimitiveKind::Name => serializer.write_name(&mut out, value),
        PrimitiveKind::String => serializer.write_string(&mut out, &encode_text_string(value)),
        PrimitiveKind::Integer => serializer.write_integer(&mut out, value.trim().parse().ok()?),
        PrimitiveKind::Real => {
            let real: f64 = value.trim().parse().ok()?;
            if !real.is_finite() {
                return None;
            }
            serializer.write_real(&mut out, real)
        },
        PrimitiveKind::Boolean => match value.trim() {
            "true" => serializer.write_bool(&mut out, true),
            "false" => serializer.write_bool(&mut out, false),
            _ => return None,
        },
        _ => return None,
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

/// Collapse every run of PDF whitespace and `%` comments into one space.
pub fn replace_whitespace_with_single_space(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut in_comment = false;
    for c in text.chars() {
        if in_comment {
            if c == '\r' || c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if c == '%' {
            in_comment = true;
            pending_space = true;
        } else if c.is_ascii() && is_pdf_whitespace(c as u8) {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    if pending_space {
        out.push(' ');
    }
    out
}

fn percent_encode(text: &str, keep: impl Fn(u8) -> bool, keep_non_ascii: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let kept = if c.is_ascii() { keep(c as u8) } else { keep_non_ascii };
        if kept {
            out.push(c);
            continue;
        }
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn url_encode(text: &str) -> String {
    percent_encode(
        text,
        |b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'),
        false,
    )
}

/// Undo `%XX` escapes and turn `+` into a space. Malformed escapes are kept.
pub fn decode_url_encoded(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hi = crate::decoders::hex_value(bytes[i + 1]);
                let lo = crate::decoders::hex_value(bytes[i + 2]);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                        continue;
                    },
                    _ => out.push(b'%'),
                }
            },
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode only what would break XML markup, plus `%` and controls.
pub fn url_encode_xml(text: &str) -> String {
    percent_encode(
        text,
        |b| !matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'' | b'%') && !b.is_ascii_control(),
        true,
    )
}

/// Escape XML special characters.
pub fn xml_escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_set() {
        for b in PDF_WHITESPACE {
            assert!(is_pdf_whitespace(b));
        }
        assert!(!is_pdf_whitespace(b'a'));
        assert!(!is_pdf_whitespace(0x0B));
    }

    // ========================================================================
    // Text strings
    // ========================================================================

    #[test]
    fn test_decode_pdfdoc() {
        assert_eq!(decode_text_string(b"Caf\xE9 \x84 ok"), "Café — ok");
        assert_eq!(decode_text_string(b"\x8Dq\x8E"), "\u{201C}q\u{201D}");
    }

    #[test]
    fn test_decode_utf16() {
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x41, 0x04, 0x16]), "AЖ");
    }

    #[test]
    fn test_encode_prefers_pdfdoc() {
        assert_eq!(encode_text_string("Café"), b"Caf\xE9".to_vec());
        assert_eq!(encode_text_string("a\u{2014}b"), b"a\x84b".to_vec());
        assert_eq!(encode_text_string("Ж"), vec![0xFE, 0xFF, 0x04, 0x16]);
    }

    #[test]
    fn test_text_round_trip() {
        for text in ["Lusaka", "Zoë", "日本", "\u{2122} mark"] {
            assert_eq!(decode_text_string(&encode_text_string(text)), text);
        }
    }

    // ========================================================================
    // Names and representations
    // ========================================================================

    #[test]
    fn test_pdf_encoded_string() {
        assert_eq!(pdf_encoded_string("A B#"), "A#20B#23");
        assert_eq!(pdf_encoded_string("x/y(z)"), "x#2Fy#28z#29");
        assert_eq!(pdf_encoded_string("é"), "#C3#A9");
        assert_eq!(pdf_encoded_string("Plain.Name-1"), "Plain.Name-1");
    }

    #[test]
    fn test_object_representation() {
        assert_eq!(pdf_object_representation("Off", PrimitiveKind::Name).as_deref(), Some("/Off"));
        assert_eq!(
            pdf_object_representation("a(b)", PrimitiveKind::String).as_deref(),
            Some("(a\\(b\\))")
        );
        assert_eq!(pdf_object_representation(" 42 ", PrimitiveKind::Integer).as_deref(), Some("42"));
        assert_eq!(pdf_object_representation("1.0", PrimitiveKind::Real).as_deref(), Some("1"));
        assert_eq!(pdf_object_representation("true", PrimitiveKind::Boolean).as_deref(), Some("true"));
        assert_eq!(pdf_object_representation("yes", PrimitiveKind::Boolean), None);
        assert_eq!(pdf_object_representation("x", PrimitiveKind::Dictionary), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(replace_whitespace_with_single_space("  a\t\tb  "), " a b ");
        assert_eq!(replace_whitespace_with_single_space("x%comment"), "x ");
        assert_eq!(replace_whitespace_with_single_space("x %c\r\n y"), "x y");
    }

    // ========================================================================
    // URL and XML
    // ========================================================================

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("a b&c~"), "a%20b%26c~");
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_decode_url_encoded() {
        assert_eq!(decode_url_encoded("a%20b+c"), "a b c");
        assert_eq!(decode_url_encoded("%C3%A9"), "é");
        assert_eq!(decode_url_encoded("100%"), "100%");
        assert_eq!(decode_url_encoded("%zz%4"), "%zz%4");
    }

    #[test]
    fn test_url_encode_xml() {
        assert_eq!(url_encode_xml("a<b> & 'c' 5%\n"), "a%3Cb%3E %26 %27c%27 5%25%0A");
        assert_eq!(url_encode_xml("plain text/é"), "plain text/é");
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
