//! PDF tokenizer.
//!
//! Splits raw PDF syntax into tokens with `nom`. Strings are handed back
//! undecoded (the parser owns escape handling), names are decoded here.
//!
//! Bare words (`true`, `obj`, `R`, `trailer`, ...) all come back as
//! [`Token::Keyword`]; the parser decides what they mean in context.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};

/// One lexical token.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// Contents of `( ... )`, escapes not yet decoded
    LiteralString(&'a [u8]),
    /// Contents of `< ... >`, digits not yet decoded
    HexString(&'a [u8]),
    /// Name without the leading `/`, `#XX` escapes decoded
    Name(String),
    /// Any bare word: `true`, `null`, `obj`, `endobj`, `stream`, `R`, ...
    Keyword(&'a [u8]),
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
}

impl Token<'_> {
    /// True if this token is the bare word `word`.
    pub fn is_keyword(&self, word: &[u8]) -> bool {
        matches!(self, Token::Keyword(k) if *k == word)
    }
}

/// PDF delimiter characters.
pub fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Regular characters: neither whitespace nor delimiters.
pub fn is_regular(byte: u8) -> bool {
    !crate::utility::is_pdf_whitespace(byte) && !is_delimiter(byte)
}

fn comment(input: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n'))(input)
}

/// Skip any run of whitespace and comments. Never fails.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let (after_ws, _) = take_while(crate::utility::is_pdf_whitespace)(rest)?;
        rest = after_ws;
        match comment(rest) {
            Ok((after_comment, _)) => rest = after_comment,
            Err(_) => return Ok((rest, ())),
        }
    }
}

fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;

    let number_error = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));
    let text = std::str::from_utf8(text).map_err(|_| number_error())?;

    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            return Ok((rest, Token::Integer(n)));
        }
    }
    // "5." and ".5" both parse with Rust's float grammar once normalized.
    let normalized = if text.ends_with('.') {
        format!("{}0", text)
    } else {
        text.to_string()
    };
    let real: f64 = normalized.parse().map_err(|_| number_error())?;
    Ok((rest, Token::Real(real)))
}

fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0usize;

    while pos < body.len() {
        match body[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[pos + 1..], Token::LiteralString(&body[..pos])));
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    let (rest, digits) = preceded(
        char('<'),
        take_while(|c: u8| c.is_ascii_hexdigit() || crate::utility::is_pdf_whitespace(c)),
    )(input)?;
    let (rest, _) = char('>')(rest)?;
    Ok((rest, Token::HexString(digits)))
}

/// Decode `#XX` escapes in raw name bytes. Malformed escapes are kept as written.
///
/// ```
/// # use pdf_forms::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), b"A B#C");
/// assert_eq!(decode_name_escapes(b"A#zz"), b"A#zz");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hi = crate::decoders::hex_value(raw[i + 1]);
            let lo = crate::decoders::hex_value(raw[i + 2]);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

/// First char of the private-use block that stands in for raw name bytes.
const RAW_BYTE_BASE: u32 = 0xF700;

fn raw_byte_char(c: char) -> Option<u8> {
    match c as u32 {
        code @ 0xF780..=0xF7FF => Some((code - RAW_BYTE_BASE) as u8),
        _ => None,
    }
}

/// Turn decoded name bytes into a `String`.
///
/// Valid UTF-8 is kept as text. Otherwise every byte above 0x7F becomes a
/// char in U+F780..U+F7FF, so [`name_to_bytes`] restores the exact bytes.
/// UTF-8 that itself contains those chars takes the byte route too.
pub fn name_from_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) if !s.chars().any(|c| raw_byte_char(c).is_some()) => s,
        Ok(s) => raw_bytes_to_name(s.as_bytes()),
        Err(e) => raw_bytes_to_name(e.as_bytes()),
    }
}

fn raw_bytes_to_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F => b as char,
            _ => char::from_u32(RAW_BYTE_BASE + u32::from(b)).unwrap_or(char::REPLACEMENT_CHARACTER),
        })
        .collect()
}

/// Bytes of a name as written in a file; the inverse of [`name_from_bytes`].
pub fn name_to_bytes(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for c in name.chars() {
        match raw_byte_char(c) {
            Some(b) => out.push(b),
            None => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            },
        }
    }
    out
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(preceded(char('/'), take_while(is_regular)), |raw: &[u8]| {
        Token::Name(name_from_bytes(decode_name_escapes(raw)))
    })(input)
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        map(tag(b"<<"), |_| Token::DictStart),
        map(tag(b">>"), |_| Token::DictEnd),
        map(char('['), |_| Token::ArrayStart),
        map(char(']'), |_| Token::ArrayEnd),
    ))(input)
}

fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(take_while1(is_regular), Token::Keyword)(input)
}

/// Skip leading whitespace/comments and read one token.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;
    alt((
        parse_delimiter,
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
        parse_keyword,
    ))(input)
}

/// Read tokens until the input is exhausted or no token matches.
pub fn tokens(input: &[u8]) -> IResult<&[u8], Vec<Token<'_>>> {
    many0(token)(input)
}
