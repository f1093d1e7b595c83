//! ASCIIHexDecode.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// Pairs of hex digits, whitespace ignored, terminated by `>`.
/// A trailing odd digit is completed with `0`.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut pending: Option<u8> = None;

        for &byte in input {
            if byte == b'>' {
                break;
            }
            if crate::utility::is_pdf_whitespace(byte) {
                continue;
            }
            let nibble = hex_value(byte).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", byte as char))
            })?;
            match pending.take() {
                Some(high) => output.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }
        if let Some(high) = pending {
            output.push(high << 4);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

pub(crate) fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
