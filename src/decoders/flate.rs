//! FlateDecode via `flate2`.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// zlib/deflate decompression.
///
/// Damaged streams are common in the wild, so a failed zlib read falls back
/// to raw deflate, then to raw deflate after skipping the two header bytes.
/// Whatever was decoded before an error is kept.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) if !output.is_empty() => {
                log::warn!("FlateDecode partial recovery: kept {} bytes ({})", output.len(), e);
                return Ok(output);
            },
            Err(e) => e,
        };

        log::debug!("zlib decode failed ({}), trying raw deflate", zlib_err);
        let candidates: [&[u8]; 2] = [input, input.get(2..).unwrap_or(&[])];
        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }
            output.clear();
            match DeflateDecoder::new(candidate).read_to_end(&mut output) {
                Ok(_) if !output.is_empty() => return Ok(output),
                Err(_) if !output.is_empty() => {
                    log::warn!("Raw deflate partial recovery: kept {} bytes", output.len());
                    return Ok(output);
                },
                _ => {},
            }
        }

        Err(Error::Decode(format!("FlateDecode: {}", zlib_err)))
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}
