//! Stream filters.
//!
//! Only the filters that can carry form-related structure are supported:
//! `FlateDecode` (object streams, cross-reference streams) and
//! `ASCIIHexDecode`, with PNG/TIFF predictors applied after the last filter.
//! Anything else is reported as [`Error::UnsupportedFilter`]; callers that
//! only need to know a stream *is* filtered never decode it.

use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;

mod ascii_hex;
mod flate;
mod predictor;

pub use ascii_hex::AsciiHexDecoder;
pub(crate) use ascii_hex::hex_value;
pub use flate::FlateDecoder;
pub use predictor::{decode_predictor, DecodeParams};

/// One PDF stream filter.
pub trait StreamDecoder {
    /// Decode `input`.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as written after `/Filter`.
    fn name(&self) -> &str;
}

/// Look a decoder up by filter name, accepting the standard abbreviations.
pub fn decoder_for(name: &str) -> Option<Box<dyn StreamDecoder>> {
    match name {
        "FlateDecode" | "Fl" => Some(Box::new(FlateDecoder)),
        "ASCIIHexDecode" | "AHx" => Some(Box::new(AsciiHexDecoder)),
        _ => None,
    }
}

/// Run `data` through `filters` in order, then undo any predictor.
///
/// Decompression-bomb limits come from `options`; a limit of zero disables
/// that check.
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
    options: &ParserOptions,
) -> Result<Vec<u8>> {
    let encoded_len = data.len().max(1) as u64;
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder =
            decoder_for(filter_name).ok_or_else(|| Error::UnsupportedFilter(filter_name.clone()))?;
        current = decoder.decode(&current)?;
        log::debug!("{} produced {} bytes", decoder.name(), current.len());

        if options.max_decompression_ratio > 0 {
            let ratio = current.len() as u64 / encoded_len;
            if ratio > u64::from(options.max_decompression_ratio) {
                return Err(Error::Decode(format!(
                    "decompression ratio {}:1 exceeds limit {}:1",
                    ratio, options.max_decompression_ratio
                )));
            }
        }
        if options.max_decompressed_size > 0 && current.len() > options.max_decompressed_size {
            return Err(Error::Decode(format!(
                "decoded size {} bytes exceeds limit {} bytes",
                current.len(),
                options.max_decompressed_size
            )));
        }
    }

    match params {
        Some(params) if params.predictor > 1 => decode_predictor(&current, params),
        _ => Ok(current),
    }
}
