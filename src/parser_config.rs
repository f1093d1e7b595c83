//! Parser options controlling recovery behavior and resource limits.

use serde::{Deserialize, Serialize};

/// Parser options for controlling error handling and recovery behavior.
///
/// Lenient parsing is the default: object headers are searched for when the
/// cross-reference table points at the wrong byte, and streams with a wrong
/// `/Length` fall back to scanning for `endstream`.
///
/// # Example
///
/// ```
/// use pdf_forms::parser_config::ParserOptions;
///
/// let strict = ParserOptions::strict();
/// assert!(strict.strict);
///
/// let custom = ParserOptions {
///     max_recursion_depth: 32,
///     ..ParserOptions::lenient()
/// };
/// assert!(!custom.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Fail on the first malformation instead of attempting recovery.
    pub strict: bool,

    /// Maximum nesting of arrays and dictionaries accepted while walking trees
    /// (page tree, field tree).
    pub max_nesting: usize,

    /// Maximum depth of chained indirect-object loads.
    pub max_recursion_depth: u32,

    /// Maximum decompression ratio (decoded:encoded). 0 disables the check.
    pub max_decompression_ratio: u32,

    /// Maximum decoded stream size in bytes. 0 disables the check.
    pub max_decompressed_size: usize,

    /// Accept streams whose `/Length` is missing or wrong.
    pub allow_malformed_streams: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: fail on any parsing error.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_nesting: 100,
            max_recursion_depth: 100,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            allow_malformed_streams: false,
        }
    }

    /// Lenient mode: recover from stale offsets and malformed streams.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            max_recursion_depth: 100,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024,
            allow_malformed_streams: true,
        }
    }

    /// Very lenient mode: higher limits for heavily damaged files.
    pub fn very_lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 200,
            max_recursion_depth: 200,
            max_decompression_ratio: 0,
            max_decompressed_size: 200 * 1024 * 1024,
            allow_malformed_streams: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let opts = ParserOptions::strict();
        assert!(opts.strict);
        assert!(!opts.allow_malformed_streams);
    }

    #[test]
    fn test_lenient_is_default() {
        assert_eq!(ParserOptions::default(), ParserOptions::lenient());
    }

    #[test]
    fn test_very_lenient_disables_ratio() {
        let opts = ParserOptions::very_lenient();
        assert_eq!(opts.max_decompression_ratio, 0);
        assert!(opts.max_recursion_depth > ParserOptions::lenient().max_recursion_depth);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let opts: ParserOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(opts.strict);
        assert_eq!(opts.max_nesting, 100);
    }
}
