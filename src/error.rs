//! Error types for the PDF object model.
//!
//! Lookup misses and type mismatches are not errors in this crate: accessors
//! report them as `Ok(None)`. Everything that reaches this enum is either a
//! hard failure of the underlying file, a misuse of the object graph, or a
//! save that cannot be carried out safely.

use crate::object::ObjectRef;

/// Result type alias for PDF library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, navigating or saving a document.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// A container entry was requested while it was already being resolved
    #[error("Re-entrant resolution of entry '{0}'")]
    ReentrantResolution(String),

    /// A node handle was issued by a graph that has since been refreshed or discarded
    #[error("Stale object handle: the document was refreshed after this handle was issued")]
    StaleHandle,

    /// Form values cannot be written back textually
    #[error("Cannot save form data: {0}")]
    UnsupportedSave(String),

    /// Operation intentionally left unimplemented
    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    /// Bundled resource could not be found on the resource search path
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// `execute_js` was called without an attached script engine
    #[error("No script engine attached to the form container")]
    NoScriptEngine,

    /// Failure reported by a script engine
    #[error("Script error: {0}")]
    Script(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML output error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
