// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Forms
//!
//! Lazy PDF object model with AcroForm value synchronization.
//!
//! ## Core Features
//!
//! - **Lazy object graph**: dictionaries and arrays resolve their entries on
//!   first access; indirect objects are loaded once and shared
//! - **Typed navigation**: `PdfObject` with capability accessors, parent
//!   tracking and re-serialization into PDF syntax
//! - **Form fields**: fields grouped by fully qualified name, one value per
//!   group, mutually exclusive button groups
//! - **Scripting bridge**: a host-supplied script engine reads and writes
//!   field values through a narrow `ScriptHost` interface
//! - **In-place saving**: changed values are spliced into the original bytes;
//!   the rest of the file is left untouched
//! - **XML and JSON export** of form values
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_forms::PdfDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = PdfDocument::open("application.pdf")?;
//!
//! for field in doc.forms() {
//!     println!("{} = {:?}", field.name(), field.value());
//! }
//!
//! doc.forms_mut().set_value("Yes", "terms.accepted");
//! doc.save_forms_to_document_data()?;
//! doc.write_to_file("application-filled.pdf")?;
//! println!("{}", doc.form_xml()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 (<http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license (<http://opensource.org/licenses/MIT>)
//!
//! at your option.

// Error handling
pub mod error;

// Configuration
pub mod config;
/// Parser configuration options
pub mod parser_config;

// Core PDF parsing
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod resolver;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Lazy object graph
pub mod graph;

// Serialization and in-place edits
pub mod writer;

// Documents and forms
pub mod document;
pub mod forms;

/// Stateless helpers for PDF, URL and XML text
pub mod utility;

// Re-exports
pub use config::DocumentConfig;
pub use document::PdfDocument;
pub use error::{Error, Result};
pub use forms::{Field, FieldType, FormContainer, ScriptEngine, ScriptHost};
pub use graph::{NodeId, ObjectGraph, PdfObject};
pub use object::{Object, ObjectRef};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
