//! PDF output.
//!
//! ## Architecture
//!
//! ```text
//! FormContainer (dirty groups)
//!     ↓
//! [PdfDocument::save_forms_to_document_data] (value owners → EntryTarget)
//!     ↓
//! [SplicePlanner] (object header → entry span in the source text)
//!     ↓
//! [ObjectSerializer] (new value → PDF syntax)
//!     ↓
//! [apply_splices] (all edits or none)
//! ```

mod object_serializer;
mod splice;

pub use object_serializer::ObjectSerializer;
pub use splice::{apply_splices, EntryTarget, Splice, SplicePlanner};
