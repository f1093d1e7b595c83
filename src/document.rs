//! PDF document model.

use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use crate::forms::{discover_fields, Field, FieldType, FormContainer};
use crate::graph::{ChildKey, NodeId, ObjectGraph};
use crate::object::{Object, ObjectRef};
use crate::resolver::BufferResolver;
use crate::utility::encode_text_string;
use crate::writer::{apply_splices, EntryTarget, SplicePlanner};
use bytes::Bytes;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Name given to documents that were not read from a file.
const UNNAMED: &str = "untitled";

/// PDF document.
///
/// Owns the raw bytes of the file, an [`ObjectGraph`] over a snapshot of
/// those bytes, and the [`FormContainer`] discovered from the catalog.
/// Form values are written back with
/// [`save_forms_to_document_data`](Self::save_forms_to_document_data),
/// which edits the bytes in place; [`refresh`](Self::refresh) re-reads them.
///
/// # Example
///
/// ```no_run
/// use pdf_forms::document::PdfDocument;
///
/// let mut doc = PdfDocument::open("application.pdf")?;
/// doc.forms_mut().set_value("Lusaka", "address.city");
/// doc.save_forms_to_document_data()?;
/// doc.write_to_file("application-filled.pdf")?;
/// # Ok::<(), pdf_forms::error::Error>(())
/// ```
pub struct PdfDocument {
    data: Bytes,
    path: Option<PathBuf>,
    pdf_name: String,
    config: DocumentConfig,
    version: String,
    graph: ObjectGraph,
    catalog: NodeId,
    info: Option<NodeId>,
    pages: Vec<NodeId>,
    forms: FormContainer,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pdf_name", &self.pdf_name)
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("pages", &self.pages.len())
            .field("forms", &self.forms)
            .finish()
    }
}

/// Everything derived from one snapshot of the buffer.
struct Snapshot {
    version: String,
    graph: ObjectGraph,
    catalog: NodeId,
    info: Option<NodeId>,
    pages: Vec<NodeId>,
    forms: FormContainer,
}

impl PdfDocument {
    /// Load a document from memory with the default configuration.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_config(data, DocumentConfig::default())
    }

    pub fn from_bytes_with_config(data: Vec<u8>, config: DocumentConfig) -> Result<Self> {
        Self::load(Bytes::from(data), None, UNNAMED.to_string(), config)
    }

    /// Open a PDF file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdf_forms::document::PdfDocument;
    ///
    /// let doc = PdfDocument::open("sample.pdf")?;
    /// println!("{} pages", doc.number_of_pages());
    /// # Ok::<(), pdf_forms::error::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, DocumentConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: DocumentConfig) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNNAMED.to_string());
        log::info!("Opening {} ({} bytes)", path.display(), data.len());
        Self::load(Bytes::from(data), Some(path.to_path_buf()), name, config)
    }

    /// Open a document found on the configured resource search path.
    ///
    /// `name` is tried as given and then with a `.pdf` extension.
    pub fn from_resource(name: &str) -> Result<Self> {
        Self::from_resource_with_config(name, DocumentConfig::default())
    }

    pub fn from_resource_with_config(name: &str, config: DocumentConfig) -> Result<Self> {
        let path = config.locate_resource(name)?;
        let mut doc = Self::open_with_config(path, config)?;
        doc.pdf_name = name.to_string();
        Ok(doc)
    }

    fn load(data: Bytes, path: Option<PathBuf>, pdf_name: String, config: DocumentConfig) -> Result<Self> {
        let snapshot = Self::read_snapshot(&data, &config)?;
        Ok(Self {
            data,
            path,
            pdf_name,
            config,
            version: snapshot.version,
            graph: snapshot.graph,
            catalog: snapshot.catalog,
            info: snapshot.info,
            pages: snapshot.pages,
            forms: snapshot.forms,
        })
    }

    fn read_snapshot(data: &Bytes, config: &DocumentConfig) -> Result<Snapshot> {
        let resolver = BufferResolver::new(data.clone(), config.parser)?;
        let version = resolver.version().to_string();
        let mut graph = ObjectGraph::new(Box::new(resolver));

        let catalog = match graph.trailer_entry("Root")? {
            Some(root) if graph.object(root)?.as_dictionary().is_some() => root,
            _ => {
                log::error!("Trailer has no usable /Root");
                return Err(Error::InvalidPdf("trailer has no /Root catalog dictionary".to_string()));
            },
        };
        let info = match graph.trailer_entry("Info")? {
            Some(info) if graph.object(info)?.as_dictionary().is_some() => Some(info),
            _ => None,
        };
        let pages = collect_pages(&mut graph, catalog)?;
        let forms = FormContainer::from_fields(discover_fields(&mut graph, catalog, &pages)?);

        log::info!("Loaded PDF {}: {} pages, {} form widgets", version, pages.len(), forms.len());
        Ok(Snapshot {
            version,
            graph,
            catalog,
            info,
            pages,
            forms,
        })
    }

    /// Rebuild the object graph and form container from the current bytes.
    ///
    /// Every [`NodeId`] handed out before is stale afterwards. The attached
    /// script engine moves to the new container. On error the document is
    /// left as it was.
    pub fn refresh(&mut self) -> Result<()> {
        let snapshot = Self::read_snapshot(&self.data, &self.config)?;
        let engine = self.forms.take_script_engine();
        self.version = snapshot.version;
        self.graph = snapshot.graph;
        self.catalog = snapshot.catalog;
        self.info = snapshot.info;
        self.pages = snapshot.pages;
        self.forms = snapshot.forms;
        if let Some(engine) = engine {
            self.forms.set_script_engine(engine);
        }
        Ok(())
    }

    /// Current bytes of the document, including saved form values.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// File the document was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn pdf_name(&self) -> &str {
        &self.pdf_name
    }

    pub fn set_pdf_name(&mut self, name: impl Into<String>) {
        self.pdf_name = name.into();
    }

    /// Version from the header, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> NodeId {
        self.catalog
    }

    /// The document information dictionary (`/Info`), when present.
    pub fn info(&self) -> Option<NodeId> {
        self.info
    }

    /// Page dictionaries in document order.
    pub fn pages(&self) -> &[NodeId] {
        &self.pages
    }

    pub fn number_of_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn forms(&self) -> &FormContainer {
        &self.forms
    }

    pub fn forms_mut(&mut self) -> &mut FormContainer {
        &mut self.forms
    }

    pub fn objects(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn objects_mut(&mut self) -> &mut ObjectGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Resolve an indirect object of the current snapshot.
    pub fn object_for_reference(&mut self, reference: ObjectRef) -> Result<Option<NodeId>> {
        self.graph.resolve_indirect(reference)
    }

    /// Write changed form values into the document bytes.
    ///
    /// Every edit is planned against the current bytes before any is applied,
    /// so on error the bytes are exactly as before. Fields stored in
    /// compressed object streams cannot be edited and fail with
    /// [`Error::UnsupportedSave`].
    ///
    /// The object graph keeps describing the bytes as they were when it was
    /// built; call [`refresh`](Self::refresh) to see the saved values there.
    pub fn save_forms_to_document_data(&mut self) -> Result<()> {
        let targets = self.save_targets()?;
        if targets.is_empty() {
            log::debug!("No changed form values to save");
            self.forms.mark_saved();
            return Ok(());
        }

        let planner = SplicePlanner::new(self.data.clone(), self.config.parser, self.config.pad_shorter_values)?;
        let splices = targets
            .iter()
            .map(|target| planner.plan(target))
            .collect::<Result<Vec<_>>>()?;
        let updated = apply_splices(&self.data, splices)?;

        log::info!(
            "Saved {} form entries ({} -> {} bytes)",
            targets.len(),
            self.data.len(),
            updated.len()
        );
        self.data = Bytes::from(updated);
        self.forms.mark_saved();
        Ok(())
    }

    /// Entries to rewrite for every changed field, without duplicates.
    fn save_targets(&self) -> Result<Vec<EntryTarget>> {
        let mut targets: Vec<EntryTarget> = Vec::new();
        let mut push = |target: EntryTarget| {
            if !targets.iter().any(|t| t.object == target.object && t.path == target.path) {
                targets.push(target);
            }
        };

        for field in self.forms.modified_fields() {
            let owner = match field.value_owner() {
                Some(owner) => owner,
                None => {
                    log::debug!("Field {:?} has no dictionary in the document, not saved", field.name());
                    continue;
                },
            };
            let (object, path) = self.entry_path(owner, "V")?;
            push(EntryTarget {
                object,
                path,
                value: stored_value(field),
            });

            if field.field_type() != FieldType::Button {
                continue;
            }
            if let (Some(export), Some(widget)) = (field.export_value(), field.backing_dictionary()) {
                let state = if field.is_checked() { export } else { "Off" };
                let (object, path) = self.entry_path(widget, "AS")?;
                push(EntryTarget {
                    object,
                    path,
                    value: Object::Name(state.to_string()),
                });
            }
        }
        Ok(targets)
    }

    /// Nearest indirect object holding `node`, and the path from it to `key`.
    fn entry_path(&self, node: NodeId, key: &str) -> Result<(ObjectRef, Vec<ChildKey>)> {
        let mut path = vec![ChildKey::Key(key.to_string())];
        let mut current = node;
        for _ in 0..=self.graph.len() {
            if let Some(reference) = self.graph.reference(current)? {
                path.reverse();
                return Ok((reference, path));
            }
            match (self.graph.parent(current)?, self.graph.key_in_parent(current)?) {
                (Some(parent), Some(child_key)) => {
                    path.push(child_key.clone());
                    current = parent;
                },
                _ => break,
            }
        }
        Err(Error::UnsupportedSave(format!(
            "/{} is not inside any indirect object",
            key
        )))
    }

    /// Write the current bytes to `path`.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.data)?;
        log::info!("Wrote {} bytes to {}", self.data.len(), path.display());
        Ok(())
    }

    /// XML description of the form values.
    pub fn form_xml(&self) -> Result<String> {
        self.forms.form_xml()
    }

    /// Source text of an indirect object, looked up by number.
    ///
    /// Not available: always returns [`Error::Unimplemented`].
    pub fn code_for_object_with_number(&self, _number: u32, _generation: u16) -> Result<String> {
        Err(Error::Unimplemented("code_for_object_with_number"))
    }
}

/// The `/V` value a field's current text is written as.
fn stored_value(field: &Field) -> Object {
    match field.field_type() {
        FieldType::Button if field.value().is_empty() => Object::Name("Off".to_string()),
        FieldType::Button => Object::Name(field.value().to_string()),
        _ => Object::String(encode_text_string(field.value())),
    }
}

/// Leaf page dictionaries under `/Pages`, depth first.
fn collect_pages(graph: &mut ObjectGraph, catalog: NodeId) -> Result<Vec<NodeId>> {
    let mut pages = Vec::new();
    match graph.dictionary_for_key(catalog, "Pages")? {
        Some(root) => collect_page_nodes(graph, root, 0, &mut HashSet::new(), &mut pages)?,
        None => log::warn!("Catalog has no /Pages tree"),
    }
    Ok(pages)
}

fn collect_page_nodes(
    graph: &mut ObjectGraph,
    node: NodeId,
    depth: usize,
    visited: &mut HashSet<NodeId>,
    pages: &mut Vec<NodeId>,
) -> Result<()> {
    if depth > graph.options().max_nesting {
        log::warn!("Page tree deeper than {} levels, ignoring the rest", graph.options().max_nesting);
        return Ok(());
    }
    if !visited.insert(node) {
        log::warn!("Circular reference in page tree, skipping node");
        return Ok(());
    }

    // Untyped nodes without /Kids count as pages; an empty /Pages node adds nothing.
    let node_type = graph.name_for_key(node, "Type")?;
    let kids = match (node_type.as_deref(), graph.array_for_key(node, "Kids")?) {
        (Some("Page"), _) | (None, None) => {
            pages.push(node);
            return Ok(());
        },
        (_, Some(kids)) => kids,
        (_, None) => return Ok(()),
    };
    for kid in graph.array_values(kids)?.into_iter().flatten() {
        if graph.object(kid)?.as_dictionary().is_some() {
            collect_page_nodes(graph, kid, depth + 1, visited, pages)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(objects: &[&str]) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        out
    }

    fn form_pdf() -> Vec<u8> {
        build(&[
            "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R 5 0 R] >> >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /Annots [4 0 R 5 0 R] >>",
            "<< /T (City) /FT /Tx /V (Ndola) /Rect [0 0 100 20] /P 3 0 R >>",
            "<< /T (Agree) /FT /Btn /AS /Off /AP << /N << /Yes 1 /Off 2 >> >> >>",
        ])
    }

    #[test]
    fn test_load_and_discover() {
        let doc = PdfDocument::from_bytes(form_pdf()).unwrap();
        assert_eq!(doc.version(), "1.7");
        assert_eq!(doc.number_of_pages(), 1);
        assert_eq!(doc.pdf_name(), UNNAMED);
        assert!(doc.info().is_none());
        assert_eq!(doc.forms().len(), 2);
        assert_eq!(doc.forms().value_for_name("City"), Some("Ndola"));
        assert_eq!(doc.forms().forms_with_name("City")[0].page_index(), Some(0));
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            PdfDocument::from_bytes(b"hello".to_vec()),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_save_and_refresh() {
        let mut doc = PdfDocument::from_bytes(form_pdf()).unwrap();
        doc.forms_mut().set_value("Kabwe", "City");
        doc.forms_mut().set_value("Yes", "Agree");
        doc.save_forms_to_document_data().unwrap();
        assert!(doc.forms().iter().all(|f| !f.is_modified()));

        let text = String::from_utf8_lossy(doc.data()).into_owned();
        assert!(text.contains("/V (Kabwe)"));
        assert!(text.contains("/AS /Yes"));
        assert!(text.contains("/V /Yes"));

        doc.refresh().unwrap();
        assert_eq!(doc.forms().value_for_name("City"), Some("Kabwe"));
        assert!(doc.forms().forms_with_name("Agree")[0].is_checked());
    }

    #[test]
    fn test_save_without_changes_keeps_bytes() {
        let original = form_pdf();
        let mut doc = PdfDocument::from_bytes(original.clone()).unwrap();
        doc.save_forms_to_document_data().unwrap();
        assert_eq!(doc.data(), &original[..]);
    }

    #[test]
    fn test_refresh_invalidates_handles() {
        let mut doc = PdfDocument::from_bytes(form_pdf()).unwrap();
        let catalog = doc.catalog();
        doc.refresh().unwrap();
        assert!(matches!(doc.objects().object(catalog), Err(Error::StaleHandle)));
        assert!(doc.objects().object(doc.catalog()).is_ok());
    }

    #[test]
    fn test_nested_page_tree_with_cycle() {
        let doc = PdfDocument::from_bytes(build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] >>",
            "<< /Type /Pages /Kids [4 0 R 2 0 R] /Parent 2 0 R >>",
            "<< /Type /Page /Parent 3 0 R >>",
        ]))
        .unwrap();
        assert_eq!(doc.number_of_pages(), 1);
    }

    #[test]
    fn test_empty_page_tree_has_no_pages() {
        let doc = PdfDocument::from_bytes(build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Count 0 >>",
        ]))
        .unwrap();
        assert_eq!(doc.number_of_pages(), 0);
        assert!(doc.pages().is_empty());
    }

    #[test]
    fn test_untyped_leaf_counts_as_page() {
        let doc = PdfDocument::from_bytes(build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 1 >>",
            "<< /Parent 2 0 R /MediaBox [0 0 612 792] >>",
            "<< /Type /Pages /Parent 2 0 R >>",
        ]))
        .unwrap();
        assert_eq!(doc.number_of_pages(), 1);
    }

    #[test]
    fn test_code_for_object_is_unimplemented() {
        let doc = PdfDocument::from_bytes(form_pdf()).unwrap();
        assert!(matches!(
            doc.code_for_object_with_number(1, 0),
            Err(Error::Unimplemented(_))
        ));
    }
}
