use crate::copy::{copy_subgraph, SubgraphCopier};
use crate::error::{PdfError, Result};
use crate::filters::FilterRegistry;
use crate::lifecycle;
use crate::objects::{Array, Dictionary, Name, Object, ObjectId, PdfString};
use crate::options::DocumentOptions;
use crate::registry::{read_xref, ByteSource, ObjectResolver, ObjectState, ReaderSource, Registry};
use crate::writer::{format_pdf_date, OutputSink, PdfWriter};
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::Path;

/// A PDF document: one object registry, its catalog and an optional output.
///
/// Objects are flushed to the output as soon as the caller is done with
/// them; [`Document::close`] writes whatever is left plus the
/// cross-reference table and trailer.
///
/// # Example
///
/// ```rust
/// use pdf_objgraph::{Document, Object, Stream};
///
/// # fn main() -> pdf_objgraph::Result<()> {
/// let mut doc = Document::new(Vec::new())?;
/// doc.set_title("Report")?;
///
/// let content = doc.add_object(Object::from(Stream::new(b"BT ET".to_vec())));
/// doc.flush(content)?;
///
/// let bytes = doc.close()?;
/// assert!(bytes.starts_with(b"%PDF-1.7"));
/// assert!(bytes.ends_with(b"%%EOF\n"));
/// # Ok(())
/// # }
/// ```
pub struct Document<W: OutputSink = io::Sink> {
    registry: Registry,
    catalog_id: ObjectId,
    info_id: Option<ObjectId>,
    /// First element of the `/ID` of an opened document
    file_id: Option<Vec<u8>>,
    options: DocumentOptions,
    filters: FilterRegistry,
    writer: Option<PdfWriter<W>>,
}

impl<W: OutputSink> Document<W> {
    /// Creates a new empty document writing to `sink`.
    pub fn new(sink: W) -> Result<Self> {
        Self::with_options(sink, DocumentOptions::default())
    }

    pub fn with_options(sink: W, options: DocumentOptions) -> Result<Self> {
        let mut writer = PdfWriter::new_with_writer(sink);
        writer.write_header(&options.version)?;

        let mut registry = Registry::new();
        let pages_id = registry.allocate();
        let catalog_id = registry.allocate();

        let mut pages = Dictionary::new();
        pages.set("Type", Name::new("Pages"));
        pages.set("Kids", Array::new());
        pages.set("Count", 0);
        registry.put(pages_id, Object::from(pages))?;

        let mut catalog = Dictionary::new();
        catalog.set("Type", Name::new("Catalog"));
        catalog.set("Pages", pages_id);
        registry.put(catalog_id, Object::from(catalog))?;

        let now = PdfString::from(format_pdf_date(Utc::now()));
        let mut info = Dictionary::new();
        info.set(
            "Producer",
            PdfString::from(format!("pdf-objgraph v{}", crate::VERSION)),
        );
        info.set("CreationDate", now.clone());
        info.set("ModDate", now);
        let info_id = registry.add(Object::from(info));

        tracing::debug!("Created document (PDF {})", options.version);
        Ok(Self {
            registry,
            catalog_id,
            info_id: Some(info_id),
            file_id: None,
            filters: FilterRegistry::with_flate_level(options.compression_level),
            options,
            writer: Some(writer),
        })
    }

    /// Open an existing document and write a rewritten copy to `sink`.
    pub fn open_with_output<S: ByteSource + Send + 'static>(source: S, sink: W) -> Result<Self> {
        let options = DocumentOptions::default();
        let mut writer = PdfWriter::new_with_writer(sink);
        writer.write_header(&options.version)?;
        Self::load(Box::new(source), options, Some(writer))
    }

    fn load(
        mut source: Box<dyn ByteSource + Send>,
        options: DocumentOptions,
        writer: Option<PdfWriter<W>>,
    ) -> Result<Self> {
        let head = source.read_range(0, 1024)?;
        if !head.windows(5).any(|w| w == b"%PDF-") {
            return Err(PdfError::InvalidStructure("missing %PDF header".to_string()));
        }

        let xref = read_xref(source.as_mut(), options.source_window)?;
        let trailer = xref.trailer();
        if trailer.contains_key("Encrypt") {
            return Err(PdfError::InvalidStructure(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let catalog_id = trailer
            .get_reference("Root")
            .ok_or_else(|| PdfError::InvalidStructure("trailer has no /Root".to_string()))?;
        let info_id = trailer.get_reference("Info");
        let file_id = trailer
            .get_array("ID")
            .and_then(|id| id.get(0))
            .and_then(Object::as_string)
            .map(|s| s.as_bytes().to_vec());

        let registry = Registry::with_source(source, &xref, &options);
        tracing::debug!(
            "Opened document with {} objects, catalog {}",
            registry.len(),
            catalog_id
        );

        Ok(Self {
            registry,
            catalog_id,
            info_id,
            file_id,
            filters: FilterRegistry::with_flate_level(options.compression_level),
            options,
            writer,
        })
    }

    pub fn catalog_id(&self) -> ObjectId {
        self.catalog_id
    }

    pub fn catalog(&mut self) -> Result<&Dictionary> {
        let id = self.catalog_id;
        self.registry
            .resolve(id)?
            .as_dict()
            .ok_or_else(|| PdfError::InvalidStructure(format!("catalog {id} is not a dictionary")))
    }

    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let id = self.catalog_id;
        self.registry
            .resolve_mut(id)?
            .as_dict_mut()
            .ok_or_else(|| PdfError::InvalidStructure(format!("catalog {id} is not a dictionary")))
    }

    pub fn info_id(&self) -> Option<ObjectId> {
        self.info_id
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Register additional stream filters
    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn allocate(&mut self) -> ObjectId {
        self.registry.allocate()
    }

    pub fn put(&mut self, id: ObjectId, object: Object) -> Result<()> {
        self.registry.put(id, object)
    }

    /// Add a new indirect object and return its reference
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        self.registry.add(object)
    }

    /// Resolve a reference. A flushed stream whose payload was released is
    /// read back from the output first, when the output supports it.
    pub fn resolve(&mut self, id: ObjectId) -> Result<&Object> {
        if self.registry.needs_rehydration(id) {
            self.rehydrate(id)?;
        }
        self.registry.resolve(id)
    }

    pub fn resolve_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.registry.resolve_mut(id)
    }

    /// Make a flushed object mutable again. It will be written a second
    /// time; the newer copy wins in the cross-reference table.
    pub fn revive(&mut self, id: ObjectId) -> Result<()> {
        if self.registry.needs_rehydration(id) {
            self.rehydrate(id)?;
        }
        self.registry.revive(id)
    }

    fn rehydrate(&mut self, id: ObjectId) -> Result<()> {
        let Some(range) = self
            .registry
            .flushed_record(id)
            .and_then(|record| record.payload.clone())
        else {
            return Ok(());
        };
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        if let Some(payload) = writer.read_back(&range)? {
            self.registry.rehydrate(id, payload)?;
        }
        Ok(())
    }

    pub fn free(&mut self, id: ObjectId) -> Result<()> {
        self.registry.free(id)
    }

    /// Write one object to the output now.
    pub fn flush(&mut self, id: ObjectId) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(no_output)?;
        lifecycle::flush_object(&mut self.registry, writer, &self.options, &self.filters, id)
    }

    /// Flush every live object. Returns the number of objects written.
    pub fn flush_all(&mut self) -> Result<usize> {
        let live: Vec<ObjectId> = self
            .registry
            .ids()
            .filter(|&id| self.registry.state(id) == Some(ObjectState::Live))
            .collect();
        for &id in &live {
            self.flush(id)?;
        }
        Ok(live.len())
    }

    /// Copy the subgraph rooted at `root` of another document or registry
    /// into this one.
    pub fn copy_from<S: ObjectResolver + ?Sized>(
        &mut self,
        source: &mut S,
        root: ObjectId,
    ) -> Result<ObjectId> {
        copy_subgraph(root, source, &mut self.registry)
    }

    /// Copy with a copier that keeps its mappings across calls
    pub fn copy_with<S: ObjectResolver + ?Sized>(
        &mut self,
        copier: &mut SubgraphCopier,
        source: &mut S,
        root: ObjectId,
    ) -> Result<ObjectId> {
        copier.copy(root, source, &mut self.registry)
    }

    /// Walk everything reachable from the catalog and the Info dictionary
    /// and return the references that do not resolve.
    pub fn validate_references(&mut self) -> Vec<ObjectId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<ObjectId> =
            std::iter::once(self.catalog_id).chain(self.info_id).collect();
        visited.extend(queue.iter().copied());
        let mut broken = Vec::new();

        while let Some(id) = queue.pop_front() {
            match self.registry.resolve(id) {
                Ok(object) => object.for_each_reference(|reference| {
                    if visited.insert(reference) {
                        queue.push_back(reference);
                    }
                }),
                Err(err) => {
                    tracing::debug!("Unresolvable reference {}: {}", id, err);
                    broken.push(id);
                }
            }
        }
        broken
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_info("Title", title)
    }

    pub fn set_author(&mut self, author: &str) -> Result<()> {
        self.set_info("Author", author)
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<()> {
        self.set_info("Subject", subject)
    }

    pub fn set_creator(&mut self, creator: &str) -> Result<()> {
        self.set_info("Creator", creator)
    }

    /// Set a text entry of the Info dictionary, creating it if needed
    pub fn set_info(&mut self, key: &str, value: &str) -> Result<()> {
        let info_id = match self.info_id {
            Some(id) => id,
            None => {
                let id = self.registry.add(Object::from(Dictionary::new()));
                self.info_id = Some(id);
                id
            }
        };
        let info = self
            .registry
            .resolve_mut(info_id)?
            .as_dict_mut()
            .ok_or_else(|| PdfError::InvalidStructure("Info is not a dictionary".to_string()))?;
        info.set(key, PdfString::from(value));
        Ok(())
    }

    /// Flush everything left, write the cross-reference table and trailer
    /// and return the output.
    pub fn close(mut self) -> Result<W> {
        let mut writer = self.writer.take().ok_or_else(no_output)?;

        if let Some(info_id) = self.info_id {
            if matches!(
                self.registry.state(info_id),
                Some(ObjectState::Live | ObjectState::Unmaterialized)
            ) {
                if let Some(info) = self.registry.resolve_mut(info_id)?.as_dict_mut() {
                    info.set("ModDate", PdfString::from(format_pdf_date(Utc::now())));
                }
            }
        }

        let written =
            lifecycle::flush_remaining(&mut self.registry, &mut writer, &self.options, &self.filters)?;
        let rows = lifecycle::xref_rows(&self.registry)?;
        let xref_position = writer.write_xref(&rows)?;

        let mut trailer = Dictionary::new();
        trailer.set("Size", i64::from(self.registry.size()));
        trailer.set("Root", self.catalog_id);
        if let Some(info_id) = self.info_id.filter(|&id| self.registry.contains(id)) {
            trailer.set("Info", info_id);
        }
        trailer.set("ID", self.file_identifier(xref_position));

        writer.write_trailer(&trailer, xref_position)?;
        writer.flush()?;

        tracing::debug!(
            "Closed document: {} objects written at close, xref at {}",
            written,
            xref_position
        );
        Ok(writer.into_inner())
    }

    /// `/ID` pair: the original identifier is kept for opened documents, the
    /// second element always changes.
    fn file_identifier(&self, xref_position: u64) -> Array {
        let seed = format!(
            "{}|{}|{}|{}",
            Utc::now().to_rfc3339(),
            self.registry.size(),
            self.catalog_id,
            xref_position
        );
        let current = md5::compute(seed.as_bytes()).to_vec();
        let original = self.file_id.clone().unwrap_or_else(|| current.clone());

        Array::from(vec![
            Object::String(PdfString::hex(original)),
            Object::String(PdfString::hex(current)),
        ])
    }
}

impl Document<io::Sink> {
    /// Open an existing document read-only. Objects are parsed lazily.
    pub fn open<S: ByteSource + Send + 'static>(source: S) -> Result<Self> {
        Self::open_with_options(source, DocumentOptions::default())
    }

    pub fn open_with_options<S: ByteSource + Send + 'static>(
        source: S,
        options: DocumentOptions,
    ) -> Result<Self> {
        Self::load(Box::new(source), options, None)
    }

    /// Open a file read-only
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(ReaderSource::open(path)?)
    }
}

impl<W: OutputSink> ObjectResolver for Document<W> {
    fn resolve(&mut self, id: ObjectId) -> Result<&Object> {
        Document::resolve(self, id)
    }
}

fn no_output() -> PdfError {
    PdfError::InvalidOperation("document was opened without an output".to_string())
}
