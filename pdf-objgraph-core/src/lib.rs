//! # pdf-objgraph
//!
//! A mutable, in-memory graph of PDF objects connected by indirect
//! references. The graph can be built programmatically, loaded lazily from an
//! existing file, copied between documents and written out incrementally so
//! memory stays bounded while large documents are produced.
//!
//! ## Features
//!
//! - **Object Registry**: every indirect object lives in one arena, addressed
//!   by `N G R` references with generation-checked reuse of freed numbers
//! - **Lazy Loading**: objects of an opened file are parsed on first access
//! - **Subgraph Copying**: shared objects stay shared, cycles terminate, no
//!   recursion over reference chains
//! - **Incremental Flushing**: objects are written as soon as they are done
//!   and their stream payloads released
//! - **Byte-exact Primitives**: numbers and names keep their as-written form
//!
//! ## Quick Start
//!
//! ### Building a document
//!
//! ```rust
//! use pdf_objgraph::{Dictionary, Document, Name, Object, Result, Stream};
//!
//! # fn main() -> Result<()> {
//! let mut doc = Document::new(Vec::new())?;
//!
//! let content = doc.add_object(Object::from(Stream::new(b"BT /F1 12 Tf ET".to_vec())));
//! let mut page = Dictionary::new();
//! page.set("Type", Name::new("Page"));
//! page.set("Contents", content);
//! let page = doc.add_object(Object::from(page));
//!
//! // the content stream is done: write it and drop its payload
//! doc.flush(content)?;
//!
//! let pages = doc.catalog()?.get_reference("Pages").unwrap();
//! let pages_dict = doc.resolve_mut(pages)?.as_dict_mut().unwrap();
//! pages_dict.set("Kids", vec![Object::from(page)]);
//! pages_dict.set("Count", 1);
//! doc.resolve_mut(page)?.as_dict_mut().unwrap().set("Parent", pages);
//!
//! let bytes = doc.close()?;
//! assert!(bytes.ends_with(b"%%EOF\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading a document
//!
//! ```rust,no_run
//! use pdf_objgraph::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::open_file("document.pdf")?;
//! let catalog = doc.catalog()?.clone();
//! println!("Catalog entries: {}", catalog.len());
//! println!("Objects parsed so far: {}", doc.registry().stats().lazy_loads);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`objects`] - the object model: [`Object`], [`Name`], [`Dictionary`], ...
//! - [`codec`] - lexer, parser and serializer for single objects
//! - [`registry`] - object arena, lazy loading and cross-reference reading
//! - [`copy`] - cross-document subgraph copying
//! - [`lifecycle`] - flushing objects and building the cross-reference table
//! - [`writer`] - output sinks and the low-level file writer
//! - [`filters`] - stream filter plugins

pub mod codec;
pub mod copy;
pub mod document;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod objects;
pub mod options;
pub mod registry;
pub mod writer;

// Re-export commonly used types
pub use codec::{parse_object, ParseError};
pub use copy::{copy_subgraph, CopyOptions, SubgraphCopier};
pub use document::Document;
pub use error::{PdfError, Result};
pub use filters::{FilterRegistry, StreamFilter};
pub use objects::name::{decode_name, encode_name};
pub use objects::{Array, Dictionary, Name, Number, Object, ObjectId, PdfString, Stream};
pub use options::DocumentOptions;
pub use registry::{ByteSource, ObjectResolver, ObjectState, ReaderSource, Registry, RegistryStats};
pub use writer::{FlushRecord, OutputSink};

/// Current version of pdf-objgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Supported PDF versions
pub mod pdf_version {
    /// Header versions accepted when reading and writing
    pub const SUPPORTED_VERSIONS: &[&str] = &[
        "1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "2.0",
    ];
}
