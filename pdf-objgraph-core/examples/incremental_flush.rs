//! Incremental flushing demo
//!
//! Builds a document with many large content streams, writing each one as
//! soon as it is complete so only one payload is resident at a time, then
//! reopens the result lazily and copies a page into a second document.
//!
//! Run with: `RUST_LOG=pdf_objgraph=debug cargo run --example incremental_flush`

use pdf_objgraph::{
    CopyOptions, Dictionary, Document, DocumentOptions, Name, Object, ReaderSource, Result,
    Stream, SubgraphCopier,
};
use std::fs::OpenOptions;

const PAGES: usize = 200;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let dir = std::env::temp_dir();
    let path = dir.join("incremental_flush.pdf");
    let sink = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;

    let mut doc = Document::with_options(sink, DocumentOptions::compact())?;
    let pages_id = doc
        .catalog()?
        .get_reference("Pages")
        .ok_or_else(|| pdf_objgraph::PdfError::InvalidStructure("no page tree".to_string()))?;

    let mut font = Dictionary::new();
    font.set("Type", Name::new("Font"));
    font.set("Subtype", Name::new("Type1"));
    font.set("BaseFont", Name::new("Helvetica"));
    let font_id = doc.add_object(Object::from(font));

    let mut kids = Vec::with_capacity(PAGES);
    let mut peak = 0;
    for i in 0..PAGES {
        let text = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET\n", i + 1).repeat(2000);
        let content = doc.add_object(Object::from(Stream::new(text.into_bytes())));

        let mut fonts = Dictionary::new();
        fonts.set("F1", font_id);
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);

        let mut page = Dictionary::new();
        page.set("Type", Name::new("Page"));
        page.set("Parent", pages_id);
        page.set("Resources", resources);
        page.set("Contents", content);
        page.set(
            "MediaBox",
            vec![
                Object::integer(0),
                Object::integer(0),
                Object::integer(612),
                Object::integer(792),
            ],
        );
        let page_id = doc.add_object(Object::from(page));

        peak = peak.max(doc.registry().resident_payload_bytes());
        doc.flush(content)?;
        doc.flush(page_id)?;
        kids.push(Object::from(page_id));
    }

    let pages = doc
        .resolve_mut(pages_id)?
        .as_dict_mut()
        .ok_or_else(|| pdf_objgraph::PdfError::InvalidStructure("bad page tree".to_string()))?;
    pages.set("Count", PAGES as i64);
    pages.set("Kids", kids);

    let stats = doc.registry().stats().clone();
    doc.set_title("Incremental flush demo")?;
    doc.close()?;

    tracing::info!(
        "Wrote {} ({} flushes, {} payload bytes released, peak resident {} bytes)",
        path.display(),
        stats.flushes,
        stats.bytes_released,
        peak
    );

    // Reopen lazily and copy one page into a fresh document
    let mut source = Document::open(ReaderSource::open(&path)?)?;
    let pages_id = source
        .catalog()?
        .get_reference("Pages")
        .ok_or_else(|| pdf_objgraph::PdfError::InvalidStructure("no page tree".to_string()))?;
    let first_page = source
        .resolve(pages_id)?
        .as_dict()
        .and_then(|pages| pages.get_array("Kids"))
        .and_then(|kids| kids.get(0))
        .and_then(Object::as_reference)
        .ok_or_else(|| pdf_objgraph::PdfError::InvalidStructure("no pages".to_string()))?;

    let mut extract = Document::new(Vec::new())?;
    let mut copier = SubgraphCopier::with_options(CopyOptions::default().exclude_key("Parent"));
    let copied = extract.copy_with(&mut copier, &mut source, first_page)?;

    tracing::info!(
        "Copied page {} as {} ({} objects), parsed {} of {} source objects",
        first_page,
        copied,
        copier.len(),
        source.registry().stats().lazy_loads,
        source.registry().len()
    );

    let bytes = extract.close()?;
    tracing::info!("Extract is {} bytes", bytes.len());
    Ok(())
}
