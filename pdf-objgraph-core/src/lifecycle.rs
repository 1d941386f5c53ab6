//! Flushing and freeing of indirect objects
//!
//! A flush serializes one object as a self-contained unit, appends it to the
//! output and drops its heavy parts from memory. It never follows
//! references: each object is flushed on its own.

use crate::codec::serialize_indirect;
use crate::error::{PdfError, Result};
use crate::filters::FilterRegistry;
use crate::objects::{Object, ObjectId, Stream};
use crate::options::DocumentOptions;
use crate::registry::{ObjectState, Registry, XRefEntry, MAX_GENERATION};
use crate::writer::PdfWriter;
use std::io::Write;

/// Write `id` to the output and mark it flushed.
///
/// Flushing an already flushed object does nothing. An unmaterialized object
/// is loaded first.
pub fn flush_object<W: Write>(
    registry: &mut Registry,
    writer: &mut PdfWriter<W>,
    options: &DocumentOptions,
    filters: &FilterRegistry,
    id: ObjectId,
) -> Result<()> {
    if registry.state(id) == Some(ObjectState::Flushed) {
        return Ok(());
    }

    let object = registry.live_object_mut(id)?;
    if let Some(stream) = object.as_stream_mut() {
        settle_stream(stream, options, filters, id)?;
    }

    let unit = serialize_indirect(id, object);
    let record = writer.write_unit(&unit)?;

    let released = match object {
        Object::Stream(stream) if options.release_payloads => stream.release_payload(),
        Object::Stream(stream) => stream.clear_decoded(),
        _ => 0,
    };

    tracing::debug!(
        "Flushed {} ({} bytes at offset {}, {} released)",
        id,
        record.length,
        record.offset,
        released
    );
    registry.mark_flushed(id, record, released)
}

/// Compress if configured and make `/Length` match the stored payload.
fn settle_stream(
    stream: &mut Stream,
    options: &DocumentOptions,
    filters: &FilterRegistry,
    id: ObjectId,
) -> Result<()> {
    if stream.is_released() {
        return Err(PdfError::InvalidOperation(format!(
            "payload of {id} was released before it was written"
        )));
    }

    if options.compress_streams && !stream.has_filter() && filters.contains("FlateDecode") {
        let encoded = filters.encode("FlateDecode", stream.data())?;
        stream.set_data(encoded);
        stream.set_filter("FlateDecode");
    }

    let length = stream.data().len() as i64;
    stream.dictionary_mut().set("Length", length);
    Ok(())
}

/// Flush every object still in memory or in the backing source, in number
/// order. Reserved numbers that were never populated, and source objects
/// that fail to parse, are written as `null` so that nothing in the output
/// refers to a missing object.
pub fn flush_remaining<W: Write>(
    registry: &mut Registry,
    writer: &mut PdfWriter<W>,
    options: &DocumentOptions,
    filters: &FilterRegistry,
) -> Result<usize> {
    let mut flushed = 0;
    for number in 1..registry.size() {
        let Some((generation, state)) = registry.entry(number) else {
            continue;
        };
        let id = ObjectId::new(number, generation);
        match state {
            ObjectState::Live => {}
            ObjectState::Unmaterialized => {
                // an unparseable object does not take the rest of the file down
                let malformed = match registry.resolve(id) {
                    Ok(_) => None,
                    Err(PdfError::MalformedPrimitive(err)) => Some(err),
                    Err(err) => return Err(err),
                };
                if let Some(err) = malformed {
                    tracing::warn!("Object {} cannot be parsed ({}); writing null", id, err);
                    registry.put(id, Object::Null)?;
                }
            }
            ObjectState::Reserved => {
                tracing::warn!("Object {} was reserved but never populated; writing null", id);
                registry.put(id, Object::Null)?;
            }
            ObjectState::Flushed | ObjectState::Free => continue,
        }
        flush_object(registry, writer, options, filters, id)?;
        flushed += 1;
    }
    Ok(flushed)
}

/// Cross-reference rows for a registry whose objects are all flushed or free.
///
/// Free entries form a linked list through object 0.
pub fn xref_rows(registry: &Registry) -> Result<Vec<(u32, XRefEntry)>> {
    let size = registry.size();
    let mut rows = Vec::with_capacity(size as usize);
    let mut free_numbers = Vec::new();

    for number in 1..size {
        let (generation, state) = registry
            .entry(number)
            .ok_or_else(|| PdfError::InvalidOperation(format!("no slot for {number}")))?;
        match state {
            ObjectState::Flushed => {
                let id = ObjectId::new(number, generation);
                let record = registry.flushed_record(id).ok_or_else(|| {
                    PdfError::InvalidOperation(format!("no flush record for {id}"))
                })?;
                rows.push((number, XRefEntry::in_use(record.offset, generation)));
            }
            ObjectState::Free => {
                free_numbers.push(number);
                rows.push((number, XRefEntry::free(0, generation)));
            }
            other => {
                return Err(PdfError::InvalidOperation(format!(
                    "object {number} is still {other:?}"
                )))
            }
        }
    }

    // rows[i] holds number i + 1 at this point
    for pair in free_numbers.windows(2) {
        rows[(pair[0] - 1) as usize].1.offset = u64::from(pair[1]);
    }
    let head = free_numbers.first().map_or(0, |&n| u64::from(n));
    rows.insert(0, (0, XRefEntry::free(head, MAX_GENERATION)));

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ObjectParser;
    use crate::objects::Dictionary;

    fn setup() -> (Registry, PdfWriter<Vec<u8>>, FilterRegistry) {
        let mut writer = PdfWriter::new_with_writer(Vec::new());
        writer.write_header("1.7").unwrap();
        (Registry::new(), writer, FilterRegistry::new())
    }

    #[test]
    fn test_flush_writes_unit_and_marks_flushed() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default();
        let mut dict = Dictionary::new();
        dict.set("Type", crate::objects::Name::new("Page"));
        let id = registry.add(Object::from(dict));

        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        assert_eq!(registry.state(id), Some(ObjectState::Flushed));

        let offset = registry.flushed_record(id).unwrap().offset as usize;
        let output = writer.into_inner();
        let (parsed_id, parsed) = ObjectParser::new(&output[offset..])
            .parse_indirect()
            .unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(parsed.as_dict().unwrap().get_type(), Some("Page"));
    }

    #[test]
    fn test_flush_is_idempotent() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default();
        let id = registry.add(Object::integer(1));

        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        let position = writer.position();
        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        assert_eq!(writer.position(), position);
        assert_eq!(registry.stats().flushes, 1);
    }

    #[test]
    fn test_flush_releases_stream_payload() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default();
        let id = registry.add(Object::from(Stream::new(vec![b'x'; 4096])));
        assert_eq!(registry.resident_payload_bytes(), 4096);

        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        assert_eq!(registry.resident_payload_bytes(), 0);
        assert_eq!(registry.stats().bytes_released, 4096);

        let payload = registry.flushed_record(id).unwrap().payload.clone().unwrap();
        assert_eq!(payload.end - payload.start, 4096);
        // dictionary stays resident
        let stream = registry.resolve(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dictionary().get_integer("Length"), Some(4096));
    }

    #[test]
    fn test_flush_keeps_payload_when_configured() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default().with_release_payloads(false);
        let id = registry.add(Object::from(Stream::new(b"keep".to_vec())));

        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        assert_eq!(registry.resident_payload_bytes(), 4);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flush_compresses_unfiltered_streams() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::compact().with_release_payloads(false);
        let id = registry.add(Object::from(Stream::new(vec![b'a'; 2000])));

        flush_object(&mut registry, &mut writer, &options, &filters, id).unwrap();
        let stream = registry.resolve(id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dictionary().get_name("Filter").map(|n| n.as_str()),
            Some("FlateDecode")
        );
        let stored = stream.data().len() as i64;
        assert!(stored < 2000);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(stored));
    }

    #[test]
    fn test_flush_reserved_is_broken() {
        let (mut registry, mut writer, filters) = setup();
        let id = registry.allocate();
        let result = flush_object(
            &mut registry,
            &mut writer,
            &DocumentOptions::default(),
            &filters,
            id,
        );
        assert!(matches!(result, Err(PdfError::BrokenReference(_))));
    }

    #[test]
    fn test_flush_remaining_fills_reserved_numbers() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default();
        let a = registry.add(Object::integer(1));
        let reserved = registry.allocate();
        let c = registry.add(Object::integer(3));
        flush_object(&mut registry, &mut writer, &options, &filters, a).unwrap();

        let count = flush_remaining(&mut registry, &mut writer, &options, &filters).unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.state(reserved), Some(ObjectState::Flushed));
        assert_eq!(registry.state(c), Some(ObjectState::Flushed));
        assert!(registry.resolve(reserved).unwrap().is_null());
    }

    #[test]
    fn test_xref_rows_chain_free_entries() {
        let (mut registry, mut writer, filters) = setup();
        let options = DocumentOptions::default();
        let ids: Vec<_> = (0..5).map(|i| registry.add(Object::integer(i))).collect();
        registry.free(ids[1]).unwrap();
        registry.free(ids[3]).unwrap();
        flush_remaining(&mut registry, &mut writer, &options, &filters).unwrap();

        let rows = xref_rows(&registry).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], (0, XRefEntry::free(2, MAX_GENERATION)));
        assert_eq!(rows[2], (2, XRefEntry::free(4, 1)));
        assert_eq!(rows[4], (4, XRefEntry::free(0, 1)));
        assert!(rows[1].1.in_use);
        assert!(rows[5].1.in_use);
    }

    #[test]
    fn test_xref_rows_reject_unflushed() {
        let mut registry = Registry::new();
        registry.add(Object::Null);
        assert!(xref_rows(&registry).is_err());
    }
}
