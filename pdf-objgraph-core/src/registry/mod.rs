//! Object registry
//!
//! The registry owns every indirect object of one document. Objects are
//! addressed by [`ObjectId`]; each object number has a slot that moves
//! through the states
//!
//! ```text
//! Unmaterialized -> Live -> Flushed -> Live (revive/put) -> Free
//!                   Free -> Reserved -> Live   (only through allocate)
//! ```
//!
//! Slots of an opened document start out `Unmaterialized` and are parsed
//! from the backing source the first time they are resolved.

pub mod source;
pub mod xref;

pub use source::{ByteSource, ReaderSource};
pub use xref::{read_xref, ObjectLocation, XRefEntry, XRefTable};

use crate::codec::{ObjectParser, ParseError};
use crate::error::{PdfError, Result};
use crate::objects::{Object, ObjectId, NULL};
use crate::options::DocumentOptions;
use crate::writer::FlushRecord;
use source::read_window;
use std::collections::VecDeque;

/// Highest generation number. A slot reaching it is never reused.
pub const MAX_GENERATION: u16 = 65535;

/// Anything that can turn a reference into an object.
pub trait ObjectResolver {
    fn resolve(&mut self, id: ObjectId) -> Result<&Object>;
}

/// Public view of a slot's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Known from the backing source, not parsed yet
    Unmaterialized,
    /// Allocated but never populated
    Reserved,
    Live,
    /// Written to the output; stream payloads may be released
    Flushed,
    Free,
}

/// Registry counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub allocations: usize,
    pub frees: usize,
    /// Objects parsed from the backing source
    pub lazy_loads: usize,
    pub flushes: usize,
    /// Payload bytes dropped after flushing
    pub bytes_released: usize,
    pub revivals: usize,
    /// Payloads read back from the output
    pub rehydrations: usize,
}

#[derive(Debug)]
enum SlotState {
    Unmaterialized { offset: u64, end: u64 },
    Reserved,
    Live { object: Object, dirty: bool },
    Flushed { object: Object, record: FlushRecord },
    Free,
}

#[derive(Debug)]
struct Slot {
    generation: u16,
    state: SlotState,
}

impl Slot {
    fn free(generation: u16) -> Self {
        Self {
            generation,
            state: SlotState::Free,
        }
    }
}

/// Arena of indirect objects
pub struct Registry {
    slots: Vec<Slot>,
    free_list: VecDeque<u32>,
    source: Option<Box<dyn ByteSource + Send>>,
    strict_names: bool,
    window: usize,
    /// Flushed stream whose payload is currently read back into memory
    rehydrated: Option<ObjectId>,
    stats: RegistryStats,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("slots", &self.slots.len())
            .field("free", &self.free_list.len())
            .field("has_source", &self.source.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry with no backing source
    pub fn new() -> Self {
        Self {
            // object number 0 is the head of the free list and never holds an object
            slots: vec![Slot::free(MAX_GENERATION)],
            free_list: VecDeque::new(),
            source: None,
            strict_names: false,
            window: DocumentOptions::default().source_window,
            rehydrated: None,
            stats: RegistryStats::default(),
        }
    }

    /// Registry over an existing document. Every in-use entry of `xref`
    /// becomes an unmaterialized slot; free entries and gaps are reusable.
    pub fn with_source(
        source: Box<dyn ByteSource + Send>,
        xref: &XRefTable,
        options: &DocumentOptions,
    ) -> Self {
        // neither /Size nor a subsection header may allocate past what the
        // source can actually describe
        let listed = xref.iter().last().map_or(1, |(&number, _)| number as usize + 1);
        let limit = usize::try_from(source.len() / 8)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let declared = xref.size() as usize;
        let size = declared.min(listed).min(limit).max(1);
        if size < declared {
            tracing::warn!(
                "Trailer /Size {} exceeds the {} object numbers present; using {}",
                declared,
                listed.min(limit),
                size
            );
        }
        let mut slots: Vec<Slot> = (0..size).map(|_| Slot::free(0)).collect();
        slots[0] = Slot::free(MAX_GENERATION);

        for (&number, entry) in xref.iter() {
            if number != 0 && !entry.in_use {
                if let Some(slot) = slots.get_mut(number as usize) {
                    slot.generation = entry.generation;
                }
            }
        }
        for location in xref.locations(source.len()) {
            if location.number as usize >= size {
                tracing::warn!(
                    "Ignoring object {} beyond the usable number range",
                    location.number
                );
                continue;
            }
            if let Some(slot) = slots.get_mut(location.number as usize) {
                *slot = Slot {
                    generation: location.generation,
                    state: SlotState::Unmaterialized {
                        offset: location.offset,
                        end: location.end,
                    },
                };
            }
        }

        let free_list = slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, slot)| {
                matches!(slot.state, SlotState::Free) && slot.generation < MAX_GENERATION
            })
            .map(|(number, _)| number as u32)
            .collect();

        Self {
            slots,
            free_list,
            source: Some(source),
            strict_names: options.strict_names,
            window: options.source_window,
            rehydrated: None,
            stats: RegistryStats::default(),
        }
    }

    /// Reserve a number for a new object.
    ///
    /// The oldest freed number is reused with its bumped generation;
    /// otherwise the next unused number is taken at generation 0.
    pub fn allocate(&mut self) -> ObjectId {
        self.stats.allocations += 1;

        while let Some(number) = self.free_list.pop_front() {
            if let Some(slot) = self.slots.get_mut(number as usize) {
                if matches!(slot.state, SlotState::Free) {
                    slot.state = SlotState::Reserved;
                    let id = ObjectId::new(number, slot.generation);
                    tracing::trace!("Reusing object number {}", id);
                    return id;
                }
            }
        }

        let number = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Reserved,
        });
        let id = ObjectId::new(number, 0);
        tracing::trace!("Allocated {}", id);
        id
    }

    /// Install or overwrite the object behind `id`.
    pub fn put(&mut self, id: ObjectId, object: Object) -> Result<()> {
        let index = self.index_of(id)?;
        let slot = &mut self.slots[index];
        if matches!(slot.state, SlotState::Free) {
            return Err(PdfError::BrokenReference(id));
        }
        if self.rehydrated == Some(id) {
            self.rehydrated = None;
        }
        slot.state = SlotState::Live {
            object,
            dirty: true,
        };
        Ok(())
    }

    /// Allocate a number and install `object` under it
    pub fn add(&mut self, object: Object) -> ObjectId {
        let id = self.allocate();
        let index = id.number() as usize;
        self.slots[index].state = SlotState::Live {
            object,
            dirty: true,
        };
        id
    }

    /// Resolve a reference, loading it from the backing source if needed.
    ///
    /// A free slot resolves to `Null`.
    pub fn resolve(&mut self, id: ObjectId) -> Result<&Object> {
        let index = self.index_of(id)?;
        self.materialize(index)?;
        match &self.slots[index].state {
            SlotState::Live { object, .. } | SlotState::Flushed { object, .. } => Ok(object),
            SlotState::Free => Ok(&NULL),
            SlotState::Reserved | SlotState::Unmaterialized { .. } => {
                Err(PdfError::BrokenReference(id))
            }
        }
    }

    /// Mutable access to a live object. The object is marked dirty.
    pub fn resolve_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        let index = self.index_of(id)?;
        self.materialize(index)?;
        match &mut self.slots[index].state {
            SlotState::Live { object, dirty } => {
                *dirty = true;
                Ok(object)
            }
            SlotState::Flushed { .. } => Err(PdfError::FlushedObjectMutation(id)),
            SlotState::Free => Err(PdfError::InvalidOperation(format!(
                "object {id} is free"
            ))),
            SlotState::Reserved | SlotState::Unmaterialized { .. } => {
                Err(PdfError::BrokenReference(id))
            }
        }
    }

    /// Free the slot of `id` and bump its generation. Older references to the
    /// number become stale.
    pub fn free(&mut self, id: ObjectId) -> Result<()> {
        let index = self.index_of(id)?;
        let slot = &mut self.slots[index];
        if matches!(slot.state, SlotState::Free) {
            return Ok(());
        }

        slot.state = SlotState::Free;
        slot.generation = slot.generation.saturating_add(1);
        if slot.generation < MAX_GENERATION {
            self.free_list.push_back(id.number());
        }
        self.stats.frees += 1;
        tracing::trace!("Freed {} (next generation {})", id, slot.generation);
        Ok(())
    }

    /// Turn a flushed object back into a live, mutable one.
    pub fn revive(&mut self, id: ObjectId) -> Result<()> {
        let index = self.index_of(id)?;
        let slot = &mut self.slots[index];
        match &slot.state {
            SlotState::Flushed { object, .. } => {
                if object.as_stream().is_some_and(|s| s.is_released()) {
                    return Err(PdfError::InvalidOperation(format!(
                        "stream payload of {id} was released and must be re-hydrated first"
                    )));
                }
            }
            SlotState::Live { .. } => return Ok(()),
            _ => return Err(PdfError::BrokenReference(id)),
        }

        let state = std::mem::replace(&mut slot.state, SlotState::Reserved);
        if let SlotState::Flushed { object, .. } = state {
            slot.state = SlotState::Live {
                object,
                dirty: true,
            };
        }
        if self.rehydrated == Some(id) {
            self.rehydrated = None;
        }
        self.stats.revivals += 1;
        tracing::debug!("Revived {}", id);
        Ok(())
    }

    /// Put back the released payload of a flushed stream.
    ///
    /// At most one read-back payload stays resident: the previous one is
    /// released again first.
    pub fn rehydrate(&mut self, id: ObjectId, payload: Vec<u8>) -> Result<()> {
        let index = self.index_of(id)?;
        self.release_rehydrated();
        match &mut self.slots[index].state {
            SlotState::Flushed {
                object: Object::Stream(stream),
                ..
            } if stream.is_released() => {
                stream.restore_payload(payload);
                self.rehydrated = Some(id);
                self.stats.rehydrations += 1;
                tracing::debug!("Re-hydrated payload of {}", id);
                Ok(())
            }
            _ => Err(PdfError::InvalidOperation(format!(
                "{id} has no released payload"
            ))),
        }
    }

    /// Drop the payload that was last read back, if its slot is still
    /// flushed. Returns the number of bytes released.
    pub fn release_rehydrated(&mut self) -> usize {
        let Some(id) = self.rehydrated.take() else {
            return 0;
        };
        let Some(slot) = self.slots.get_mut(id.number() as usize) else {
            return 0;
        };
        if slot.generation != id.generation() {
            return 0;
        }
        match &mut slot.state {
            SlotState::Flushed {
                object: Object::Stream(stream),
                record,
            } if record.payload.is_some() => {
                let released = stream.release_payload();
                self.stats.bytes_released += released;
                released
            }
            _ => 0,
        }
    }

    /// Whether `id` is a flushed stream whose payload was released
    pub fn needs_rehydration(&self, id: ObjectId) -> bool {
        self.slot(id).is_some_and(|slot| {
            matches!(
                &slot.state,
                SlotState::Flushed { object: Object::Stream(s), .. } if s.is_released()
            )
        })
    }

    /// Where a flushed object was written
    pub fn flushed_record(&self, id: ObjectId) -> Option<&FlushRecord> {
        match &self.slot(id)?.state {
            SlotState::Flushed { record, .. } => Some(record),
            _ => None,
        }
    }

    /// State of the slot `id` points at, or `None` if the number was never
    /// allocated or the generation does not match.
    pub fn state(&self, id: ObjectId) -> Option<ObjectState> {
        self.slot(id).map(|slot| slot.observed_state())
    }

    /// Whether `id` currently resolves to an object
    pub fn contains(&self, id: ObjectId) -> bool {
        matches!(
            self.state(id),
            Some(ObjectState::Unmaterialized | ObjectState::Live | ObjectState::Flushed)
        )
    }

    pub fn is_dirty(&self, id: ObjectId) -> bool {
        self.slot(id)
            .is_some_and(|slot| matches!(slot.state, SlotState::Live { dirty: true, .. }))
    }

    /// Number of slots holding an object
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.holds_object())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the highest object number ever used (the trailer `/Size`)
    pub fn size(&self) -> u32 {
        self.slots.len() as u32
    }

    /// References of every slot holding an object, in number order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.holds_object())
            .map(|(number, slot)| ObjectId::new(number as u32, slot.generation))
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Stream payload bytes currently held in memory
    pub fn resident_payload_bytes(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| match &slot.state {
                SlotState::Live { object, .. } | SlotState::Flushed { object, .. } => {
                    object.as_stream().map(|s| s.heavy_bytes())
                }
                _ => None,
            })
            .sum()
    }

    /// Generation and state of a number, ignoring generations
    pub(crate) fn entry(&self, number: u32) -> Option<(u16, ObjectState)> {
        self.slots
            .get(number as usize)
            .map(|slot| (slot.generation, slot.observed_state()))
    }

    /// Materialize if needed and hand out the live object for flushing.
    pub(crate) fn live_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        let index = self.index_of(id)?;
        self.materialize(index)?;
        match &mut self.slots[index].state {
            SlotState::Live { object, .. } => Ok(object),
            SlotState::Flushed { .. } => Err(PdfError::FlushedObjectMutation(id)),
            SlotState::Free => Err(PdfError::InvalidOperation(format!(
                "object {id} is free"
            ))),
            _ => Err(PdfError::BrokenReference(id)),
        }
    }

    /// Record that a live object has been written.
    pub(crate) fn mark_flushed(
        &mut self,
        id: ObjectId,
        record: FlushRecord,
        released: usize,
    ) -> Result<()> {
        let index = self.index_of(id)?;
        let slot = &mut self.slots[index];
        if !matches!(slot.state, SlotState::Live { .. }) {
            return Err(PdfError::InvalidOperation(format!("{id} is not live")));
        }
        let state = std::mem::replace(&mut slot.state, SlotState::Reserved);
        if let SlotState::Live { object, .. } = state {
            slot.state = SlotState::Flushed { object, record };
        }
        self.stats.flushes += 1;
        self.stats.bytes_released += released;
        Ok(())
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        if id.number() == 0 {
            return None;
        }
        self.slots
            .get(id.number() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    fn index_of(&self, id: ObjectId) -> Result<usize> {
        if id.number() == 0 {
            return Err(PdfError::BrokenReference(id));
        }
        let index = id.number() as usize;
        let slot = self
            .slots
            .get(index)
            .ok_or(PdfError::BrokenReference(id))?;
        if slot.generation != id.generation() {
            return Err(PdfError::StaleReference {
                reference: id,
                current: slot.generation,
            });
        }
        Ok(index)
    }

    /// Parse an unmaterialized slot from the backing source. Parses at most
    /// once: the slot is live afterwards.
    fn materialize(&mut self, index: usize) -> Result<()> {
        let (offset, end) = match self.slots[index].state {
            SlotState::Unmaterialized { offset, end } => (offset, end),
            _ => return Ok(()),
        };
        let expected = ObjectId::new(index as u32, self.slots[index].generation);
        let source = self.source.as_mut().ok_or_else(|| {
            PdfError::InvalidStructure(format!("no backing source for {expected}"))
        })?;

        let total = source.len();
        let mut window = usize::try_from(end.saturating_sub(offset))
            .unwrap_or(usize::MAX)
            .max(64);

        let object = loop {
            let (bytes, at_end) = read_window(source.as_mut(), offset, window)?;
            let mut parser = ObjectParser::with_strict_names(&bytes, self.strict_names);
            match parser.parse_indirect() {
                Ok((header, object)) => {
                    if header != expected {
                        tracing::warn!(
                            "Object header {} at offset {} does not match {}",
                            header,
                            offset,
                            expected
                        );
                    }
                    break object;
                }
                Err(ParseError::UnexpectedEof) if !at_end && offset + (window as u64) < total => {
                    window = window.saturating_mul(2).max(self.window);
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.slots[index].state = SlotState::Live {
            object,
            dirty: false,
        };
        self.stats.lazy_loads += 1;
        tracing::debug!("Loaded {} from offset {}", expected, offset);
        Ok(())
    }
}

impl Slot {
    fn holds_object(&self) -> bool {
        matches!(
            self.state,
            SlotState::Unmaterialized { .. } | SlotState::Live { .. } | SlotState::Flushed { .. }
        )
    }

    fn observed_state(&self) -> ObjectState {
        match self.state {
            SlotState::Unmaterialized { .. } => ObjectState::Unmaterialized,
            SlotState::Reserved => ObjectState::Reserved,
            SlotState::Live { .. } => ObjectState::Live,
            SlotState::Flushed { .. } => ObjectState::Flushed,
            SlotState::Free => ObjectState::Free,
        }
    }
}

impl ObjectResolver for Registry {
    fn resolve(&mut self, id: ObjectId) -> Result<&Object> {
        Registry::resolve(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, Stream};

    fn opened(pdf: Vec<u8>) -> Registry {
        let mut source: Box<dyn ByteSource + Send> = Box::new(pdf);
        let xref = read_xref(source.as_mut(), 1024).unwrap();
        Registry::with_source(source, &xref, &DocumentOptions::default())
    }

    fn sample_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        let o1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let o2 = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n0 4\n0000000003 65535 f \n{o1:010} 00000 n \n{o2:010} 00000 n \n0000000000 00002 f \ntrailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_allocate_put_resolve() {
        let mut registry = Registry::new();
        let id = registry.allocate();
        assert_eq!(id, ObjectId::new(1, 0));
        assert_eq!(registry.state(id), Some(ObjectState::Reserved));
        assert!(matches!(
            registry.resolve(id),
            Err(PdfError::BrokenReference(_))
        ));

        registry.put(id, Object::integer(7)).unwrap();
        assert_eq!(registry.resolve(id).unwrap(), &Object::integer(7));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn test_number_zero_is_never_an_object() {
        let mut registry = Registry::new();
        let zero = ObjectId::new(0, 65535);
        assert!(matches!(
            registry.resolve(zero),
            Err(PdfError::BrokenReference(_))
        ));
        assert!(registry.put(zero, Object::Null).is_err());
        assert_eq!(registry.allocate().number(), 1);
    }

    #[test]
    fn test_free_and_reuse() {
        let mut registry = Registry::new();
        let r1 = registry.add(Object::integer(1));
        let r2 = registry.add(Object::integer(2));
        registry.free(r1).unwrap();

        assert!(matches!(
            registry.resolve(r1),
            Err(PdfError::StaleReference { current: 1, .. })
        ));

        let r3 = registry.allocate();
        assert_eq!(r3, ObjectId::new(r1.number(), 1));
        let r4 = registry.allocate();
        assert_eq!(r4, ObjectId::new(3, 0));

        registry.put(r3, Object::integer(3)).unwrap();
        assert_eq!(registry.resolve(r2).unwrap(), &Object::integer(2));
        assert_eq!(registry.resolve(r3).unwrap(), &Object::integer(3));
        assert!(registry.put(r1, Object::Null).is_err());
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut registry = Registry::new();
        let ids: Vec<_> = (0..3).map(|i| registry.add(Object::integer(i))).collect();
        registry.free(ids[2]).unwrap();
        registry.free(ids[0]).unwrap();

        assert_eq!(registry.allocate().number(), ids[2].number());
        assert_eq!(registry.allocate().number(), ids[0].number());
    }

    #[test]
    fn test_generation_65535_is_terminal() {
        let mut registry = Registry::new();
        let mut id = registry.add(Object::Null);
        let number = id.number();
        for _ in 0..(MAX_GENERATION - 1) {
            registry.free(id).unwrap();
            id = registry.allocate();
            assert_eq!(id.number(), number);
        }
        assert_eq!(id.generation(), MAX_GENERATION - 1);
        registry.free(id).unwrap();
        assert_ne!(registry.allocate().number(), number);
    }

    #[test]
    fn test_resolve_mut_marks_dirty_and_flushed_rejects() {
        let mut registry = Registry::new();
        let id = registry.add(Object::from(Dictionary::new()));
        registry
            .resolve_mut(id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("K", 1);
        assert!(registry.is_dirty(id));

        let record = FlushRecord {
            offset: 9,
            length: 20,
            payload: None,
        };
        registry.mark_flushed(id, record, 0).unwrap();
        assert_eq!(registry.state(id), Some(ObjectState::Flushed));
        assert!(matches!(
            registry.resolve_mut(id),
            Err(PdfError::FlushedObjectMutation(_))
        ));
        // still readable
        assert!(registry.resolve(id).unwrap().as_dict().is_some());

        registry.revive(id).unwrap();
        assert_eq!(registry.state(id), Some(ObjectState::Live));
        assert_eq!(registry.stats().revivals, 1);
    }

    #[test]
    fn test_revive_requires_payload() {
        let mut registry = Registry::new();
        let id = registry.add(Object::from(Stream::new(b"abc".to_vec())));
        let released = registry
            .live_object_mut(id)
            .unwrap()
            .as_stream_mut()
            .unwrap()
            .release_payload();
        let record = FlushRecord {
            offset: 0,
            length: 40,
            payload: Some(10..13),
        };
        registry.mark_flushed(id, record, released).unwrap();
        assert!(registry.needs_rehydration(id));
        assert!(registry.revive(id).is_err());

        registry.rehydrate(id, b"abc".to_vec()).unwrap();
        registry.revive(id).unwrap();
        assert_eq!(
            registry.resolve(id).unwrap().as_stream().unwrap().data(),
            b"abc"
        );
        assert_eq!(registry.stats().bytes_released, 3);
    }

    #[test]
    fn test_only_one_rehydrated_payload_is_resident() {
        let mut registry = Registry::new();
        let mut ids = Vec::new();
        for i in 0..8u8 {
            let id = registry.add(Object::from(Stream::new(vec![i; 1000])));
            let released = registry
                .live_object_mut(id)
                .unwrap()
                .as_stream_mut()
                .unwrap()
                .release_payload();
            let record = FlushRecord {
                offset: 0,
                length: 1040,
                payload: Some(20..1020),
            };
            registry.mark_flushed(id, record, released).unwrap();
            ids.push(id);
        }
        assert_eq!(registry.resident_payload_bytes(), 0);

        for (i, &id) in ids.iter().enumerate() {
            registry.rehydrate(id, vec![i as u8; 1000]).unwrap();
            assert_eq!(registry.resident_payload_bytes(), 1000);
        }
        assert!(registry.needs_rehydration(ids[0]));
        assert!(!registry.needs_rehydration(ids[7]));

        assert_eq!(registry.release_rehydrated(), 1000);
        assert_eq!(registry.resident_payload_bytes(), 0);
        assert_eq!(registry.release_rehydrated(), 0);
    }

    #[test]
    fn test_revived_payload_is_not_released_again() {
        let mut registry = Registry::new();
        let id = registry.add(Object::from(Stream::new(b"abc".to_vec())));
        let released = registry
            .live_object_mut(id)
            .unwrap()
            .as_stream_mut()
            .unwrap()
            .release_payload();
        let record = FlushRecord {
            offset: 0,
            length: 40,
            payload: Some(10..13),
        };
        registry.mark_flushed(id, record, released).unwrap();
        registry.rehydrate(id, b"abc".to_vec()).unwrap();
        registry.revive(id).unwrap();

        assert_eq!(registry.release_rehydrated(), 0);
        assert_eq!(
            registry.resolve(id).unwrap().as_stream().unwrap().data(),
            b"abc"
        );
    }

    #[test]
    fn test_lazy_load_happens_once() {
        let mut registry = opened(sample_pdf());
        let catalog = ObjectId::new(1, 0);
        assert_eq!(registry.state(catalog), Some(ObjectState::Unmaterialized));
        assert_eq!(registry.len(), 2);

        let pages = registry
            .resolve(catalog)
            .unwrap()
            .as_dict()
            .unwrap()
            .get_reference("Pages");
        assert_eq!(pages, Some(ObjectId::new(2, 0)));
        registry.resolve(catalog).unwrap();
        assert_eq!(registry.stats().lazy_loads, 1);
        assert!(!registry.is_dirty(catalog));

        let stream = registry.resolve(ObjectId::new(2, 0)).unwrap();
        assert_eq!(stream.as_stream().unwrap().data(), b"hello");
        assert_eq!(registry.stats().lazy_loads, 2);
    }

    #[test]
    fn test_opened_free_entries_are_reused() {
        let mut registry = opened(sample_pdf());
        // free entry 3 carries generation 2
        assert!(registry.resolve(ObjectId::new(3, 2)).unwrap().is_null());
        assert_eq!(registry.allocate(), ObjectId::new(3, 2));
        assert_eq!(registry.allocate(), ObjectId::new(4, 0));
    }

    #[test]
    fn test_slot_count_is_bounded_by_source() {
        let pdf = String::from_utf8(sample_pdf())
            .unwrap()
            .replace("/Size 4", "/Size 3000000")
            .into_bytes();
        let registry = opened(pdf);
        assert_eq!(registry.size(), 4);
        assert_eq!(registry.len(), 2);

        // a far subsection header alone cannot grow the table either
        let mut pdf = b"%PDF-1.7\n".to_vec();
        let o1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n0 2\n0000000000 65535 f \n{o1:010} 00000 n \n4000000000 1\n0000000000 00000 f \ntrailer\n<< /Size 4000000001 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        let len = pdf.len() as u32;
        let mut registry = opened(pdf);
        assert!(registry.size() <= len / 8 + 1);
        assert!(registry.resolve(ObjectId::new(1, 0)).unwrap().as_dict().is_some());
    }

    #[test]
    fn test_small_window_still_loads() {
        let pdf = sample_pdf();
        let mut source: Box<dyn ByteSource + Send> = Box::new(pdf);
        let xref = read_xref(source.as_mut(), 1024).unwrap();
        let options = DocumentOptions::default().with_source_window(1024);
        let mut registry = Registry::with_source(source, &xref, &options);
        assert!(registry.resolve(ObjectId::new(2, 0)).unwrap().as_stream().is_some());
    }

    #[test]
    fn test_resident_payload_bytes() {
        let mut registry = Registry::new();
        registry.add(Object::from(Stream::new(vec![0; 100])));
        registry.add(Object::integer(1));
        assert_eq!(registry.resident_payload_bytes(), 100);
    }

    #[test]
    fn test_registry_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Registry>();
    }
}
