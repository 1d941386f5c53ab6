//! Copying object subgraphs between documents
//!
//! Everything reachable from a root through indirect references is copied
//! into the destination registry under fresh numbers. Each source reference
//! is mapped exactly once, so shared objects stay shared and cycles close on
//! the copies.
//!
//! # Example
//!
//! ```rust
//! use pdf_objgraph::{copy_subgraph, Dictionary, Object, Registry};
//!
//! # fn main() -> pdf_objgraph::Result<()> {
//! let mut source = Registry::new();
//! let font = source.add(Object::from(Dictionary::new()));
//! let mut page = Dictionary::new();
//! page.set("Font", font);
//! let page = source.add(Object::from(page));
//!
//! let mut dest = Registry::new();
//! dest.add(Object::Null);
//! let copied = copy_subgraph(page, &mut source, &mut dest)?;
//! assert_eq!(dest.len(), 3);
//! assert!(dest.resolve(copied)?.as_dict().is_some());
//! # Ok(())
//! # }
//! ```

use crate::error::{PdfError, Result};
use crate::objects::ObjectId;
use crate::registry::{ObjectResolver, Registry};
use std::collections::HashMap;

/// Options for a subgraph copy
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Keys removed from the root dictionary before it is copied, e.g. a
    /// page's `Parent`
    pub exclude_keys: Vec<String>,
}

impl CopyOptions {
    pub fn exclude_key(mut self, key: impl Into<String>) -> Self {
        self.exclude_keys.push(key.into());
        self
    }
}

/// Copies subgraphs from one source into one destination, remembering every
/// mapping across calls.
#[derive(Debug, Default)]
pub struct SubgraphCopier {
    map: HashMap<ObjectId, ObjectId>,
    options: CopyOptions,
}

impl SubgraphCopier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CopyOptions) -> Self {
        Self {
            map: HashMap::new(),
            options,
        }
    }

    /// Copy everything reachable from `root` and return the root's new
    /// reference. Objects copied by earlier calls are reused.
    ///
    /// On failure, numbers allocated by this call are freed again and the
    /// destination is left as it was.
    pub fn copy<S: ObjectResolver + ?Sized>(
        &mut self,
        root: ObjectId,
        source: &mut S,
        dest: &mut Registry,
    ) -> Result<ObjectId> {
        if let Some(&mapped) = self.map.get(&root) {
            return Ok(mapped);
        }

        let mut allocated = Vec::new();
        match self.copy_reachable(root, source, dest, &mut allocated) {
            Ok(copied) => {
                tracing::debug!("Copied {} objects from {} as {}", allocated.len(), root, copied);
                Ok(copied)
            }
            Err(err) => {
                for (source_id, dest_id) in allocated {
                    self.map.remove(&source_id);
                    if let Err(free_err) = dest.free(dest_id) {
                        tracing::warn!("Could not release {} after failed copy: {}", dest_id, free_err);
                    }
                }
                Err(err)
            }
        }
    }

    fn copy_reachable<S: ObjectResolver + ?Sized>(
        &mut self,
        root: ObjectId,
        source: &mut S,
        dest: &mut Registry,
        allocated: &mut Vec<(ObjectId, ObjectId)>,
    ) -> Result<ObjectId> {
        let root_copy = dest.allocate();
        self.map.insert(root, root_copy);
        allocated.push((root, root_copy));

        let mut pending = vec![root];
        while let Some(source_id) = pending.pop() {
            let mut object = source.resolve(source_id)?.clone();
            if object.as_stream().is_some_and(|s| s.is_released()) {
                return Err(PdfError::InvalidOperation(format!(
                    "payload of {source_id} is not available for copying"
                )));
            }

            if source_id == root {
                if let Some(dict) = object.as_dict_mut() {
                    for key in &self.options.exclude_keys {
                        dict.remove(key);
                    }
                }
            }

            let map = &mut self.map;
            object.map_references(|reference| {
                *map.entry(reference).or_insert_with(|| {
                    let copy = dest.allocate();
                    allocated.push((reference, copy));
                    pending.push(reference);
                    copy
                })
            });

            let target = self
                .map
                .get(&source_id)
                .copied()
                .ok_or(PdfError::BrokenReference(source_id))?;
            dest.put(target, object)?;
        }

        Ok(root_copy)
    }

    /// Destination reference for a source reference, if it was copied
    pub fn mapping(&self, source: ObjectId) -> Option<ObjectId> {
        self.map.get(&source).copied()
    }

    /// Number of objects copied so far
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Copy the subgraph rooted at `root` from `source` into `dest`.
pub fn copy_subgraph<S: ObjectResolver + ?Sized>(
    root: ObjectId,
    source: &mut S,
    dest: &mut Registry,
) -> Result<ObjectId> {
    SubgraphCopier::new().copy(root, source, dest)
}
