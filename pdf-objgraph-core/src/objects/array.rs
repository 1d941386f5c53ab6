use crate::objects::{Object, ObjectId};

/// Ordered sequence of direct values and references.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    elements: Vec<Object>,
}

impl Array {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, object: impl Into<Object>) {
        self.elements.push(object.into());
    }

    pub fn pop(&mut self) -> Option<Object> {
        self.elements.pop()
    }

    pub fn insert(&mut self, index: usize, object: impl Into<Object>) {
        self.elements.insert(index, object.into());
    }

    pub fn remove(&mut self, index: usize) -> Object {
        self.elements.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&Object> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.elements.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Object> {
        self.elements.iter_mut()
    }

    pub fn as_slice(&self) -> &[Object] {
        &self.elements
    }

    /// References held directly as elements, in order.
    pub fn references(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.elements.iter().filter_map(Object::as_reference)
    }

    /// Drop every element equal to `reference`. Returns how many were removed.
    pub fn remove_reference(&mut self, reference: ObjectId) -> usize {
        let before = self.elements.len();
        self.elements
            .retain(|obj| obj.as_reference() != Some(reference));
        before - self.elements.len()
    }
}

impl From<Vec<Object>> for Array {
    fn from(elements: Vec<Object>) -> Self {
        Self { elements }
    }
}

impl From<Array> for Vec<Object> {
    fn from(array: Array) -> Self {
        array.elements
    }
}

impl FromIterator<Object> for Array {
    fn from_iter<T: IntoIterator<Item = Object>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Array {
    type Item = Object;
    type IntoIter = std::vec::IntoIter<Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a mut Array {
    type Item = &'a mut Object;
    type IntoIter = std::slice::IterMut<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter_mut()
    }
}

#[cfg(test)]
mod tests;
