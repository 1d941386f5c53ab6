use crate::objects::{Array, Name, Object, ObjectId};
use indexmap::IndexMap;

/// PDF dictionary.
///
/// Entries keep their insertion order for serialization. Lookup and equality
/// ignore order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: IndexMap<Name, Object>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, key: impl Into<Name>, value: impl Into<Object>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.entries.values_mut()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&Name, &mut Object)> {
        self.entries.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.entries.iter()
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(|obj| {
            if let Object::Dictionary(dict) = obj {
                Some(dict)
            } else {
                None
            }
        })
    }

    pub fn get_dict_mut(&mut self, key: &str) -> Option<&mut Dictionary> {
        match self.get_mut(key) {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        }
    }

    pub fn get_array(&self, key: &str) -> Option<&Array> {
        self.get(key).and_then(Object::as_array)
    }

    pub fn get_name(&self, key: &str) -> Option<&Name> {
        self.get(key).and_then(Object::as_name)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Object::as_reference)
    }

    /// Value of `/Type`, if it is a name.
    pub fn get_type(&self) -> Option<&str> {
        self.get_name("Type").map(Name::as_str)
    }

    /// Copy in every entry of `other` whose key is not already present.
    pub fn merge_different(&mut self, other: &Dictionary) -> &mut Self {
        for (key, value) in other.iter() {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// References stored directly as values (not inside nested containers).
    pub fn references(&self) -> impl Iterator<Item = (&Name, ObjectId)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_reference().map(|id| (key, id)))
    }
}

impl FromIterator<(Name, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Name, Object)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}
