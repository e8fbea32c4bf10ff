use std::sync::Arc;

use indexmap::IndexMap;

use super::callable::Kwargs;
use super::teardown;
use super::{Guarded, Identity, Key, Value};

/// Immutable sequence
#[derive(Clone)]
pub struct Tuple(pub(crate) Arc<TupleCell>);

pub(crate) struct TupleCell {
    pub(crate) items: Box<[Value]>,
}

impl Drop for TupleCell {
    fn drop(&mut self) {
        let items = std::mem::take(&mut self.items);
        if !items.is_empty() {
            teardown::release(items.into_vec());
        }
    }
}

impl Tuple {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(TupleCell {
            items: items.into_boxed_slice(),
        }))
    }

    pub fn items(&self) -> &[Value] {
        &self.0.items
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &Tuple) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Mutable sequence with identity
#[derive(Clone)]
pub struct List(pub(crate) Arc<ListCell>);

pub(crate) struct ListCell {
    pub(crate) items: Guarded<Vec<Value>>,
}

impl Drop for ListCell {
    fn drop(&mut self) {
        let items = std::mem::take(self.items.get_mut());
        if !items.is_empty() {
            teardown::release(items);
        }
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl List {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Arc::new(ListCell {
            items: Guarded::new(items),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.read().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.0.items.write().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.0.items.write().pop()
    }

    /// Insert at `index`, appending when the index is past the end
    pub fn insert(&self, index: usize, value: Value) {
        let mut items = self.0.items.write();
        let index = index.min(items.len());
        items.insert(index, value);
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut items = self.0.items.write();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Replace the item at `index`; returns false when out of range
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut items = self.0.items.write();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn extend(&self, values: impl IntoIterator<Item = Value>) {
        self.0.items.write().extend(values);
    }

    /// Remove all items, keeping the allocation
    pub fn clear(&self) {
        let items: Vec<Value> = self.0.items.write().drain(..).collect();
        teardown::release(items);
    }

    /// Point-in-time copy of the items
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.items.read().clone()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn generation(&self) -> u64 {
        self.0.items.generation()
    }

    pub(crate) fn truncate(&self, len: usize) {
        let dropped = {
            let mut items = self.0.items.write();
            if len >= items.len() {
                return;
            }
            items.split_off(len)
        };
        teardown::release(dropped);
    }

    pub(crate) fn shrink_to(&self, capacity: usize) {
        self.0.items.write().shrink_to(capacity);
    }

    pub(crate) fn capacity(&self) -> usize {
        self.0.items.read().capacity()
    }
}

/// Insertion-ordered mapping with identity
#[derive(Clone)]
pub struct Dict(pub(crate) Arc<DictCell>);

pub(crate) struct DictCell {
    pub(crate) entries: Guarded<IndexMap<Key, Value>>,
}

impl Drop for DictCell {
    fn drop(&mut self) {
        let entries = std::mem::take(self.entries.get_mut());
        if !entries.is_empty() {
            teardown::release(entries.into_values().collect());
        }
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl Dict {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Arc::new(DictCell {
            entries: Guarded::new(IndexMap::with_capacity(capacity)),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.read().is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<Value> {
        self.0.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.0.entries.read().contains_key(key)
    }

    /// Insert or replace, returning the previous value
    pub fn insert(&self, key: impl Into<Key>, value: Value) -> Option<Value> {
        self.0.entries.write().insert(key.into(), value)
    }

    /// Remove preserving the order of the remaining entries
    pub fn remove(&self, key: &Key) -> Option<Value> {
        self.0.entries.write().shift_remove(key)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.0.entries.read().keys().cloned().collect()
    }

    /// Entry at insertion position `index`
    pub fn entry_at(&self, index: usize) -> Option<(Key, Value)> {
        self.0
            .entries
            .read()
            .get_index(index)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Point-in-time copy of the entries
    pub fn snapshot(&self) -> Vec<(Key, Value)> {
        self.0
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Remove all entries, keeping the allocation
    pub fn clear(&self) {
        let values: Vec<Value> = self.0.entries.write().drain(..).map(|(_, v)| v).collect();
        teardown::release(values);
    }

    /// View the entries as keyword arguments
    ///
    /// # Errors
    ///
    /// Returns the first key that is not a string.
    pub fn to_kwargs(&self) -> std::result::Result<Kwargs, Key> {
        let entries = self.0.entries.read();
        let mut kwargs = Kwargs::with_capacity(entries.len());
        for (key, value) in entries.iter() {
            match key {
                Key::Str(name) => {
                    kwargs.insert(name.clone(), value.clone());
                }
                other => return Err(other.clone()),
            }
        }
        Ok(kwargs)
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn generation(&self) -> u64 {
        self.0.entries.generation()
    }
}

impl FromIterator<(Key, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let dict = Dict::new();
        {
            let mut entries = dict.0.entries.write();
            entries.extend(iter);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_mutators_bump_generation() {
        let list = List::from_vec(vec![Value::Int(1)]);
        let g0 = list.generation();
        list.push(Value::Int(2));
        let g1 = list.generation();
        assert!(list.set(0, Value::Int(9)));
        let g2 = list.generation();

        assert!(g0 < g1 && g1 < g2);
        assert_eq!(list.get(0), Some(Value::Int(9)));
        assert!(!list.set(7, Value::None));
    }

    #[test]
    fn test_list_truncate() {
        let list = List::from_vec((0..5).map(Value::Int).collect());
        list.truncate(2);
        assert_eq!(list.snapshot(), vec![Value::Int(0), Value::Int(1)]);
        list.truncate(10);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_dict_preserves_insertion_order() {
        let dict = Dict::new();
        dict.insert("b", Value::Int(2));
        dict.insert("a", Value::Int(1));
        dict.insert("c", Value::Int(3));
        dict.remove(&Key::from("a"));

        assert_eq!(dict.keys(), vec![Key::from("b"), Key::from("c")]);
        assert_eq!(dict.entry_at(1), Some((Key::from("c"), Value::Int(3))));
    }

    #[test]
    fn test_to_kwargs_rejects_non_string_keys() {
        let dict = Dict::new();
        dict.insert("x", Value::Int(1));
        assert_eq!(dict.to_kwargs().map(|k| k.len()), Ok(1));

        dict.insert(5, Value::Int(2));
        assert_eq!(dict.to_kwargs().err(), Some(Key::Int(5)));
    }

    #[test]
    fn test_tuple_accessors() {
        let tuple = Tuple::new(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.get(1), Some(&Value::from("a")));
        assert!(tuple.ptr_eq(&tuple.clone()));
    }
}
