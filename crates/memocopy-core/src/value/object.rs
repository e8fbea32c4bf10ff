use std::sync::Arc;

use indexmap::IndexMap;

use super::teardown;
use super::{Class, Guarded, Identity, Key, Value};

/// Instance of a user-defined class
///
/// State is split the way reductions describe it: named attributes,
/// appended items and keyed entries. All three share one mutation
/// generation.
#[derive(Clone)]
pub struct Object(pub(crate) Arc<ObjectCell>);

pub(crate) struct ObjectCell {
    pub(crate) class: Class,
    pub(crate) state: Guarded<ObjectState>,
}

#[derive(Default)]
pub(crate) struct ObjectState {
    pub(crate) attrs: IndexMap<Arc<str>, Value>,
    pub(crate) items: Vec<Value>,
    pub(crate) entries: IndexMap<Key, Value>,
}

impl ObjectState {
    fn len(&self) -> usize {
        self.attrs.len() + self.items.len() + self.entries.len()
    }

    pub(crate) fn drain_values(&mut self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.len());
        values.extend(std::mem::take(&mut self.attrs).into_values());
        values.append(&mut self.items);
        values.extend(std::mem::take(&mut self.entries).into_values());
        values
    }
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        let values = self.state.get_mut().drain_values();
        if !values.is_empty() {
            teardown::release(values);
        }
    }
}

impl Object {
    /// Create an empty instance without running any constructor
    pub fn new(class: &Class) -> Self {
        Self(Arc::new(ObjectCell {
            class: class.clone(),
            state: Guarded::new(ObjectState::default()),
        }))
    }

    pub fn class(&self) -> &Class {
        &self.0.class
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.0.state.read().attrs.get(name).cloned()
    }

    pub fn set_attr(&self, name: impl Into<Arc<str>>, value: Value) -> Option<Value> {
        self.0.state.write().attrs.insert(name.into(), value)
    }

    pub fn remove_attr(&self, name: &str) -> Option<Value> {
        self.0.state.write().attrs.shift_remove(name)
    }

    pub fn attr_count(&self) -> usize {
        self.0.state.read().attrs.len()
    }

    pub fn attr_at(&self, index: usize) -> Option<(Arc<str>, Value)> {
        self.0
            .state
            .read()
            .attrs
            .get_index(index)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub fn attrs(&self) -> Vec<(Arc<str>, Value)> {
        self.0
            .state
            .read()
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn push_item(&self, value: Value) {
        self.0.state.write().items.push(value);
    }

    pub fn item_count(&self) -> usize {
        self.0.state.read().items.len()
    }

    pub fn item_at(&self, index: usize) -> Option<Value> {
        self.0.state.read().items.get(index).cloned()
    }

    pub fn items(&self) -> Vec<Value> {
        self.0.state.read().items.clone()
    }

    pub fn set_entry(&self, key: impl Into<Key>, value: Value) -> Option<Value> {
        self.0.state.write().entries.insert(key.into(), value)
    }

    pub fn get_entry(&self, key: &Key) -> Option<Value> {
        self.0.state.read().entries.get(key).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.0.state.read().entries.len()
    }

    pub fn entry_at(&self, index: usize) -> Option<(Key, Value)> {
        self.0
            .state
            .read()
            .entries
            .get_index(index)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.0
            .state
            .read()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Total number of attrs, items and entries
    pub fn state_len(&self) -> usize {
        self.0.state.read().len()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn generation(&self) -> u64 {
        self.0.state.generation()
    }
}
