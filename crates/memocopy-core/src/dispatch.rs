//! Deep-copy dispatcher
//!
//! One [`Copier`] serves one `deep_copy` invocation: it routes every value
//! to the copy procedure for its kind, consults and populates the memo,
//! and enforces the recursion and mutation guards.

use crate::call::CallContext;
use crate::engine::Engine;
use crate::errors::Result;
use crate::guard::{DepthGuard, MutationGuard};
use crate::memo::Memo;
use crate::reduce::{self, PartCopier, Parsed, Reduction};
use crate::registry::Strategy;
use crate::shim;
use crate::value::{Dict, Key, List, Object, Tuple, Value};

pub(crate) struct Copier<'a> {
    engine: &'a Engine,
    memo: &'a Memo,
    call: &'a CallContext,
}

impl<'a> Copier<'a> {
    pub(crate) fn new(engine: &'a Engine, memo: &'a Memo, call: &'a CallContext) -> Self {
        Self { engine, memo, call }
    }

    pub(crate) fn copy_value(&self, value: &Value) -> Result<Value> {
        if value.is_atomic() {
            return Ok(value.clone());
        }
        let Some(identity) = value.identity() else {
            return Ok(value.clone());
        };
        if self.engine.is_pinned(identity) {
            return Ok(value.clone());
        }
        if let Some(existing) = self.memo.get(identity) {
            if matches!(existing, Value::List(_) | Value::Dict(_) | Value::Object(_)) {
                self.call.note_resolved_container();
            }
            return Ok(existing);
        }

        let _depth = DepthGuard::enter(self.engine.config().recursion_limits())?;
        match value {
            Value::Tuple(tuple) => self.copy_tuple(value, tuple),
            Value::List(list) => self.copy_list(value, list),
            Value::Dict(dict) => self.copy_dict(value, dict),
            Value::Object(object) => self.copy_object(value, object),
            _ => Ok(value.clone()),
        }
    }

    /// Tuples whose children all copy to themselves are their own copy
    fn copy_tuple(&self, original: &Value, tuple: &Tuple) -> Result<Value> {
        let mut copied = Vec::with_capacity(tuple.len());
        let mut unchanged = true;
        for item in tuple.items() {
            let copy = self.copy_value(item)?;
            unchanged &= copy.ptr_eq(item);
            copied.push(copy);
        }
        if unchanged {
            return Ok(original.clone());
        }
        // A child may have reached this tuple through a cycle
        if let Some(existing) = self.memo.lookup(original) {
            return Ok(existing);
        }
        Ok(self
            .memo
            .remember(original, Value::Tuple(Tuple::new(copied))))
    }

    fn copy_list(&self, original: &Value, list: &List) -> Result<Value> {
        let guard = MutationGuard::begin(list);
        let clone = List::with_capacity(list.len());
        let registered = self.memo.remember(original, Value::List(clone.clone()));
        if !registered.as_list().is_some_and(|winner| winner.ptr_eq(&clone)) {
            return Ok(registered);
        }

        let mut index = 0;
        while let Some(item) = list.get(index) {
            let copy = self.copy_value(&item)?;
            guard.check()?;
            clone.push(copy);
            index += 1;
        }
        guard.check()?;
        Ok(registered)
    }

    fn copy_dict(&self, original: &Value, dict: &Dict) -> Result<Value> {
        let guard = MutationGuard::begin(dict);
        let clone = Dict::with_capacity(dict.len());
        let registered = self.memo.remember(original, Value::Dict(clone.clone()));
        if !registered.as_dict().is_some_and(|winner| winner.ptr_eq(&clone)) {
            return Ok(registered);
        }

        let mut index = 0;
        while let Some((key, value)) = dict.entry_at(index) {
            let copy = self.copy_value(&value)?;
            guard.check()?;
            clone.insert(key, copy);
            index += 1;
        }
        guard.check()?;
        Ok(registered)
    }

    fn copy_object(&self, original: &Value, object: &Object) -> Result<Value> {
        let class = object.class();
        match self.engine.registry().resolve(class) {
            Strategy::Atomic => Ok(original.clone()),
            Strategy::Hook(hook) => {
                let copy =
                    shim::invoke_hook(self.engine, &hook, class, original, self.memo, self.call)?;
                if copy.ptr_eq(original) {
                    return Ok(copy);
                }
                Ok(self.memo.remember(original, copy))
            }
            Strategy::Reduce(reducer) => {
                let descriptor = reducer.reduce(original)?;
                match Reduction::parse(descriptor, class.name())? {
                    Parsed::Global => Ok(original.clone()),
                    Parsed::Rebuild(reduction) => reduce::rebuild(
                        self,
                        original,
                        class.name(),
                        reduction,
                        class.uses_uncopied_args(),
                    ),
                }
            }
            Strategy::Structural => self.copy_object_state(original, object),
        }
    }

    /// Copy attributes, items and entries onto a fresh instance
    ///
    /// Classes with a `set_state` callback receive the copied attributes as
    /// a dict instead of having them merged.
    fn copy_object_state(&self, original: &Value, object: &Object) -> Result<Value> {
        let guard = MutationGuard::begin(object);
        let clone = Object::new(object.class());
        let registered = self.memo.remember(original, Value::Object(clone.clone()));
        if !registered.as_object().is_some_and(|winner| winner.ptr_eq(&clone)) {
            return Ok(registered);
        }

        let custom_state = object.class().has_set_state();
        let state = Dict::with_capacity(if custom_state { object.attr_count() } else { 0 });
        let mut index = 0;
        while let Some((name, value)) = object.attr_at(index) {
            let copy = self.copy_value(&value)?;
            guard.check()?;
            if custom_state {
                state.insert(Key::Str(name), copy);
            } else {
                clone.set_attr(name, copy);
            }
            index += 1;
        }

        let mut index = 0;
        while let Some(item) = object.item_at(index) {
            let copy = self.copy_value(&item)?;
            guard.check()?;
            clone.push_item(copy);
            index += 1;
        }

        let mut index = 0;
        while let Some((key, value)) = object.entry_at(index) {
            let copy = self.copy_value(&value)?;
            guard.check()?;
            clone.set_entry(key, copy);
            index += 1;
        }
        guard.check()?;

        if custom_state {
            if let Some(outcome) = object.class().apply_state(&clone, Value::Dict(state)) {
                outcome?;
            }
        }
        Ok(registered)
    }
}

impl PartCopier for Copier<'_> {
    fn copy_part(&self, part: &Value) -> Result<Value> {
        self.copy_value(part)
    }

    fn register(&self, original: &Value, clone: Value) -> Value {
        self.memo.remember(original, clone)
    }
}
