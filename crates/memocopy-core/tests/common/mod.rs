use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use memocopy_core::{Class, CopyError, Engine, Memo, MemoFlavor, Object, Value};

/// A chain of `depth` nested lists, built without recursion
#[allow(dead_code)]
pub fn nested(depth: usize) -> Value {
    let mut value = Value::list([]);
    for _ in 1..depth {
        value = Value::list([value]);
    }
    value
}

/// Number of nested list levels below `value`, counted iteratively
#[allow(dead_code)]
pub fn nesting_depth(value: &Value) -> usize {
    let mut depth = 0;
    let mut current = value.clone();
    while let Some(list) = current.as_list() {
        depth += 1;
        match list.get(0) {
            Some(next) => current = next,
            None => break,
        }
    }
    depth
}

/// Hook invocation counter
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Invocations(Arc<AtomicUsize>);

#[allow(dead_code)]
impl Invocations {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Class whose hook copies its `payload` attribute, but only with a
/// default-shaped memo; the native memo is rejected with a type mismatch
///
/// Each call gets a distinct class name so captured diagnostics can be
/// attributed to a single test.
#[allow(dead_code)]
pub fn picky_class(name: &str) -> (Class, Invocations) {
    let invocations = Invocations::default();
    let counter = invocations.clone();
    let class = Class::builder(name)
        .module("tests")
        .hook(move |engine: &Engine, value: &Value, memo: &Memo| {
            counter.bump();
            let original = value
                .as_object()
                .ok_or_else(|| CopyError::type_mismatch("expected an object"))?;
            // Copy first so a rejection leaves partial registrations behind
            let payload = original.get_attr("payload").unwrap_or_default();
            let payload = engine.deep_copy_with(&payload, memo)?;
            if memo.flavor() != MemoFlavor::Dict {
                return Err(CopyError::type_mismatch("memo must be a dict"));
            }
            let copy = Object::new(original.class());
            copy.set_attr("payload", payload);
            Ok(Value::Object(copy))
        })
        .build();
    (class, invocations)
}

/// Instance of `class` carrying `payload`
#[allow(dead_code)]
pub fn instance(class: &Class, payload: Value) -> Value {
    let object = Object::new(class);
    object.set_attr("payload", payload);
    Value::Object(object)
}

/// Class rebuilt through a reducer: `(constructor, (), attrs)`
#[allow(dead_code)]
pub fn reduced_class(name: &str) -> Class {
    Class::builder(name)
        .reducer(|value: &Value| {
            let object = value
                .as_object()
                .ok_or_else(|| CopyError::type_mismatch("expected an object"))?;
            let state = Value::dict(
                object
                    .attrs()
                    .into_iter()
                    .map(|(name, attr)| (memocopy_core::Key::Str(name), attr)),
            );
            Ok(Value::tuple([
                Value::Callable(object.class().constructor()),
                Value::tuple([]),
                state,
            ]))
        })
        .build()
}
