//! Extension points for per-type copy behaviour
//!
//! A class can take over its own deep copy with a [`CustomCopy`] hook, or
//! describe how to rebuild itself with a [`Reducer`]. Both can be attached
//! to the class when it is built, or registered on an engine afterwards.
//!
//! Plain closures implement both traits.

use crate::engine::Engine;
use crate::errors::Result;
use crate::memo::Memo;
use crate::value::Value;

/// Per-type deep-copy hook
///
/// The hook produces the whole copy of `value`. The engine does not recurse
/// into the result. Children should be copied with
/// [`Engine::deep_copy_with`] and the memo the hook was handed, so shared
/// references and cycles resolve to the same clones.
///
/// The memo must be treated as opaque. Hooks that insist on a particular
/// memo shape and fail with a type-mismatch or assertion error are retried
/// with a default-shaped memo (see [`crate::CopyConfig::memo_fallback`]).
///
/// # Example
///
/// ```
/// use memocopy_core::{Class, Engine, Memo, Object, Value};
///
/// let counter = Class::builder("Counter")
///     .hook(|engine: &Engine, value: &Value, memo: &Memo| {
///         let original = value.as_object().expect("hook only sees Counters");
///         let copy = Object::new(original.class());
///         let count = original.get_attr("count").unwrap_or_default();
///         copy.set_attr("count", engine.deep_copy_with(&count, memo)?);
///         Ok(Value::Object(copy))
///     })
///     .build();
///
/// let obj = Object::new(&counter);
/// obj.set_attr("count", Value::Int(3));
/// let copy = Engine::default().deep_copy(&Value::Object(obj)).unwrap();
/// assert_eq!(copy.as_object().unwrap().get_attr("count"), Some(Value::Int(3)));
/// ```
pub trait CustomCopy: Send + Sync {
    /// Produce the deep copy of `value`
    ///
    /// # Errors
    ///
    /// Any error is propagated to the caller of the copy unchanged.
    fn deep_copy(&self, engine: &Engine, value: &Value, memo: &Memo) -> Result<Value>;
}

impl<F> CustomCopy for F
where
    F: Fn(&Engine, &Value, &Memo) -> Result<Value> + Send + Sync,
{
    fn deep_copy(&self, engine: &Engine, value: &Value, memo: &Memo) -> Result<Value> {
        self(engine, value, memo)
    }
}

/// Produces a reduction descriptor for a value
///
/// The descriptor is either a string, meaning "return the original", or a
/// tuple `(constructor, args[, state[, list_items[, dict_items]]])`.
pub trait Reducer: Send + Sync {
    /// Describe how to rebuild `value`
    ///
    /// # Errors
    ///
    /// Any error is propagated to the caller of the copy unchanged.
    fn reduce(&self, value: &Value) -> Result<Value>;
}

impl<F> Reducer for F
where
    F: Fn(&Value) -> Result<Value> + Send + Sync,
{
    fn reduce(&self, value: &Value) -> Result<Value> {
        self(value)
    }
}
