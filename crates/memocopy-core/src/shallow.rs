//! One-level copies
//!
//! A shallow copy creates a new container whose children are the
//! original's children. Tuples and atomic values are their own shallow
//! copy. Objects use, in order, the class's shallow hook, an atomic
//! declaration, the reducer, or a plain copy of their state.

use crate::engine::Engine;
use crate::errors::Result;
use crate::reduce::{self, PartCopier, Parsed, Reduction};
use crate::registry::Strategy;
use crate::value::{Dict, List, Object, Value};

/// Reduction parts pass through unchanged
struct ShallowParts;

impl PartCopier for ShallowParts {
    fn copy_part(&self, part: &Value) -> Result<Value> {
        Ok(part.clone())
    }

    fn register(&self, _original: &Value, clone: Value) -> Value {
        clone
    }
}

pub(crate) fn shallow_copy(engine: &Engine, value: &Value) -> Result<Value> {
    match value {
        Value::List(list) => Ok(Value::List(List::from_vec(list.snapshot()))),
        Value::Dict(dict) => Ok(Value::Dict(dict.snapshot().into_iter().collect::<Dict>())),
        Value::Object(object) => shallow_copy_object(engine, value, object),
        _ => Ok(value.clone()),
    }
}

fn shallow_copy_object(engine: &Engine, value: &Value, object: &Object) -> Result<Value> {
    let class = object.class();
    if let Some(hook) = class.shallow_hook() {
        return hook(value);
    }

    match engine.registry().resolve(class) {
        Strategy::Atomic => Ok(value.clone()),
        Strategy::Reduce(reducer) => match Reduction::parse(reducer.reduce(value)?, class.name())? {
            Parsed::Global => Ok(value.clone()),
            Parsed::Rebuild(reduction) => {
                reduce::rebuild(&ShallowParts, value, class.name(), reduction, true)
            }
        },
        Strategy::Hook(_) | Strategy::Structural => {
            let clone = Object::new(class);
            for (name, attr) in object.attrs() {
                clone.set_attr(name, attr);
            }
            for item in object.items() {
                clone.push_item(item);
            }
            for (key, entry) in object.entries() {
                clone.set_entry(key, entry);
            }
            Ok(Value::Object(clone))
        }
    }
}
