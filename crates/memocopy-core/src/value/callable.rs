use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use super::{Identity, Value};
use crate::errors::{CopyError, Result};

/// Keyword arguments passed to a callable
pub type Kwargs = IndexMap<Arc<str>, Value>;

type NativeFn = dyn Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallableKind {
    Native,
    NewObjEx,
}

/// Named native function
///
/// Callables are atomic: copies share them.
#[derive(Clone)]
pub struct Callable(Arc<CallableInner>);

struct CallableInner {
    name: String,
    kind: CallableKind,
    func: Box<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(CallableInner {
            name: name.into(),
            kind: CallableKind::Native,
            func: Box::new(func),
        }))
    }

    /// The `(constructor, args, kwargs)` constructor form
    ///
    /// A reduction whose first element is this callable takes a 3-tuple of
    /// arguments and calls `constructor(*args, **kwargs)`. Calling it
    /// directly does the same.
    pub fn new_obj_ex() -> Self {
        static NEW_OBJ_EX: OnceLock<Callable> = OnceLock::new();
        NEW_OBJ_EX
            .get_or_init(|| {
                Self(Arc::new(CallableInner {
                    name: "new_obj_ex".to_string(),
                    kind: CallableKind::NewObjEx,
                    func: Box::new(call_new_obj_ex),
                }))
            })
            .clone()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Invoke the function
    ///
    /// # Errors
    ///
    /// Returns whatever the function raises.
    pub fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        (self.0.func)(args, kwargs)
    }

    pub fn is_new_obj_ex(&self) -> bool {
        self.0.kind == CallableKind::NewObjEx
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Call `target` if it is a callable or a class
pub(crate) fn invoke(target: &Value, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    match target {
        Value::Callable(callable) => callable.call(args, kwargs),
        Value::Class(class) => class.instantiate(args, kwargs),
        other => Err(CopyError::type_mismatch(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn call_new_obj_ex(args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
    let [target, call_args, call_kwargs] = args else {
        return Err(CopyError::type_mismatch(format!(
            "new_obj_ex expected 3 arguments, got {}",
            args.len()
        )));
    };
    let Value::Tuple(call_args) = call_args else {
        return Err(CopyError::type_mismatch(format!(
            "new_obj_ex args must be a tuple, not {}",
            call_args.type_name()
        )));
    };
    let kwargs = match call_kwargs {
        Value::Dict(dict) => dict.to_kwargs().map_err(|key| {
            CopyError::type_mismatch(format!("keywords must be strings, not {}", key.type_name()))
        })?,
        other => {
            return Err(CopyError::type_mismatch(format!(
                "new_obj_ex kwargs must be a dict, not {}",
                other.type_name()
            )))
        }
    };
    invoke(target, call_args.items(), &kwargs)
}
