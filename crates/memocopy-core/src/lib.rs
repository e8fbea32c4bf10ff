//! memocopy core
//!
//! Memoized deep copy of arbitrary object graphs. Shared references in the
//! original stay shared in the copy, cycles are reproduced, and per-type
//! behaviour is customised with hooks and reducers.
//!
//! ```
//! use memocopy_core::{deep_copy, Value};
//!
//! let shared = Value::list([Value::Int(1)]);
//! let original = Value::list([shared.clone(), shared]);
//!
//! let copy = deep_copy(&original).unwrap();
//! let copy = copy.as_list().unwrap();
//! assert!(copy.get(0).unwrap().ptr_eq(&copy.get(1).unwrap()));
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod hooks;
pub mod logging_facility;
pub mod memo;
pub mod pinning;
pub mod registry;
pub mod value;

mod call;
mod dispatch;
pub(crate) mod guard;
mod reduce;
mod replace;
mod shallow;
mod shim;

pub use memocopy_core_types::schema;

pub use config::{ConfigError, CopyConfig, FallbackScope};
pub use engine::{Engine, EngineBuilder};
pub use errors::{
    ContainerKind, CopyError, CopyErrorKind, HookError, HookErrorKind, MutationKind,
    ProtocolMismatch, RecursionCeiling, Result,
};
pub use hooks::{CustomCopy, Reducer};
pub use memo::{Memo, MemoFlavor};
pub use pinning::{PinRegistry, PinSet};
pub use registry::{Strategy, TypeRegistry};
pub use value::{
    Callable, Class, ClassBuilder, Dict, Identity, Key, Kwargs, List, Object, Tuple, Value,
};

/// Deep-copy `value` with the process-wide engine
///
/// # Errors
///
/// See [`Engine::deep_copy`].
#[track_caller]
pub fn deep_copy(value: &Value) -> Result<Value> {
    Engine::global().deep_copy(value)
}

/// Deep-copy `value` against `memo` with the process-wide engine
///
/// # Errors
///
/// See [`Engine::deep_copy_with`].
#[track_caller]
pub fn deep_copy_with(value: &Value, memo: &Memo) -> Result<Value> {
    Engine::global().deep_copy_with(value, memo)
}

/// Shallow-copy `value` with the process-wide engine
///
/// # Errors
///
/// See [`Engine::shallow_copy`].
pub fn shallow_copy(value: &Value) -> Result<Value> {
    Engine::global().shallow_copy(value)
}

/// `count` independent deep copies of `value`
///
/// # Errors
///
/// See [`Engine::replicate`].
#[track_caller]
pub fn replicate(value: &Value, count: usize) -> Result<Vec<Value>> {
    Engine::global().replicate(value, count)
}

/// Results of calling `function` with no arguments `count` times
///
/// # Errors
///
/// See [`Engine::repeatcall`].
pub fn repeatcall(function: &Callable, count: usize) -> Result<Vec<Value>> {
    Engine::global().repeatcall(function, count)
}

/// New instance like `value` with the attributes in `changes` replaced
///
/// # Errors
///
/// See [`Engine::replace`].
pub fn replace(value: &Value, changes: &Kwargs) -> Result<Value> {
    Engine::global().replace(value, changes)
}
