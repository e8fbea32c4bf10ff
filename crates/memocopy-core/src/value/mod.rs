//! Host value model
//!
//! The engine copies graphs of [`Value`]s. Scalars, strings, bytes,
//! callables and classes are atomic and are never copied. Tuples are
//! immutable but may hold mutable children. Lists, dicts and objects are
//! mutable, carry an identity and are guarded by a mutation generation.
//!
//! Identity is the address of the shared allocation, so it stays stable for
//! as long as a strong reference is held. The keepalive ledger relies on
//! that.

mod callable;
mod class;
mod containers;
pub(crate) mod cycles;
mod debug;
mod equality;
mod guarded;
mod object;
mod teardown;

use std::fmt;
use std::sync::Arc;

pub use callable::{Callable, Kwargs};
pub use class::{Class, ClassBuilder};
pub use containers::{Dict, List, Tuple};
pub use cycles::{collect, tracked_count, COLLECT_THRESHOLD};
pub use object::Object;

pub(crate) use callable::invoke;
pub(crate) use guarded::Guarded;

/// Address-equivalent identity of a shared allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    pub(crate) fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A node in a copyable object graph
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Callable(Callable),
    Class(Class),
    Tuple(Tuple),
    List(List),
    Dict(Dict),
    Object(Object),
}

impl Value {
    /// Build a list value
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(List::from_vec(items.into_iter().collect()))
    }

    /// Build a tuple value
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Tuple(Tuple::new(items.into_iter().collect()))
    }

    /// Build a dict value, later duplicates overwrite earlier ones
    pub fn dict(entries: impl IntoIterator<Item = (Key, Value)>) -> Value {
        let dict = Dict::new();
        for (key, value) in entries {
            dict.insert(key, value);
        }
        Value::Dict(dict)
    }

    pub fn bytes(data: impl Into<Arc<[u8]>>) -> Value {
        Value::Bytes(data.into())
    }

    /// Atomic values are returned as-is by every copy operation.
    ///
    /// Objects whose class is declared atomic are resolved by the registry,
    /// not here.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Value::None
                | Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Bytes(_)
                | Value::Callable(_)
                | Value::Class(_)
        )
    }

    /// Identity of the underlying allocation, `None` for inline scalars
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
            Value::Str(s) => Some(Identity::of(Arc::as_ptr(s))),
            Value::Bytes(b) => Some(Identity::of(Arc::as_ptr(b))),
            Value::Callable(c) => Some(c.identity()),
            Value::Class(c) => Some(c.identity()),
            Value::Tuple(t) => Some(t.identity()),
            Value::List(l) => Some(l.identity()),
            Value::Dict(d) => Some(d.identity()),
            Value::Object(o) => Some(o.identity()),
        }
    }

    /// Identity comparison ("is")
    ///
    /// Inline scalars have no identity of their own and compare by value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Type name used in error messages; objects report their class name
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::Callable(_) => "callable".to_string(),
            Value::Class(_) => "class".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Object(o) => o.class().name().to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::Str(v)
    }
}

impl From<Callable> for Value {
    fn from(v: Callable) -> Self {
        Value::Callable(v)
    }
}

impl From<Class> for Value {
    fn from(v: Class) -> Self {
        Value::Class(v)
    }
}

impl From<Tuple> for Value {
    fn from(v: Tuple) -> Self {
        Value::Tuple(v)
    }
}

impl From<List> for Value {
    fn from(v: List) -> Self {
        Value::List(v)
    }
}

impl From<Dict> for Value {
    fn from(v: Dict) -> Self {
        Value::Dict(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Key> for Value {
    fn from(v: Key) -> Self {
        v.to_value()
    }
}

/// Hashable dict key
///
/// Keys are immutable, so copying a dict passes its keys through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Tuple(Arc<[Key]>),
}

impl Key {
    /// Convert a value into a key; `None` if the value is unhashable
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::None => Some(Key::None),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Bytes(b) => Some(Key::Bytes(b.clone())),
            Value::Tuple(t) => t
                .items()
                .iter()
                .map(Key::from_value)
                .collect::<Option<Vec<_>>>()
                .map(|keys| Key::Tuple(keys.into())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Bytes(b) => Value::Bytes(b.clone()),
            Key::Tuple(keys) => Value::tuple(keys.iter().map(Key::to_value)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Key::None => "none",
            Key::Bool(_) => "bool",
            Key::Int(_) => "int",
            Key::Str(_) => "str",
            Key::Bytes(_) => "bytes",
            Key::Tuple(_) => "tuple",
        }
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(Arc::from(v))
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(Arc::from(v))
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(i64::from(v))
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}
