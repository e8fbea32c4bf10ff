//! Reduction-driven reconstruction
//!
//! A reducer describes an object as
//! `(constructor, args[, state[, list_items[, dict_items]]])`, or as a
//! string meaning the object is a global and is returned as-is. Absent and
//! `None` trailing elements are equivalent. When the constructor is
//! [`Callable::new_obj_ex`](crate::Callable::new_obj_ex) the args must be
//! `(target, args, kwargs)` and the target is called with them.
//!
//! The same reconstruction serves deep and shallow copies; a [`PartCopier`]
//! decides how each part is copied.

use crate::errors::{CopyError, ProtocolMismatch, Result};
use crate::guard::MutationGuard;
use crate::value::{invoke, Dict, Key, Kwargs, List, Object, Tuple, Value};

/// How the parts of a reduction are copied
pub(crate) trait PartCopier {
    fn copy_part(&self, part: &Value) -> Result<Value>;

    /// Register `clone` as the copy of `original`, returning the winner
    fn register(&self, original: &Value, clone: Value) -> Value;
}

/// A validated reduction descriptor
pub(crate) enum Parsed {
    /// The reducer named a global; the original is its own copy
    Global,
    Rebuild(Reduction),
}

pub(crate) struct Reduction {
    constructor: Constructor,
    state: Option<Value>,
    list_items: Option<Value>,
    dict_items: Option<Value>,
}

enum Constructor {
    Call {
        target: Value,
        args: Tuple,
    },
    NewObjEx {
        target: Value,
        args: Tuple,
        kwargs: Dict,
    },
}

fn is_callable(value: &Value) -> bool {
    matches!(value, Value::Callable(_) | Value::Class(_))
}

impl Reduction {
    /// Validate the shape of a reducer's output
    pub(crate) fn parse(descriptor: Value, type_name: &str) -> Result<Parsed> {
        let tuple = match descriptor {
            Value::Str(_) => return Ok(Parsed::Global),
            Value::Tuple(tuple) => tuple,
            other => {
                return Err(CopyError::protocol(
                    type_name,
                    ProtocolMismatch::NotTupleOrString {
                        type_name: type_name.to_string(),
                        got: other.type_name(),
                    },
                ))
            }
        };

        let items = tuple.items();
        if !(2..=5).contains(&items.len()) {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::BadArity {
                    type_name: type_name.to_string(),
                    len: items.len(),
                },
            ));
        }

        let target = &items[0];
        if !is_callable(target) {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::NotCallable {
                    type_name: type_name.to_string(),
                    got: target.type_name(),
                },
            ));
        }
        let Value::Tuple(args) = &items[1] else {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::ArgsNotTuple {
                    type_name: type_name.to_string(),
                    got: items[1].type_name(),
                },
            ));
        };

        let constructor = match target {
            Value::Callable(callable) if callable.is_new_obj_ex() => {
                parse_new_obj_ex(args, type_name)?
            }
            _ => Constructor::Call {
                target: target.clone(),
                args: args.clone(),
            },
        };

        let optional = |index: usize| items.get(index).filter(|v| !v.is_none()).cloned();
        let reduction = Reduction {
            constructor,
            state: optional(2),
            list_items: optional(3),
            dict_items: optional(4),
        };

        if let Some(list_items) = &reduction.list_items {
            if !matches!(list_items, Value::List(_) | Value::Tuple(_)) {
                return Err(CopyError::protocol(
                    type_name,
                    ProtocolMismatch::ListItemsNotIterable {
                        type_name: type_name.to_string(),
                        got: list_items.type_name(),
                    },
                ));
            }
        }
        if let Some(dict_items) = &reduction.dict_items {
            if !matches!(dict_items, Value::Dict(_) | Value::List(_) | Value::Tuple(_)) {
                return Err(CopyError::protocol(
                    type_name,
                    ProtocolMismatch::DictItemsNotIterable {
                        type_name: type_name.to_string(),
                        got: dict_items.type_name(),
                    },
                ));
            }
        }

        Ok(Parsed::Rebuild(reduction))
    }
}

fn parse_new_obj_ex(args: &Tuple, type_name: &str) -> Result<Constructor> {
    let [target, call_args, kwargs] = args.items() else {
        return Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::NewObjExArity {
                type_name: type_name.to_string(),
                len: args.len(),
            },
        ));
    };
    if !is_callable(target) {
        return Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::NewObjExNotCallable {
                type_name: type_name.to_string(),
                got: target.type_name(),
            },
        ));
    }
    let Value::Tuple(call_args) = call_args else {
        return Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::NewObjExArgsNotTuple {
                type_name: type_name.to_string(),
                got: call_args.type_name(),
            },
        ));
    };
    let Value::Dict(kwargs) = kwargs else {
        return Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::NewObjExKwargsNotDict {
                type_name: type_name.to_string(),
                got: kwargs.type_name(),
            },
        ));
    };
    Ok(Constructor::NewObjEx {
        target: target.clone(),
        args: call_args.clone(),
        kwargs: kwargs.clone(),
    })
}

/// Rebuild `original` from its reduction
///
/// The clone is registered before state and items are copied, so cycles
/// back to `original` through them resolve to the clone. Cycles through
/// the constructor args are only safe with `uncopied_args`.
pub(crate) fn rebuild<C: PartCopier>(
    copier: &C,
    original: &Value,
    type_name: &str,
    reduction: Reduction,
    uncopied_args: bool,
) -> Result<Value> {
    let clone = construct(copier, &reduction.constructor, type_name, uncopied_args)?;
    let registered = copier.register(original, clone.clone());
    if !registered.ptr_eq(&clone) {
        return Ok(registered);
    }

    if let Some(state) = &reduction.state {
        apply_state(copier, &clone, state, type_name)?;
    }
    if let Some(items) = &reduction.list_items {
        append_items(copier, &clone, items, type_name)?;
    }
    if let Some(items) = &reduction.dict_items {
        set_dict_items(copier, &clone, items, type_name)?;
    }
    Ok(clone)
}

fn construct<C: PartCopier>(
    copier: &C,
    constructor: &Constructor,
    type_name: &str,
    uncopied_args: bool,
) -> Result<Value> {
    match constructor {
        Constructor::Call { target, args } => {
            let args = if uncopied_args {
                args.items().to_vec()
            } else {
                copy_args(copier, args)?
            };
            invoke(target, &args, &Kwargs::new())
        }
        Constructor::NewObjEx {
            target,
            args,
            kwargs,
        } => {
            let kwargs = kwargs.to_kwargs().map_err(|key| {
                CopyError::protocol(
                    type_name,
                    ProtocolMismatch::KeywordNotString {
                        got: key.type_name().to_string(),
                    },
                )
            })?;
            if uncopied_args {
                return invoke(target, args.items(), &kwargs);
            }
            let args = copy_args(copier, args)?;
            let mut copied = Kwargs::with_capacity(kwargs.len());
            for (name, value) in kwargs {
                let value = copier.copy_part(&value)?;
                copied.insert(name, value);
            }
            invoke(target, &args, &copied)
        }
    }
}

fn copy_args<C: PartCopier>(copier: &C, args: &Tuple) -> Result<Vec<Value>> {
    match copier.copy_part(&Value::Tuple(args.clone()))? {
        Value::Tuple(copied) => Ok(copied.items().to_vec()),
        _ => Ok(args.items().to_vec()),
    }
}

/// Split a state value into its attribute dict and slot dict
fn split_state(state: &Value, type_name: &str) -> Result<(Option<Dict>, Option<Dict>)> {
    let not_mapping = |got: &Value| {
        CopyError::protocol(
            type_name,
            ProtocolMismatch::DictStateNotMapping {
                type_name: type_name.to_string(),
                got: got.type_name(),
            },
        )
    };
    match state {
        Value::Dict(dict) => Ok((Some(dict.clone()), None)),
        Value::Tuple(pair) if pair.len() == 2 => {
            let attrs = match &pair.items()[0] {
                Value::None => None,
                Value::Dict(dict) => Some(dict.clone()),
                other => return Err(not_mapping(other)),
            };
            let slots = match &pair.items()[1] {
                Value::None => None,
                Value::Dict(dict) => Some(dict.clone()),
                other => {
                    return Err(CopyError::protocol(
                        type_name,
                        ProtocolMismatch::SlotStateNotMapping {
                            type_name: type_name.to_string(),
                            got: other.type_name(),
                        },
                    ))
                }
            };
            Ok((attrs, slots))
        }
        other => Err(not_mapping(other)),
    }
}

fn apply_state<C: PartCopier>(
    copier: &C,
    clone: &Value,
    state: &Value,
    type_name: &str,
) -> Result<()> {
    let Value::Object(target) = clone else {
        return Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::StateTargetNotObject {
                type_name: type_name.to_string(),
                got: clone.type_name(),
            },
        ));
    };

    if target.class().has_set_state() {
        let copied = copier.copy_part(state)?;
        if let Some(outcome) = target.class().apply_state(target, copied) {
            return outcome;
        }
    }

    split_state(state, type_name)?;
    let copied = copier.copy_part(state)?;
    let (attrs, slots) = split_state(&copied, type_name)?;
    for dict in attrs.iter().chain(slots.iter()) {
        merge_attrs(target, dict)?;
    }
    Ok(())
}

fn merge_attrs(target: &Object, dict: &Dict) -> Result<()> {
    for (key, value) in dict.snapshot() {
        match key {
            Key::Str(name) => {
                target.set_attr(name, value);
            }
            other => {
                return Err(CopyError::protocol(
                    target.class().name(),
                    ProtocolMismatch::AttrNameNotString {
                        got: other.type_name().to_string(),
                    },
                ))
            }
        }
    }
    Ok(())
}

/// Where list items of a reduction land
enum ItemSink<'a> {
    List(&'a List),
    Object(&'a Object),
}

impl ItemSink<'_> {
    fn push(&self, value: Value) {
        match self {
            ItemSink::List(list) => list.push(value),
            ItemSink::Object(object) => object.push_item(value),
        }
    }
}

fn append_items<C: PartCopier>(
    copier: &C,
    clone: &Value,
    items: &Value,
    type_name: &str,
) -> Result<()> {
    let sink = match clone {
        Value::List(list) => ItemSink::List(list),
        Value::Object(object) => ItemSink::Object(object),
        other => {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::ListItemsTarget {
                    type_name: type_name.to_string(),
                    got: other.type_name(),
                },
            ))
        }
    };

    match items {
        Value::List(list) => {
            let guard = MutationGuard::begin(list);
            let mut index = 0;
            while let Some(item) = list.get(index) {
                let copied = copier.copy_part(&item)?;
                guard.check()?;
                sink.push(copied);
                index += 1;
            }
            guard.check()
        }
        Value::Tuple(tuple) => {
            for item in tuple.items() {
                sink.push(copier.copy_part(item)?);
            }
            Ok(())
        }
        other => Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::ListItemsNotIterable {
                type_name: type_name.to_string(),
                got: other.type_name(),
            },
        )),
    }
}

/// Where dict items of a reduction land
enum EntrySink<'a> {
    Dict(&'a Dict),
    Object(&'a Object),
}

impl EntrySink<'_> {
    fn set(&self, key: Key, value: Value) {
        match self {
            EntrySink::Dict(dict) => {
                dict.insert(key, value);
            }
            EntrySink::Object(object) => {
                object.set_entry(key, value);
            }
        }
    }
}

fn set_dict_items<C: PartCopier>(
    copier: &C,
    clone: &Value,
    items: &Value,
    type_name: &str,
) -> Result<()> {
    let sink = match clone {
        Value::Dict(dict) => EntrySink::Dict(dict),
        Value::Object(object) => EntrySink::Object(object),
        other => {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::DictItemsTarget {
                    type_name: type_name.to_string(),
                    got: other.type_name(),
                },
            ))
        }
    };

    match items {
        Value::Dict(dict) => {
            let guard = MutationGuard::begin(dict);
            let mut index = 0;
            while let Some((key, value)) = dict.entry_at(index) {
                let copied = copier.copy_part(&value)?;
                guard.check()?;
                sink.set(key, copied);
                index += 1;
            }
            guard.check()
        }
        Value::List(list) => {
            let guard = MutationGuard::begin(list);
            let mut index = 0;
            while let Some(item) = list.get(index) {
                let (key, value) = split_pair(&item, type_name)?;
                let copied = copier.copy_part(&value)?;
                guard.check()?;
                sink.set(key, copied);
                index += 1;
            }
            guard.check()
        }
        Value::Tuple(tuple) => {
            for item in tuple.items() {
                let (key, value) = split_pair(item, type_name)?;
                sink.set(key, copier.copy_part(&value)?);
            }
            Ok(())
        }
        other => Err(CopyError::protocol(
            type_name,
            ProtocolMismatch::DictItemsNotIterable {
                type_name: type_name.to_string(),
                got: other.type_name(),
            },
        )),
    }
}

fn split_pair(item: &Value, type_name: &str) -> Result<(Key, Value)> {
    let pair = match item {
        Value::Tuple(pair) if pair.len() == 2 => pair,
        _ => {
            return Err(CopyError::protocol(
                type_name,
                ProtocolMismatch::DictItemNotPair {
                    type_name: type_name.to_string(),
                },
            ))
        }
    };
    let key = Key::from_value(&pair.items()[0]).ok_or_else(|| {
        CopyError::protocol(
            type_name,
            ProtocolMismatch::UnhashableKey {
                type_name: type_name.to_string(),
                got: pair.items()[0].type_name(),
            },
        )
    })?;
    Ok((key, pair.items()[1].clone()))
}
