#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use memocopy_core::{shallow_copy, Class, CopyError, Engine, Key, Object, Value};

use common::reduced_class;

#[test]
fn test_dict_copy_shares_values() {
    // GIVEN a dict holding a mutable value
    let engine = Engine::default();
    let inner = Value::list([]);
    let original = Value::dict([(Key::from("inner"), inner.clone())]);

    // WHEN shallow-copied
    let copy = engine.shallow_copy(&original).expect("Should copy");

    // THEN the dict is new but the value is shared
    assert!(!copy.ptr_eq(&original));
    let shared = copy.as_dict().unwrap().get(&Key::from("inner")).unwrap();
    assert!(shared.ptr_eq(&inner));
}

#[test]
fn test_list_copy_is_independent_of_later_mutation() {
    let engine = Engine::default();
    let original = Value::list([Value::Int(1)]);

    let copy = engine.shallow_copy(&original).expect("Should copy");
    original.as_list().unwrap().push(Value::Int(2));

    assert_eq!(copy.as_list().unwrap().len(), 1);
}

#[test]
fn test_atomic_values_are_their_own_copy() {
    let engine = Engine::default();
    for value in [Value::None, Value::Int(3), Value::from("text")] {
        let copy = engine.shallow_copy(&value).expect("Should copy");
        assert_eq!(copy, value);
    }
}

#[test]
fn test_shallow_hook_takes_priority() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let class = Class::builder("Custom")
        .shallow_hook(move |value: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        })
        .hook(|_: &Engine, _: &Value, _: &memocopy_core::Memo| {
            Err(CopyError::hook_failure("deep hook must not run"))
        })
        .build();
    let original = Value::Object(Object::new(&class));

    let copy = Engine::default()
        .shallow_copy(&original)
        .expect("Should copy");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(copy.ptr_eq(&original));
}

#[test]
fn test_reduced_object_shares_state_values() {
    // GIVEN an object rebuilt through a reducer
    let class = reduced_class("Reduced");
    let object = Object::new(&class);
    let payload = Value::list([Value::Int(1)]);
    object.set_attr("payload", payload.clone());

    // WHEN shallow-copied
    let copy = Engine::default()
        .shallow_copy(&Value::Object(object.clone()))
        .expect("Should copy");

    // THEN a new object is built whose state values are the originals
    let copy = copy.as_object().unwrap();
    assert!(!copy.ptr_eq(&object));
    assert!(copy.get_attr("payload").unwrap().ptr_eq(&payload));
}

#[test]
fn test_atomic_class_is_shared() {
    let class = Class::builder("Frozen").atomic().build();
    let original = Value::Object(Object::new(&class));

    let copy = Engine::default()
        .shallow_copy(&original)
        .expect("Should copy");

    assert!(copy.ptr_eq(&original));
}

#[test]
fn test_object_items_and_entries_are_shared() {
    let class = Class::new("Bag");
    let object = Object::new(&class);
    let item = Value::list([]);
    let entry = Value::list([]);
    object.push_item(item.clone());
    object.set_entry("key", entry.clone());

    let copy = shallow_copy(&Value::Object(object)).expect("Should copy");
    let copy = copy.as_object().unwrap();

    assert!(copy.item_at(0).unwrap().ptr_eq(&item));
    assert!(copy.get_entry(&Key::from("key")).unwrap().ptr_eq(&entry));
}
