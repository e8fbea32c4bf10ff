#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use memocopy_core::{
    deep_copy, Callable, Class, Dict, Engine, Key, List, Memo, Object, Tuple, Value,
};
use proptest::prelude::*;

#[test]
fn test_atomic_values_are_returned_as_is() {
    let engine = Engine::default();
    let class = Class::new("Marker");
    let atomics = [
        Value::None,
        Value::Bool(true),
        Value::Int(7),
        Value::Float(1.5),
        Value::from("text"),
        Value::bytes(vec![1u8, 2, 3]),
        Value::Callable(Callable::new("noop", |_, _| Ok(Value::None))),
        Value::Class(class),
    ];

    for value in &atomics {
        let copy = engine.deep_copy(value).expect("Should copy atomic");
        assert!(copy.ptr_eq(value), "{value:?} should be returned as-is");
    }
}

#[test]
fn test_containers_are_copied_not_shared() {
    let engine = Engine::default();
    let inner = Value::list([Value::Int(1), Value::Int(2)]);
    let original = Value::dict([
        (Key::from("items"), inner.clone()),
        (Key::from("name"), Value::from("cfg")),
    ]);

    let copy = engine.deep_copy(&original).expect("Should copy dict");

    assert_eq!(copy, original);
    assert!(!copy.ptr_eq(&original));
    let copied_inner = copy.as_dict().unwrap().get(&Key::from("items")).unwrap();
    assert!(!copied_inner.ptr_eq(&inner));

    // Strings are atomic, so they are shared
    let name = copy.as_dict().unwrap().get(&Key::from("name")).unwrap();
    let original_name = original.as_dict().unwrap().get(&Key::from("name")).unwrap();
    assert!(name.ptr_eq(&original_name));
}

#[test]
fn test_shared_reference_stays_shared() {
    // GIVEN a list holding the same child twice after another value
    let engine = Engine::default();
    let a = Value::list([Value::Int(1)]);
    let x = Value::dict([(Key::from("k"), Value::Int(2))]);
    let original = Value::list([x, a.clone(), a.clone()]);

    // WHEN copied
    let copy = engine.deep_copy(&original).expect("Should copy");
    let copy = copy.as_list().unwrap();

    // THEN both positions refer to one fresh clone of `a`
    let first = copy.get(1).unwrap();
    let second = copy.get(2).unwrap();
    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&a));
    assert_eq!(first, a);
}

#[test]
fn test_hook_result_is_reused_for_repeated_object() {
    // GIVEN an object whose hook returns a fixed sentinel, listed twice
    // after an empty list
    let engine = Engine::default();
    let sentinel = Value::Object(Object::new(&Class::new("Sentinel")));
    let returned = sentinel.clone();
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = calls.clone();
    let class = Class::builder("ReturnsSentinel")
        .hook(move |_: &Engine, _: &Value, _: &Memo| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(returned.clone())
        })
        .build();
    let a = Value::Object(Object::new(&class));
    let x = Value::list([]);
    let original = Value::list([x.clone(), a.clone(), a]);

    // WHEN copied
    let copy = engine.deep_copy(&original).expect("Should copy");
    let copy = copy.as_list().unwrap();

    // THEN both object positions hold the one sentinel
    assert_eq!(copy.len(), 3);
    assert!(copy.get(1).unwrap().ptr_eq(&copy.get(2).unwrap()));
    assert!(copy.get(1).unwrap().ptr_eq(&sentinel));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // AND the empty list is equal but not the same list
    let x_copy = copy.get(0).unwrap();
    assert_eq!(x_copy, x);
    assert!(!x_copy.ptr_eq(&x));
}

#[test]
fn test_held_cyclic_clone_survives_collection() {
    // GIVEN a clone of a self-referencing list that is still held
    let engine = Engine::default();
    let list = List::new();
    list.push(Value::List(list.clone()));
    let copy = engine
        .deep_copy(&Value::List(list.clone()))
        .expect("Should copy cycle");

    // WHEN cycles are collected
    memocopy_core::value::collect();

    // THEN the held clone keeps its self-reference
    let copy_list = copy.as_list().unwrap();
    assert_eq!(copy_list.len(), 1);
    assert!(copy_list.get(0).unwrap().ptr_eq(&copy));

    list.clear();
    copy_list.clear();
}

#[test]
fn test_self_referencing_list() {
    let engine = Engine::default();
    let list = List::new();
    list.push(Value::Int(1));
    list.push(Value::List(list.clone()));
    let original = Value::List(list.clone());

    let copy = engine.deep_copy(&original).expect("Should copy cycle");
    let copy_list = copy.as_list().unwrap();

    assert!(!copy.ptr_eq(&original));
    assert!(copy_list.get(1).unwrap().ptr_eq(&copy));
    assert_eq!(copy_list.get(0), Some(Value::Int(1)));

    // Break the cycles so the test does not leak
    list.clear();
    copy_list.clear();
}

#[test]
fn test_object_cycle_through_dict() {
    let engine = Engine::default();
    let node = Object::new(&Class::new("Node"));
    let children = Dict::new();
    children.insert("parent", Value::Object(node.clone()));
    node.set_attr("children", Value::Dict(children.clone()));
    let original = Value::Object(node.clone());

    let copy = engine.deep_copy(&original).expect("Should copy object cycle");
    let copy_node = copy.as_object().unwrap();
    let copy_children = copy_node.get_attr("children").unwrap();
    let back = copy_children
        .as_dict()
        .unwrap()
        .get(&Key::from("parent"))
        .unwrap();

    assert!(back.ptr_eq(&copy));
    assert!(!copy_children.ptr_eq(&Value::Dict(children.clone())));

    children.clear();
    copy_children.as_dict().unwrap().clear();
}

#[test]
fn test_tuple_of_atomics_is_its_own_copy() {
    let engine = Engine::default();
    let original = Value::tuple([Value::Int(1), Value::from("a")]);

    let copy = engine.deep_copy(&original).expect("Should copy tuple");

    assert!(copy.ptr_eq(&original));
}

#[test]
fn test_tuple_with_mutable_child_is_copied() {
    let engine = Engine::default();
    let child = Value::list([]);
    let original = Value::tuple([Value::Int(1), child.clone()]);

    let copy = engine.deep_copy(&original).expect("Should copy tuple");

    assert!(!copy.ptr_eq(&original));
    assert!(!copy.as_tuple().unwrap().get(1).unwrap().ptr_eq(&child));
}

#[test]
fn test_tuple_cycle_through_list() {
    // GIVEN t = ([t],) built by filling the list after creating the tuple
    let engine = Engine::default();
    let holder = List::new();
    let tuple = Tuple::new(vec![Value::List(holder.clone())]);
    holder.push(Value::Tuple(tuple.clone()));
    let original = Value::Tuple(tuple);

    // WHEN copied
    let copy = engine.deep_copy(&original).expect("Should copy");

    // THEN the copied list points at the copied tuple
    let copy_holder = copy.as_tuple().unwrap().get(0).unwrap().clone();
    let inner = copy_holder.as_list().unwrap().get(0).unwrap();
    assert!(inner.ptr_eq(&copy));

    holder.clear();
    copy_holder.as_list().unwrap().clear();
}

#[test]
fn test_object_state_is_copied() {
    let engine = Engine::default();
    let class = Class::new("Bag");
    let bag = Object::new(&class);
    bag.set_attr("label", Value::from("b"));
    bag.push_item(Value::list([Value::Int(1)]));
    bag.set_entry("k", Value::list([]));

    let copy = engine
        .deep_copy(&Value::Object(bag.clone()))
        .expect("Should copy object");
    let copy_bag = copy.as_object().unwrap();

    assert!(copy_bag.class().ptr_eq(&class));
    assert_eq!(copy_bag.get_attr("label"), Some(Value::from("b")));
    assert_eq!(copy_bag.item_count(), 1);
    assert!(!copy_bag.item_at(0).unwrap().ptr_eq(&bag.item_at(0).unwrap()));
    assert_eq!(copy_bag.entry_count(), 1);
}

#[test]
fn test_set_state_receives_copied_attributes() {
    let engine = Engine::default();
    let class = Class::builder("Versioned")
        .set_state(|target: &Object, state: Value| {
            let state = state.as_dict().expect("state is a dict");
            for (key, value) in state.snapshot() {
                target.set_attr(key.as_str().unwrap_or("?"), value);
            }
            target.set_attr("restored", Value::Bool(true));
            Ok(())
        })
        .build();
    let original = Object::new(&class);
    original.set_attr("data", Value::list([Value::Int(3)]));

    let copy = engine
        .deep_copy(&Value::Object(original.clone()))
        .expect("Should copy");
    let copy = copy.as_object().unwrap();

    assert_eq!(copy.get_attr("restored"), Some(Value::Bool(true)));
    assert_eq!(copy.get_attr("data"), original.get_attr("data"));
    assert!(!copy
        .get_attr("data")
        .unwrap()
        .ptr_eq(&original.get_attr("data").unwrap()));
}

#[test]
fn test_atomic_class_instances_are_shared() {
    let engine = Engine::default();
    let class = Class::builder("Singleton").atomic().build();
    let instance = Value::Object(Object::new(&class));

    let copy = engine
        .deep_copy(&Value::list([instance.clone()]))
        .expect("Should copy");

    assert!(copy.as_list().unwrap().get(0).unwrap().ptr_eq(&instance));
}

#[test]
fn test_registered_atomic_overrides_class() {
    let engine = Engine::default();
    let class = Class::new("Connection");
    let instance = Value::Object(Object::new(&class));
    engine.register_atomic(&class);

    let copy = engine.deep_copy(&instance).expect("Should copy");

    assert!(copy.ptr_eq(&instance));
}

#[test]
fn test_registered_hook_overrides_class() {
    let engine = Engine::default();
    let class = Class::new("Handle");
    engine.register_hook(&class, |_: &Engine, _: &Value, _: &Memo| Ok(Value::Int(42)));

    let copy = engine
        .deep_copy(&Value::Object(Object::new(&class)))
        .expect("Should copy");

    assert_eq!(copy, Value::Int(42));
}

#[test]
fn test_hook_returning_original_is_not_registered() {
    let engine = Engine::default();
    let class = Class::builder("Immutable")
        .hook(|_: &Engine, value: &Value, _: &Memo| Ok(value.clone()))
        .build();
    let instance = Value::Object(Object::new(&class));
    let memo = Memo::new();

    let copy = engine
        .deep_copy_with(&instance, &memo)
        .expect("Should copy");

    assert!(copy.ptr_eq(&instance));
    assert!(memo.is_empty());
}

#[test]
fn test_memo_reuse_across_calls() {
    // GIVEN one memo used for two copies of overlapping graphs
    let engine = Engine::default();
    let shared = Value::list([Value::Int(1)]);
    let first = Value::list([shared.clone()]);
    let second = Value::dict([(Key::from("s"), shared.clone())]);
    let memo = Memo::new();

    // WHEN both are copied with it
    let a = engine.deep_copy_with(&first, &memo).expect("Should copy");
    let b = engine.deep_copy_with(&second, &memo).expect("Should copy");

    // THEN the shared child has one clone
    let from_a = a.as_list().unwrap().get(0).unwrap();
    let from_b = b.as_dict().unwrap().get(&Key::from("s")).unwrap();
    assert!(from_a.ptr_eq(&from_b));
}

#[test]
fn test_prepopulated_memo_entry_is_used() {
    let engine = Engine::default();
    let original = Value::list([]);
    let replacement = Value::from("replacement");
    let memo = Memo::new();
    memo.remember(&original, replacement.clone());

    let copy = engine
        .deep_copy_with(&Value::list([original]), &memo)
        .expect("Should copy");

    assert!(copy.as_list().unwrap().get(0).unwrap().ptr_eq(&replacement));
}

#[test]
fn test_crate_level_function_uses_global_engine() {
    let original = Value::list([Value::list([])]);
    let copy = deep_copy(&original).expect("Should copy");
    assert_eq!(copy, original);
    assert!(!copy.ptr_eq(&original));
}

#[test]
fn test_hook_nested_copies_share_memo() {
    // GIVEN a hook that copies its payload through the memo it was handed
    let engine = Engine::default();
    let (class, invocations) = common::picky_class("NestedShare");
    let payload = Value::list([]);
    let original = Value::list([
        common::instance(&class, payload.clone()),
        payload.clone(),
    ]);
    let memo = Memo::new();

    // WHEN copied with a default-shaped memo
    let copy = engine.deep_copy_with(&original, &memo).expect("Should copy");
    let copy = copy.as_list().unwrap();

    // THEN the payload inside the hook's copy is the same clone as the sibling
    let hooked = copy.get(0).unwrap();
    let inner = hooked.as_object().unwrap().get_attr("payload").unwrap();
    assert!(inner.ptr_eq(&copy.get(1).unwrap()));
    assert_eq!(invocations.get(), 1);
}

#[derive(Debug, Clone)]
enum Shape {
    Leaf(i64),
    List(Vec<Shape>),
    Shared(usize),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Shape::Leaf),
        (0usize..4).prop_map(Shape::Shared),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Shape::List)
    })
}

fn build(shape: &Shape, pool: &[Value]) -> Value {
    match shape {
        Shape::Leaf(n) => Value::Int(*n),
        Shape::List(items) => Value::list(items.iter().map(|item| build(item, pool))),
        Shape::Shared(index) => pool[*index % pool.len()].clone(),
    }
}

/// Every identity reachable from `value`, in visit order
fn identities(value: &Value, out: &mut Vec<Value>) {
    if let Some(list) = value.as_list() {
        out.push(value.clone());
        for item in list.snapshot() {
            identities(&item, out);
        }
    }
}

proptest! {
    #[test]
    fn prop_copy_preserves_identity_structure(shape in shape_strategy()) {
        let pool: Vec<Value> = (0..4).map(|i| Value::list([Value::Int(i)])).collect();
        let original = build(&shape, &pool);

        let copy = Engine::default().deep_copy(&original).unwrap();

        prop_assert_eq!(&copy, &original);

        let mut before = Vec::new();
        identities(&original, &mut before);
        let mut after = Vec::new();
        identities(&copy, &mut after);
        prop_assert_eq!(before.len(), after.len());

        for i in 0..before.len() {
            prop_assert!(!after[i].ptr_eq(&before[i]));
            for j in 0..before.len() {
                prop_assert_eq!(before[i].ptr_eq(&before[j]), after[i].ptr_eq(&after[j]));
            }
        }
    }
}
