//! Iterative release of nested values
//!
//! A naive drop of a million-deep list recurses once per level and blows
//! the stack. Each cell's `Drop` hands its children here instead; any child
//! we hold the last reference to is emptied onto the worklist before it is
//! dropped, so the drop glue only ever sees empty cells.

use std::sync::Arc;

use super::Value;

pub(crate) fn release(values: Vec<Value>) {
    let mut pending = values;
    while let Some(value) = pending.pop() {
        detach_children(value, &mut pending);
    }
}

fn detach_children(value: Value, pending: &mut Vec<Value>) {
    match value {
        Value::Tuple(mut tuple) => {
            if let Some(cell) = Arc::get_mut(&mut tuple.0) {
                pending.extend(std::mem::take(&mut cell.items).into_vec());
            }
        }
        Value::List(mut list) => {
            if let Some(cell) = Arc::get_mut(&mut list.0) {
                pending.append(cell.items.get_mut());
            }
        }
        Value::Dict(mut dict) => {
            if let Some(cell) = Arc::get_mut(&mut dict.0) {
                pending.extend(std::mem::take(cell.entries.get_mut()).into_values());
            }
        }
        Value::Object(mut object) => {
            if let Some(cell) = Arc::get_mut(&mut object.0) {
                pending.append(&mut cell.state.get_mut().drain_values());
            }
        }
        _ => {}
    }
}
