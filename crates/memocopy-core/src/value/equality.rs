use rustc_hash::FxHashSet;

use super::{Identity, Value};

/// Structural equality
///
/// Containers compare element-wise. A pair of containers already under
/// comparison is assumed equal, which makes cyclic graphs terminate and
/// compare equal when their shapes match.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut in_progress = FxHashSet::default();
        structural_eq(self, other, &mut in_progress)
    }
}

fn structural_eq(a: &Value, b: &Value, in_progress: &mut FxHashSet<(Identity, Identity)>) -> bool {
    if let (Some(ia), Some(ib)) = (a.identity(), b.identity()) {
        if ia == ib {
            return true;
        }
        if !a.is_atomic() && !in_progress.insert((ia, ib)) {
            return true;
        }
    }

    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => *i as f64 == *f,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Callable(x), Value::Callable(y)) => x.ptr_eq(y),
        (Value::Class(x), Value::Class(y)) => x.ptr_eq(y),
        (Value::Tuple(x), Value::Tuple(y)) => sequences_eq(x.items(), y.items(), in_progress),
        (Value::List(x), Value::List(y)) => {
            sequences_eq(&x.snapshot(), &y.snapshot(), in_progress)
        }
        (Value::Dict(x), Value::Dict(y)) => {
            let left = x.snapshot();
            left.len() == y.len()
                && left.iter().all(|(key, value)| {
                    y.get(key)
                        .is_some_and(|other| structural_eq(value, &other, in_progress))
                })
        }
        (Value::Object(x), Value::Object(y)) => {
            if !x.class().ptr_eq(y.class()) {
                return false;
            }
            let attrs = x.attrs();
            let entries = x.entries();
            attrs.len() == y.attr_count()
                && entries.len() == y.entry_count()
                && attrs.iter().all(|(name, value)| {
                    y.get_attr(name)
                        .is_some_and(|other| structural_eq(value, &other, in_progress))
                })
                && sequences_eq(&x.items(), &y.items(), in_progress)
                && entries.iter().all(|(key, value)| {
                    y.get_entry(key)
                        .is_some_and(|other| structural_eq(value, &other, in_progress))
                })
        }
        _ => false,
    }
}

fn sequences_eq(
    left: &[Value],
    right: &[Value],
    in_progress: &mut FxHashSet<(Identity, Identity)>,
) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| structural_eq(a, b, in_progress))
}
