//! Copies with selected attributes changed
//!
//! A class supports replacement through its replace hook or, failing that,
//! its constructor, which receives the object's attributes overlaid with
//! the changes as keyword arguments. Other values are rejected.

use crate::errors::{CopyError, Result};
use crate::value::{Kwargs, Value};

pub(crate) fn replace(value: &Value, changes: &Kwargs) -> Result<Value> {
    let Some(object) = value.as_object() else {
        return Err(unsupported(&value.type_name()));
    };
    let class = object.class();
    if let Some(hook) = class.replace_hook() {
        return hook(object, changes);
    }
    if !class.has_constructor() {
        return Err(unsupported(class.name()));
    }

    let mut kwargs: Kwargs = object.attrs().into_iter().collect();
    for (name, change) in changes {
        kwargs.insert(name.clone(), change.clone());
    }
    class.instantiate(&[], &kwargs)
}

fn unsupported(type_name: &str) -> CopyError {
    CopyError::type_mismatch(format!("replace() does not support {type_name} objects"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Class, Object};

    #[test]
    fn test_changes_overlay_existing_attributes_in_order() {
        let class = Class::builder("Pair")
            .constructor(|class, _, kwargs| {
                let object = Object::new(class);
                for (name, value) in kwargs {
                    object.set_attr(name.clone(), value.clone());
                }
                Ok(Value::Object(object))
            })
            .build();
        let original = Object::new(&class);
        original.set_attr("a", Value::Int(1));
        original.set_attr("b", Value::Int(2));
        let mut changes = Kwargs::new();
        changes.insert("a".into(), Value::Int(10));

        let replaced = replace(&Value::Object(original.clone()), &changes).unwrap();
        let replaced = replaced.as_object().unwrap();

        let names: Vec<_> = replaced.attrs().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a".into(), "b".into()]);
        assert_eq!(replaced.get_attr("a"), Some(Value::Int(10)));
        assert_eq!(original.get_attr("a"), Some(Value::Int(1)));
    }

    #[test]
    fn test_list_is_unsupported() {
        let err = replace(&Value::list([]), &Kwargs::new()).unwrap_err();
        assert_eq!(err.to_string(), "replace() does not support list objects");
    }
}
