use std::fmt;
use std::sync::Arc;

use super::{Callable, Identity, Kwargs, Object, Value};
use crate::engine::Engine;
use crate::errors::{CopyError, Result};
use crate::hooks::{CustomCopy, Reducer};
use crate::memo::Memo;
use crate::registry::StrategyCache;

type SetStateFn = dyn Fn(&Object, Value) -> Result<()> + Send + Sync;
type ConstructorFn = dyn Fn(&Class, &[Value], &Kwargs) -> Result<Value> + Send + Sync;
type ShallowFn = dyn Fn(&Value) -> Result<Value> + Send + Sync;
type ReplaceFn = dyn Fn(&Object, &Kwargs) -> Result<Value> + Send + Sync;

/// Type tag of an [`Object`] and the home of its per-type copy behaviour
///
/// Classes are atomic values. Two classes are the same type only if they
/// are the same allocation.
#[derive(Clone)]
pub struct Class(Arc<ClassInfo>);

struct ClassInfo {
    name: String,
    module: String,
    atomic: bool,
    uncopied_args: bool,
    hook: Option<Arc<dyn CustomCopy>>,
    reducer: Option<Arc<dyn Reducer>>,
    set_state: Option<Arc<SetStateFn>>,
    constructor: Option<Arc<ConstructorFn>>,
    shallow: Option<Arc<ShallowFn>>,
    replace: Option<Arc<ReplaceFn>>,
    strategies: StrategyCache,
}

impl Class {
    /// Plain class with no custom behaviour
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            info: ClassInfo {
                name: name.into(),
                module: String::new(),
                atomic: false,
                uncopied_args: false,
                hook: None,
                reducer: None,
                set_state: None,
                constructor: None,
                shallow: None,
                replace: None,
                strategies: StrategyCache::default(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn module(&self) -> &str {
        &self.0.module
    }

    /// `module::Name`, or just `Name` when no module was given
    pub fn qualname(&self) -> String {
        if self.0.module.is_empty() {
            self.0.name.clone()
        } else {
            format!("{}::{}", self.0.module, self.0.name)
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.0.atomic
    }

    /// Whether reduction constructor args are passed through uncopied
    pub fn uses_uncopied_args(&self) -> bool {
        self.0.uncopied_args
    }

    pub(crate) fn hook(&self) -> Option<&Arc<dyn CustomCopy>> {
        self.0.hook.as_ref()
    }

    pub(crate) fn reducer(&self) -> Option<&Arc<dyn Reducer>> {
        self.0.reducer.as_ref()
    }

    pub(crate) fn shallow_hook(&self) -> Option<&Arc<ShallowFn>> {
        self.0.shallow.as_ref()
    }

    pub(crate) fn replace_hook(&self) -> Option<&Arc<ReplaceFn>> {
        self.0.replace.as_ref()
    }

    pub fn has_constructor(&self) -> bool {
        self.0.constructor.is_some()
    }

    pub fn has_set_state(&self) -> bool {
        self.0.set_state.is_some()
    }

    /// Hand reconstructed state to the class's `set_state` callback
    ///
    /// Returns `None` when the class has no callback and the engine should
    /// merge the state itself.
    pub(crate) fn apply_state(&self, target: &Object, state: Value) -> Option<Result<()>> {
        self.0
            .set_state
            .as_ref()
            .map(|set_state| set_state(target, state))
    }

    /// Create an instance through the class constructor
    ///
    /// Without a custom constructor this creates an empty object and
    /// accepts no arguments.
    ///
    /// # Errors
    ///
    /// Returns the constructor's error, or a type mismatch when arguments
    /// are passed to a class without a constructor.
    pub fn instantiate(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        match &self.0.constructor {
            Some(constructor) => constructor(self, args, kwargs),
            None if args.is_empty() && kwargs.is_empty() => Ok(Value::Object(Object::new(self))),
            None => Err(CopyError::type_mismatch(format!(
                "{}() takes no arguments",
                self.0.name
            ))),
        }
    }

    /// The constructor as a callable value, suitable for reductions
    pub fn constructor(&self) -> Callable {
        let class = self.clone();
        Callable::new(format!("{}::new", self.qualname()), move |args, kwargs| {
            class.instantiate(args, kwargs)
        })
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn strategy_cache(&self) -> &StrategyCache {
        &self.0.strategies
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.qualname())
    }
}

/// Builder for [`Class`]
///
/// # Example
///
/// ```
/// use memocopy_core::{Class, Value};
///
/// let point = Class::builder("Point")
///     .module("geometry")
///     .reducer(|value: &Value| {
///         let obj = value.as_object().expect("reducer only sees Points");
///         Ok(Value::tuple([
///             Value::Callable(obj.class().constructor()),
///             Value::tuple([]),
///         ]))
///     })
///     .build();
/// assert_eq!(point.qualname(), "geometry::Point");
/// ```
pub struct ClassBuilder {
    info: ClassInfo,
}

impl ClassBuilder {
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.info.module = module.into();
        self
    }

    /// Instances are never copied
    pub fn atomic(mut self) -> Self {
        self.info.atomic = true;
        self
    }

    /// Pass reduction constructor args through without deep-copying them
    pub fn uncopied_args(mut self) -> Self {
        self.info.uncopied_args = true;
        self
    }

    /// Per-type deep-copy hook
    pub fn hook<F>(self, hook: F) -> Self
    where
        F: Fn(&Engine, &Value, &Memo) -> Result<Value> + Send + Sync + 'static,
    {
        self.hook_impl(Arc::new(hook))
    }

    pub fn hook_impl(mut self, hook: Arc<dyn CustomCopy>) -> Self {
        self.info.hook = Some(hook);
        self
    }

    /// Reduction descriptor producer
    pub fn reducer<F>(self, reducer: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.reducer_impl(Arc::new(reducer))
    }

    pub fn reducer_impl(mut self, reducer: Arc<dyn Reducer>) -> Self {
        self.info.reducer = Some(reducer);
        self
    }

    /// Receives reconstructed state instead of the default attribute merge
    pub fn set_state<F>(mut self, set_state: F) -> Self
    where
        F: Fn(&Object, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.info.set_state = Some(Arc::new(set_state));
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Class, &[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.info.constructor = Some(Arc::new(constructor));
        self
    }

    /// Per-type shallow-copy hook
    pub fn shallow_hook<F>(mut self, shallow: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.info.shallow = Some(Arc::new(shallow));
        self
    }

    /// Builds the result of `replace` from an instance and the changes
    pub fn replace_hook<F>(mut self, replace: F) -> Self
    where
        F: Fn(&Object, &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.info.replace = Some(Arc::new(replace));
        self
    }

    pub fn build(self) -> Class {
        Class(Arc::new(self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualname() {
        assert_eq!(Class::new("A").qualname(), "A");
        assert_eq!(Class::builder("A").module("m").build().qualname(), "m::A");
    }

    #[test]
    fn test_default_instantiate_rejects_arguments() {
        let class = Class::new("Empty");
        assert!(class.instantiate(&[], &Kwargs::new()).is_ok());

        let err = class.instantiate(&[Value::Int(1)], &Kwargs::new()).unwrap_err();
        assert_eq!(err.to_string(), "Empty() takes no arguments");
    }

    #[test]
    fn test_custom_constructor_receives_class() {
        let class = Class::builder("Boxed")
            .constructor(|class, args, _| {
                let obj = Object::new(class);
                obj.set_attr("value", args.first().cloned().unwrap_or_default());
                Ok(Value::Object(obj))
            })
            .build();

        let built = class.constructor().call(&[Value::Int(4)], &Kwargs::new()).unwrap();
        let obj = built.as_object().unwrap();
        assert!(obj.class().ptr_eq(&class));
        assert_eq!(obj.get_attr("value"), Some(Value::Int(4)));
    }

    #[test]
    fn test_distinct_classes_with_same_name_differ() {
        assert!(!Class::new("A").ptr_eq(&Class::new("A")));
    }
}
