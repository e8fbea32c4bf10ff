//! Copy engine
//!
//! An [`Engine`] owns a configuration, a type registry and an optional pin
//! registry. The process-wide engine behind the crate-level functions is
//! configured from the environment on first use.

use std::panic::Location;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::call::CallScope;
use crate::config::CopyConfig;
use crate::dispatch::Copier;
use crate::errors::Result;
use crate::hooks::{CustomCopy, Reducer};
use crate::memo::{pool, Memo};
use crate::pinning::PinRegistry;
use crate::registry::TypeRegistry;
use crate::{replace, shallow};
use crate::value::{cycles, Callable, Class, Identity, Kwargs, Value};
use crate::{log_op_end, log_op_error, log_op_start};

static GLOBAL: OnceLock<Engine> = OnceLock::new();

/// Deep and shallow copy entry points
pub struct Engine {
    config: CopyConfig,
    registry: TypeRegistry,
    pins: Option<Arc<dyn PinRegistry>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CopyConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pins", &self.pins.is_some())
            .finish()
    }
}

impl Engine {
    pub fn new(config: CopyConfig) -> Self {
        Self {
            config,
            registry: TypeRegistry::new(),
            pins: None,
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The process-wide engine
    ///
    /// Reads `MEMOCOPY_*` variables once. Invalid values are logged and the
    /// defaults used instead.
    pub fn global() -> &'static Engine {
        GLOBAL.get_or_init(|| {
            let config = CopyConfig::from_env().unwrap_or_else(|err| {
                tracing::warn!(
                    component = module_path!(),
                    error = %err,
                    "ignoring invalid environment configuration"
                );
                CopyConfig::default()
            });
            Engine::new(config)
        })
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Copy instances of `class` with `hook`
    pub fn register_hook<F>(&self, class: &Class, hook: F)
    where
        F: Fn(&Engine, &Value, &Memo) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register_hook(class, Arc::new(hook));
    }

    pub fn register_hook_impl(&self, class: &Class, hook: Arc<dyn CustomCopy>) {
        self.registry.register_hook(class, hook);
    }

    /// Rebuild instances of `class` from `reducer`'s descriptors
    pub fn register_reducer<F>(&self, class: &Class, reducer: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register_reducer(class, Arc::new(reducer));
    }

    pub fn register_reducer_impl(&self, class: &Class, reducer: Arc<dyn Reducer>) {
        self.registry.register_reducer(class, reducer);
    }

    /// Never copy instances of `class`
    pub fn register_atomic(&self, class: &Class) {
        self.registry.register_atomic(class);
    }

    pub(crate) fn is_pinned(&self, identity: Identity) -> bool {
        self.pins
            .as_ref()
            .is_some_and(|pins| pins.is_pinned(identity))
    }

    /// Deep-copy `value`
    ///
    /// Shared references in the original stay shared in the copy, and
    /// cycles are reproduced. The memo is private to this call.
    ///
    /// # Errors
    ///
    /// Returns a `CopyError` if a container is mutated while being copied,
    /// the recursion ceiling is reached, a reduction is malformed, or user
    /// code fails.
    #[track_caller]
    pub fn deep_copy(&self, value: &Value) -> Result<Value> {
        self.deep_copy_at(value, Location::caller())
    }

    /// Deep-copy `value` against a caller-supplied memo
    ///
    /// Everything copied is registered in `memo`, so later calls with the
    /// same memo reuse earlier clones. Hooks copy their children this way.
    ///
    /// # Errors
    ///
    /// As for [`Engine::deep_copy`].
    #[track_caller]
    pub fn deep_copy_with(&self, value: &Value, memo: &Memo) -> Result<Value> {
        if value.is_atomic() {
            return Ok(value.clone());
        }
        let scope = CallScope::enter(Location::caller());
        self.run(value, memo, &scope)
    }

    /// One-level copy of `value`
    ///
    /// # Errors
    ///
    /// Returns the error of a shallow hook or reducer, or a protocol
    /// violation for a malformed reduction.
    pub fn shallow_copy(&self, value: &Value) -> Result<Value> {
        shallow::shallow_copy(self, value)
    }

    /// `count` independent deep copies of `value`
    ///
    /// # Errors
    ///
    /// Stops at the first failing copy and returns its error.
    #[track_caller]
    pub fn replicate(&self, value: &Value, count: usize) -> Result<Vec<Value>> {
        let location = Location::caller();
        let started = Instant::now();
        log_op_start!("replicate", copies = count);

        let mut copies = Vec::with_capacity(count);
        for _ in 0..count {
            match self.deep_copy_at(value, location) {
                Ok(copy) => copies.push(copy),
                Err(err) => {
                    let duration_ms = elapsed_ms(started);
                    log_op_error!("replicate", err, duration_ms = duration_ms, copies = copies.len());
                    return Err(err);
                }
            }
        }

        log_op_end!("replicate", duration_ms = elapsed_ms(started), copies = count);
        Ok(copies)
    }

    /// Results of calling `function` with no arguments `count` times
    ///
    /// # Errors
    ///
    /// Stops at the first failing call and returns its error.
    pub fn repeatcall(&self, function: &Callable, count: usize) -> Result<Vec<Value>> {
        let started = Instant::now();
        log_op_start!("repeatcall", calls = count);

        let no_kwargs = Kwargs::new();
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            match function.call(&[], &no_kwargs) {
                Ok(result) => results.push(result),
                Err(err) => {
                    let duration_ms = elapsed_ms(started);
                    log_op_error!("repeatcall", err, duration_ms = duration_ms, calls = results.len());
                    return Err(err);
                }
            }
        }

        log_op_end!("repeatcall", duration_ms = elapsed_ms(started), calls = count);
        Ok(results)
    }

    /// New instance like `value` with the attributes in `changes` replaced
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for values whose class has neither a replace
    /// hook nor a constructor, otherwise whatever those raise.
    pub fn replace(&self, value: &Value, changes: &Kwargs) -> Result<Value> {
        replace::replace(value, changes)
    }

    fn deep_copy_at(&self, value: &Value, location: &'static Location<'static>) -> Result<Value> {
        if value.is_atomic() {
            return Ok(value.clone());
        }
        let memo = if self.config.use_dict_memo {
            Memo::new()
        } else {
            pool::acquire()
        };
        let scope = CallScope::enter(location);
        let result = self.run(value, &memo, &scope);
        drop(scope);
        pool::release(memo);
        result
    }

    fn run(&self, value: &Value, memo: &Memo, scope: &CallScope) -> Result<Value> {
        let copier = Copier::new(self, memo, scope.context());
        if !scope.is_outermost() {
            return copier.copy_value(value);
        }

        cycles::collect_if_due();
        let started = Instant::now();
        let call_id = scope.context().call_id();
        log_op_start!("deep_copy", call_id = %call_id, type_name = %value.type_name());

        let result = copier.copy_value(value);
        if result.is_ok() && scope.context().resolved_container() {
            // Only clones reached twice can close a cycle
            cycles::track(memo.entries().into_iter().map(|(_, clone)| clone));
        }
        let duration_ms = elapsed_ms(started);
        match &result {
            Ok(_) => {
                log_op_end!("deep_copy", duration_ms = duration_ms, call_id = %call_id);
            }
            Err(err) => {
                log_op_error!("deep_copy", err, duration_ms = duration_ms, call_id = %call_id);
            }
        }
        result
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`Engine`]
#[derive(Default)]
pub struct EngineBuilder {
    config: CopyConfig,
    pins: Option<Arc<dyn PinRegistry>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: CopyConfig) -> Self {
        self.config = config;
        self
    }

    /// Share values `pins` reports as pinned instead of copying them
    pub fn pins(mut self, pins: Arc<dyn PinRegistry>) -> Self {
        self.pins = Some(pins);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            config: self.config,
            registry: TypeRegistry::new(),
            pins: self.pins,
        }
    }
}
