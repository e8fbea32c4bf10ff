//! Per-type copy strategy resolution
//!
//! Strategies come from engine-level overrides first, then from what the
//! class itself declares. Resolved strategies are cached on the class;
//! any registration invalidates them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::hooks::{CustomCopy, Reducer};
use crate::value::{Class, Identity};

/// How instances of a class are deep-copied
#[derive(Clone)]
pub enum Strategy {
    /// Instances are returned as-is
    Atomic,
    /// A custom hook builds the clone
    Hook(Arc<dyn CustomCopy>),
    /// A reduction descriptor drives reconstruction
    Reduce(Arc<dyn Reducer>),
    /// Attributes, items and entries are copied one by one
    Structural,
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Atomic => "Atomic",
            Strategy::Hook(_) => "Hook",
            Strategy::Reduce(_) => "Reduce",
            Strategy::Structural => "Structural",
        })
    }
}

impl Strategy {
    fn declared_by(class: &Class) -> Self {
        if class.is_atomic() {
            Strategy::Atomic
        } else if let Some(hook) = class.hook() {
            Strategy::Hook(hook.clone())
        } else if let Some(reducer) = class.reducer() {
            Strategy::Reduce(reducer.clone())
        } else {
            Strategy::Structural
        }
    }
}

/// Strategies a class has resolved to, one per registry that resolved it
///
/// Lives on the class, so dropping the class drops its cached entries.
#[derive(Default)]
pub(crate) struct StrategyCache(Mutex<Vec<Cached>>);

struct Cached {
    registry: u64,
    epoch: u64,
    strategy: Strategy,
}

impl StrategyCache {
    fn get(&self, registry: u64, epoch: u64) -> Option<Strategy> {
        self.0
            .lock()
            .iter()
            .find(|c| c.registry == registry && c.epoch == epoch)
            .map(|c| c.strategy.clone())
    }

    fn store(&self, registry: u64, epoch: u64, strategy: Strategy) {
        let mut entries = self.0.lock();
        match entries.iter_mut().find(|c| c.registry == registry) {
            Some(cached) if cached.epoch <= epoch => {
                cached.epoch = epoch;
                cached.strategy = strategy;
            }
            Some(_) => {}
            None => entries.push(Cached {
                registry,
                epoch,
                strategy,
            }),
        }
    }

    fn forget(&self, registry: u64) -> Option<Strategy> {
        let mut entries = self.0.lock();
        let position = entries.iter().position(|c| c.registry == registry)?;
        Some(entries.swap_remove(position).strategy)
    }
}

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(0);

/// Engine-scoped type registry
///
/// Every registration bumps the registry's epoch. A cached resolution is
/// used only while its epoch is current, so a registration racing with a
/// resolution can at worst cause one extra lookup.
pub struct TypeRegistry {
    id: u64,
    epoch: AtomicU64,
    overrides: RwLock<FxHashMap<Identity, (Class, Strategy)>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            epoch: AtomicU64::new(0),
            overrides: RwLock::new(FxHashMap::default()),
        }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy instances of `class` with `hook`, overriding what the class declares
    pub fn register_hook(&self, class: &Class, hook: Arc<dyn CustomCopy>) {
        self.set(class, Strategy::Hook(hook));
    }

    pub fn register_reducer(&self, class: &Class, reducer: Arc<dyn Reducer>) {
        self.set(class, Strategy::Reduce(reducer));
    }

    /// Never copy instances of `class`
    pub fn register_atomic(&self, class: &Class) {
        self.set(class, Strategy::Atomic);
    }

    /// Drop any override for `class`; returns whether one existed
    pub fn unregister(&self, class: &Class) -> bool {
        let removed = self.overrides.write().remove(&class.identity());
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let stale = class.strategy_cache().forget(self.id);
        drop(stale);
        removed.is_some()
    }

    /// Strategy in effect for `class`
    pub fn resolve(&self, class: &Class) -> Strategy {
        // Read before the overrides: a registration landing after this
        // point leaves the stored entry stale
        let epoch = self.epoch.load(Ordering::Acquire);
        if let Some(strategy) = class.strategy_cache().get(self.id, epoch) {
            return strategy;
        }

        let strategy = self
            .overrides
            .read()
            .get(&class.identity())
            .map(|(_, strategy)| strategy.clone())
            .unwrap_or_else(|| Strategy::declared_by(class));
        class
            .strategy_cache()
            .store(self.id, epoch, strategy.clone());
        strategy
    }

    fn set(&self, class: &Class, strategy: Strategy) {
        let replaced = self
            .overrides
            .write()
            .insert(class.identity(), (class.clone(), strategy));
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let stale = class.strategy_cache().forget(self.id);
        drop((replaced, stale));
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("overrides", &self.overrides.read().len())
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::memo::Memo;
    use crate::value::Value;

    #[test]
    fn test_declared_strategies() {
        let registry = TypeRegistry::new();

        let plain = Class::new("Plain");
        let atomic = Class::builder("Frozen").atomic().build();
        let reduced = Class::builder("Reduced")
            .reducer(|_: &Value| Ok(Value::from("Reduced")))
            .build();

        assert!(matches!(registry.resolve(&plain), Strategy::Structural));
        assert!(matches!(registry.resolve(&atomic), Strategy::Atomic));
        assert!(matches!(registry.resolve(&reduced), Strategy::Reduce(_)));
    }

    #[test]
    fn test_override_invalidates_cached_resolution() {
        let registry = TypeRegistry::new();
        let class = Class::new("Config");

        assert!(matches!(registry.resolve(&class), Strategy::Structural));
        registry.register_atomic(&class);
        assert!(matches!(registry.resolve(&class), Strategy::Atomic));

        assert!(registry.unregister(&class));
        assert!(matches!(registry.resolve(&class), Strategy::Structural));
        assert!(!registry.unregister(&class));
    }

    #[test]
    fn test_dropping_a_class_releases_its_cached_hook() {
        let registry = TypeRegistry::new();
        let token = Arc::new(());
        let held = token.clone();
        let class = Class::builder("Transient")
            .hook(move |_: &Engine, value: &Value, _: &Memo| {
                let _token = &held;
                Ok(value.clone())
            })
            .build();

        assert!(matches!(registry.resolve(&class), Strategy::Hook(_)));
        drop(class);

        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn test_resolution_racing_a_registration_is_not_reused() {
        let registry = TypeRegistry::new();
        let class = Class::new("Raced");

        // A resolution reads the epoch and the overrides, a registration
        // lands, then the resolution stores what it saw
        let epoch = registry.epoch.load(Ordering::Acquire);
        registry.register_atomic(&class);
        class
            .strategy_cache()
            .store(registry.id, epoch, Strategy::Structural);

        assert!(matches!(registry.resolve(&class), Strategy::Atomic));
    }

    #[test]
    fn test_registries_cache_independently() {
        let first = TypeRegistry::new();
        let second = TypeRegistry::new();
        let class = Class::new("Shared");
        first.register_atomic(&class);

        assert!(matches!(first.resolve(&class), Strategy::Atomic));
        assert!(matches!(second.resolve(&class), Strategy::Structural));
        assert!(matches!(first.resolve(&class), Strategy::Atomic));
    }
}
