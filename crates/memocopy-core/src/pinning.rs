//! Pinned values
//!
//! An engine may be given a [`PinRegistry`]. Any value it reports as pinned
//! is shared between original and copy instead of being copied, the same
//! way atomic values are.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::value::{Identity, Value};

/// Lookup consulted before every non-atomic copy
pub trait PinRegistry: Send + Sync {
    fn is_pinned(&self, identity: Identity) -> bool;
}

/// Set of pinned values, held alive while pinned
#[derive(Default)]
pub struct PinSet {
    pinned: RwLock<FxHashMap<Identity, Value>>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `value`; returns false for values without identity
    pub fn pin(&self, value: &Value) -> bool {
        match value.identity() {
            Some(identity) => {
                self.pinned.write().insert(identity, value.clone());
                true
            }
            None => false,
        }
    }

    /// Unpin `value`; returns whether it was pinned
    pub fn unpin(&self, value: &Value) -> bool {
        value
            .identity()
            .is_some_and(|identity| self.pinned.write().remove(&identity).is_some())
    }

    pub fn len(&self) -> usize {
        self.pinned.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.read().is_empty()
    }
}

impl PinRegistry for PinSet {
    fn is_pinned(&self, identity: Identity) -> bool {
        self.pinned.read().contains_key(&identity)
    }
}

impl fmt::Debug for PinSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinSet").field("len", &self.len()).finish()
    }
}
