use crate::errors::{ContainerKind, CopyError, MutationKind, Result};
use crate::value::{Dict, List, Object};

/// A container whose changes can be observed
pub(crate) trait Tracked {
    const KIND: ContainerKind;

    /// Generation and length read under one lock
    fn observe(&self) -> (u64, usize);
}

impl Tracked for List {
    const KIND: ContainerKind = ContainerKind::List;

    fn observe(&self) -> (u64, usize) {
        let items = self.0.items.read();
        (self.0.items.generation(), items.len())
    }
}

impl Tracked for Dict {
    const KIND: ContainerKind = ContainerKind::Dict;

    fn observe(&self) -> (u64, usize) {
        let entries = self.0.entries.read();
        (self.0.entries.generation(), entries.len())
    }
}

impl Tracked for Object {
    const KIND: ContainerKind = ContainerKind::Object;

    fn observe(&self) -> (u64, usize) {
        let state = self.0.state.read();
        let len = state.attrs.len() + state.items.len() + state.entries.len();
        (self.0.state.generation(), len)
    }
}

/// Snapshot of a container taken before iterating it
///
/// `check` is called after every child copy and once at the end. No lock
/// is held in between, so hooks may freely re-enter or block.
pub(crate) struct MutationGuard<'a, T: Tracked> {
    target: &'a T,
    generation: u64,
    len: usize,
}

impl<'a, T: Tracked> MutationGuard<'a, T> {
    pub(crate) fn begin(target: &'a T) -> Self {
        let (generation, len) = target.observe();
        Self {
            target,
            generation,
            len,
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        let (generation, len) = self.target.observe();
        if generation == self.generation {
            return Ok(());
        }
        let change = if len != self.len {
            MutationKind::SizeChanged
        } else {
            MutationKind::Changed
        };
        Err(CopyError::ConcurrentMutation {
            container: T::KIND,
            change,
        })
    }
}
