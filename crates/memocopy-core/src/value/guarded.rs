use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock-protected container state with a mutation generation
///
/// Every write access bumps the generation while the write lock is held, so
/// a reader that snapshots the generation before iterating can tell whether
/// anything touched the container afterwards, from any thread.
pub(crate) struct Guarded<T> {
    data: RwLock<T>,
    generation: AtomicU64,
}

impl<T> Guarded<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            data: RwLock::new(data),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        self.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        let guard = self.data.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        guard
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Exclusive access without locking; only reachable during teardown.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bumps_generation() {
        let guarded = Guarded::new(vec![1, 2, 3]);
        let before = guarded.generation();

        guarded.write().push(4);

        assert_ne!(before, guarded.generation());
        assert_eq!(guarded.read().len(), 4);
    }

    #[test]
    fn test_read_keeps_generation() {
        let guarded = Guarded::new(vec![1]);
        let before = guarded.generation();

        let _len = guarded.read().len();

        assert_eq!(before, guarded.generation());
    }
}
