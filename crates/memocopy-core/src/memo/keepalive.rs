use crate::value::{List, Value};

/// Capacity above which a pooled ledger is shrunk on reset
pub(crate) const MAX_RETAINED_CAPACITY: usize = 8192;
/// Capacity a pooled ledger is shrunk to
pub(crate) const SHRUNK_CAPACITY: usize = 1024;

/// Append-only list of strong references to copied originals
///
/// Holding the originals keeps their identities from being reused by new
/// allocations while the identity map still refers to them.
pub(crate) struct KeepaliveLedger {
    list: List,
}

impl KeepaliveLedger {
    pub(crate) fn new() -> Self {
        Self { list: List::new() }
    }

    pub(crate) fn keep(&self, value: Value) {
        if value.identity().is_some() {
            self.list.push(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The ledger as a value, shared, not copied
    pub(crate) fn as_list(&self) -> List {
        self.list.clone()
    }

    pub(crate) fn item(&self, index: usize) -> Option<Value> {
        self.list.get(index)
    }

    pub(crate) fn truncate(&self, len: usize) {
        self.list.truncate(len);
    }

    pub(crate) fn reset(&self) {
        self.list.clear();
        if self.list.capacity() > MAX_RETAINED_CAPACITY {
            self.list.shrink_to(SHRUNK_CAPACITY);
        }
    }
}
