//! Identity map and keepalive ledger
//!
//! A [`Memo`] maps the identity of every original already copied in a call
//! to its clone, and holds the originals alive so their identities cannot
//! be recycled mid-call. Memos are cheap handles; clones share the same
//! table. All access goes through one short-lived mutex, never held while
//! user code runs.

mod keepalive;
mod mirror;
pub(crate) mod pool;

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::value::{Identity, List, Value};
use keepalive::KeepaliveLedger;

pub(crate) use keepalive::{MAX_RETAINED_CAPACITY, SHRUNK_CAPACITY};
pub(crate) use mirror::MirrorLink;

type IdentityMap = IndexMap<Identity, Value, FxBuildHasher>;
type Changes = (Vec<(Identity, Value)>, Vec<Value>, Checkpoint);

/// Shape a memo presents to custom hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoFlavor {
    /// The engine's own fast memo
    Native,
    /// The default, dict-shaped memo every hook is expected to accept
    Dict,
}

/// Position in a memo's append-only history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    entries: usize,
    keepalive: usize,
}

impl Checkpoint {
    pub(crate) const START: Checkpoint = Checkpoint {
        entries: 0,
        keepalive: 0,
    };
}

/// Identity map plus keepalive ledger shared by a copy call
///
/// The ledger is reachable through the memo's own identity:
/// `memo.get(memo.identity())` returns it as a list.
#[derive(Clone)]
pub struct Memo {
    inner: Arc<MemoInner>,
}

struct MemoInner {
    flavor: MemoFlavor,
    engine_owned: bool,
    table: Mutex<IdentityMap>,
    keepalive: KeepaliveLedger,
}

impl Default for Memo {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("flavor", &self.inner.flavor)
            .field("entries", &self.inner.table.lock().len())
            .field("keepalive", &self.inner.keepalive.len())
            .finish()
    }
}

impl Memo {
    /// A default-shaped memo, suitable for passing to any hook
    pub fn new() -> Self {
        Self::build(MemoFlavor::Dict, false)
    }

    /// A native-flavoured memo, as the engine uses internally
    pub fn native() -> Self {
        Self::build(MemoFlavor::Native, false)
    }

    pub(crate) fn engine_owned() -> Self {
        Self::build(MemoFlavor::Native, true)
    }

    fn build(flavor: MemoFlavor, engine_owned: bool) -> Self {
        Self {
            inner: Arc::new(MemoInner {
                flavor,
                engine_owned,
                table: Mutex::new(IdentityMap::default()),
                keepalive: KeepaliveLedger::new(),
            }),
        }
    }

    pub fn flavor(&self) -> MemoFlavor {
        self.inner.flavor
    }

    /// The memo's own identity, the reserved key of its keepalive ledger
    pub fn identity(&self) -> Identity {
        Identity::of(Arc::as_ptr(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Memo) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Clone registered for `identity`
    pub fn get(&self, identity: Identity) -> Option<Value> {
        if identity == self.identity() {
            return Some(Value::List(self.inner.keepalive.as_list()));
        }
        self.inner.table.lock().get(&identity).cloned()
    }

    /// Clone registered for `original`, if it has been copied
    pub fn lookup(&self, original: &Value) -> Option<Value> {
        original.identity().and_then(|id| self.get(id))
    }

    pub fn contains(&self, identity: Identity) -> bool {
        identity == self.identity() || self.inner.table.lock().contains_key(&identity)
    }

    /// Register `clone` unless another clone got there first
    ///
    /// Returns whichever clone is registered afterwards. Callers that race
    /// on the same identity all end up with the same winner.
    pub fn insert_if_absent(&self, identity: Identity, clone: Value) -> Value {
        if identity == self.identity() {
            return Value::List(self.inner.keepalive.as_list());
        }
        self.inner
            .table
            .lock()
            .entry(identity)
            .or_insert(clone)
            .clone()
    }

    /// Register `clone` for `original` and keep `original` alive
    ///
    /// Returns the winning clone, which is `clone` unless the original was
    /// already registered.
    pub fn remember(&self, original: &Value, clone: Value) -> Value {
        let Some(identity) = original.identity() else {
            return clone;
        };
        if identity == self.identity() {
            return Value::List(self.inner.keepalive.as_list());
        }
        let (winner, inserted) = match self.inner.table.lock().entry(identity) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(clone).clone(), true),
        };
        if inserted {
            self.inner.keepalive.keep(original.clone());
        }
        winner
    }

    /// Hold `value` alive for as long as the memo lives
    pub fn keep_alive(&self, value: Value) {
        self.inner.keepalive.keep(value);
    }

    /// The keepalive ledger, shared
    pub fn keepalive(&self) -> List {
        self.inner.keepalive.as_list()
    }

    /// Registered entries, plus one for the ledger once it holds anything
    pub fn len(&self) -> usize {
        self.inner.table.lock().len() + usize::from(!self.inner.keepalive.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the identity map in registration order
    pub fn entries(&self) -> Vec<(Identity, Value)> {
        self.inner
            .table
            .lock()
            .iter()
            .map(|(id, v)| (*id, v.clone()))
            .collect()
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.inner.table.lock().len(),
            keepalive: self.inner.keepalive.len(),
        }
    }

    /// Discard everything registered after `checkpoint`
    ///
    /// Only sound while nobody else can observe the memo.
    pub(crate) fn rollback(&self, checkpoint: Checkpoint) {
        let discarded: Vec<Value> = {
            let mut table = self.inner.table.lock();
            if checkpoint.entries >= table.len() {
                Vec::new()
            } else {
                table.drain(checkpoint.entries..).map(|(_, v)| v).collect()
            }
        };
        drop(discarded);
        self.inner.keepalive.truncate(checkpoint.keepalive);
    }

    /// Engine-created and not retained by any hook
    pub(crate) fn is_exclusive(&self) -> bool {
        self.inner.engine_owned && Arc::strong_count(&self.inner) == 1
    }

    /// Entries and ledger items added at or after `from`, in order, with
    /// the checkpoint they bring the caller up to
    pub(crate) fn changes_since(&self, from: Checkpoint) -> Changes {
        let (entries, entries_len) = {
            let table = self.inner.table.lock();
            let entries: Vec<(Identity, Value)> = table
                .get_range(from.entries.min(table.len())..)
                .map(|slice| slice.iter().map(|(id, v)| (*id, v.clone())).collect())
                .unwrap_or_default();
            (entries, table.len())
        };
        let keepalive_len = self.inner.keepalive.len();
        let kept: Vec<Value> = (from.keepalive..keepalive_len)
            .filter_map(|index| self.inner.keepalive.item(index))
            .collect();
        let upto = Checkpoint {
            entries: entries_len,
            keepalive: keepalive_len,
        };
        (entries, kept, upto)
    }

    /// Empty the memo for reuse by the next call on this thread
    pub(crate) fn reset(&self) {
        let discarded: Vec<Value> = {
            let mut table = self.inner.table.lock();
            let values = table.drain(..).map(|(_, v)| v).collect();
            if table.capacity() > MAX_RETAINED_CAPACITY {
                table.shrink_to(SHRUNK_CAPACITY);
            }
            values
        };
        drop(discarded);
        self.inner.keepalive.reset();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.inner.table.lock().capacity()
    }
}
