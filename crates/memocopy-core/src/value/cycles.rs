//! Reclamation of unreachable reference cycles
//!
//! Values are reference counted, so the clone of a self-referencing input
//! keeps itself alive after the caller drops it. Copy calls that resolved
//! a container through the memo hand their container clones to [`track`].
//! [`collect`] finds tracked containers referenced only from other tracked
//! containers and empties the mutable ones, which breaks every cycle among
//! them; reference counting frees the rest.
//!
//! Containers referenced from anywhere outside the tracked set, including
//! another thread's in-flight memo, are treated as reachable.

use std::sync::{Arc, Weak};

use parking_lot::{const_mutex, Mutex};
use rustc_hash::FxHashMap;

use super::containers::{DictCell, ListCell, TupleCell};
use super::object::ObjectCell;
use super::{teardown, Identity, Value};

/// Tracked containers that make the next top-level call collect first
pub const COLLECT_THRESHOLD: usize = 1024;

enum Tracked {
    Tuple(Weak<TupleCell>),
    List(Weak<ListCell>),
    Dict(Weak<DictCell>),
    Object(Weak<ObjectCell>),
}

impl Tracked {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Tuple(t) => Some(Tracked::Tuple(Arc::downgrade(&t.0))),
            Value::List(l) => Some(Tracked::List(Arc::downgrade(&l.0))),
            Value::Dict(d) => Some(Tracked::Dict(Arc::downgrade(&d.0))),
            Value::Object(o) => Some(Tracked::Object(Arc::downgrade(&o.0))),
            _ => None,
        }
    }

    fn upgrade(&self) -> Option<Value> {
        match self {
            Tracked::Tuple(w) => w.upgrade().map(|c| Value::Tuple(super::Tuple(c))),
            Tracked::List(w) => w.upgrade().map(|c| Value::List(super::List(c))),
            Tracked::Dict(w) => w.upgrade().map(|c| Value::Dict(super::Dict(c))),
            Tracked::Object(w) => w.upgrade().map(|c| Value::Object(super::Object(c))),
        }
    }
}

struct Tracker {
    tracked: Vec<Tracked>,
    threshold: usize,
}

static TRACKER: Mutex<Tracker> = const_mutex(Tracker {
    tracked: Vec::new(),
    threshold: COLLECT_THRESHOLD,
});

/// Start tracking the containers among `clones`
pub(crate) fn track(clones: impl IntoIterator<Item = Value>) {
    let fresh: Vec<Tracked> = clones.into_iter().filter_map(|v| Tracked::of(&v)).collect();
    if fresh.is_empty() {
        return;
    }
    TRACKER.lock().tracked.extend(fresh);
}

/// Number of containers currently tracked, live or not
pub fn tracked_count() -> usize {
    TRACKER.lock().tracked.len()
}

/// Collect when enough containers have been tracked since the last pass
pub(crate) fn collect_if_due() {
    let due = {
        let tracker = TRACKER.lock();
        tracker.tracked.len() >= tracker.threshold
    };
    if due {
        collect();
    }
}

fn strong_count(value: &Value) -> usize {
    match value {
        Value::Tuple(t) => Arc::strong_count(&t.0),
        Value::List(l) => Arc::strong_count(&l.0),
        Value::Dict(d) => Arc::strong_count(&d.0),
        Value::Object(o) => Arc::strong_count(&o.0),
        _ => 0,
    }
}

/// Identities of the direct children of a container, with multiplicity
fn child_identities(value: &Value) -> Vec<Identity> {
    match value {
        Value::Tuple(t) => t.items().iter().filter_map(Value::identity).collect(),
        Value::List(l) => l.0.items.read().iter().filter_map(Value::identity).collect(),
        Value::Dict(d) => d
            .0
            .entries
            .read()
            .values()
            .filter_map(Value::identity)
            .collect(),
        Value::Object(o) => {
            let state = o.0.state.read();
            state
                .attrs
                .values()
                .chain(state.items.iter())
                .chain(state.entries.values())
                .filter_map(Value::identity)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Empty a mutable container; tuples cannot be emptied and are left to
/// reference counting once their cycle is broken elsewhere
fn take_children(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(l) => Some(std::mem::take(&mut *l.0.items.write())),
        Value::Dict(d) => Some(
            std::mem::take(&mut *d.0.entries.write())
                .into_values()
                .collect(),
        ),
        Value::Object(o) => Some(o.0.state.write().drain_values()),
        _ => None,
    }
}

/// Free tracked containers that are only reachable from each other
///
/// Returns how many containers were emptied. Runs automatically at the
/// start of a top-level copy once [`COLLECT_THRESHOLD`] containers are
/// tracked; call it directly to reclaim cycles sooner.
pub fn collect() -> usize {
    let tracked = std::mem::take(&mut TRACKER.lock().tracked);

    let mut index: FxHashMap<Identity, usize> = FxHashMap::default();
    let mut live: Vec<Value> = Vec::new();
    for entry in &tracked {
        let Some(value) = entry.upgrade() else {
            continue;
        };
        let Some(identity) = value.identity() else {
            continue;
        };
        if let std::collections::hash_map::Entry::Vacant(slot) = index.entry(identity) {
            slot.insert(live.len());
            live.push(value);
        }
    }
    drop(tracked);

    // References held from outside the set; `live` itself holds one each
    let mut external: Vec<usize> = live.iter().map(|v| strong_count(v) - 1).collect();
    let edges: Vec<Vec<usize>> = live
        .iter()
        .map(|v| {
            child_identities(v)
                .into_iter()
                .filter_map(|id| index.get(&id).copied())
                .collect()
        })
        .collect();
    for targets in &edges {
        for &target in targets {
            external[target] = external[target].saturating_sub(1);
        }
    }

    let mut reachable = vec![false; live.len()];
    let mut work: Vec<usize> = (0..live.len()).filter(|&i| external[i] > 0).collect();
    while let Some(i) = work.pop() {
        if reachable[i] {
            continue;
        }
        reachable[i] = true;
        work.extend(edges[i].iter().copied().filter(|&t| !reachable[t]));
    }

    let mut survivors = Vec::new();
    let mut released = Vec::new();
    let mut emptied = 0;
    for (value, reachable) in live.iter().zip(&reachable) {
        if *reachable {
            survivors.extend(Tracked::of(value));
        } else if let Some(children) = take_children(value) {
            emptied += 1;
            released.extend(children);
        }
    }
    drop(live);
    teardown::release(released);

    let tracked = {
        let mut tracker = TRACKER.lock();
        tracker.threshold = COLLECT_THRESHOLD.max(survivors.len() * 2);
        if tracker.tracked.is_empty() {
            tracker.tracked = survivors;
        } else {
            tracker.tracked.extend(survivors);
        }
        tracker.tracked.len()
    };
    if emptied > 0 {
        tracing::debug!(
            component = module_path!(),
            op = "collect",
            emptied,
            tracked,
            "reclaimed unreachable cycles"
        );
    }
    emptied
}
