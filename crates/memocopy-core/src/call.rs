//! Per-call state shared by a top-level copy and the nested copies its
//! hooks make on the same thread

use std::cell::{Cell, RefCell};
use std::panic::Location;
use std::rc::Rc;

use memocopy_core_types::CallId;

use crate::memo::{Memo, MirrorLink};

thread_local! {
    static ACTIVE: RefCell<Option<Rc<CallContext>>> = const { RefCell::new(None) };
}

pub(crate) struct CallContext {
    call_id: CallId,
    location: &'static Location<'static>,
    fallback_engaged: Cell<bool>,
    diagnostic_emitted: Cell<bool>,
    resolved_container: Cell<bool>,
    mirror: RefCell<Option<MirrorLink>>,
}

impl CallContext {
    fn new(location: &'static Location<'static>) -> Self {
        Self {
            call_id: CallId::new(),
            location,
            fallback_engaged: Cell::new(false),
            diagnostic_emitted: Cell::new(false),
            resolved_container: Cell::new(false),
            mirror: RefCell::new(None),
        }
    }

    pub(crate) fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Where the user invoked the outermost copy
    pub(crate) fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub(crate) fn fallback_engaged(&self) -> bool {
        self.fallback_engaged.get()
    }

    pub(crate) fn engage_fallback(&self) {
        self.fallback_engaged.set(true);
    }

    /// Whether some mutable container was resolved through the memo
    pub(crate) fn resolved_container(&self) -> bool {
        self.resolved_container.get()
    }

    pub(crate) fn note_resolved_container(&self) {
        self.resolved_container.set(true);
    }

    /// True exactly once per call
    pub(crate) fn claim_diagnostic(&self) -> bool {
        !self.diagnostic_emitted.replace(true)
    }

    /// Run `f` against the mirror of `native`, opening one if needed
    ///
    /// The borrow is released before returning, so hooks invoked between
    /// two calls may use the mirror re-entrantly.
    pub(crate) fn with_mirror<R>(&self, native: &Memo, f: impl FnOnce(&mut MirrorLink) -> R) -> R {
        let mut slot = self.mirror.borrow_mut();
        if !slot.as_ref().is_some_and(|link| link.serves(native)) {
            *slot = None;
        }
        let link = slot.get_or_insert_with(|| MirrorLink::open(native));
        f(link)
    }

    /// Drop the mirror of `native`; the next fallback reopens it
    pub(crate) fn close_mirror(&self, native: &Memo) {
        let mut slot = self.mirror.borrow_mut();
        if slot.as_ref().is_some_and(|link| link.serves(native)) {
            let closed = slot.take();
            drop(slot);
            drop(closed);
        }
    }
}

/// Registration of a copy call on the current thread
///
/// The first scope on a thread creates the context; scopes entered while
/// it is alive share it.
pub(crate) struct CallScope {
    context: Rc<CallContext>,
    outermost: bool,
}

impl CallScope {
    pub(crate) fn enter(location: &'static Location<'static>) -> Self {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            match active.as_ref() {
                Some(context) => Self {
                    context: context.clone(),
                    outermost: false,
                },
                None => {
                    let context = Rc::new(CallContext::new(location));
                    *active = Some(context.clone());
                    Self {
                        context,
                        outermost: true,
                    }
                }
            }
        })
    }

    pub(crate) fn is_outermost(&self) -> bool {
        self.outermost
    }

    pub(crate) fn context(&self) -> &CallContext {
        &self.context
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        if self.outermost {
            let finished = ACTIVE.with(|active| active.borrow_mut().take());
            drop(finished);
        }
    }
}
