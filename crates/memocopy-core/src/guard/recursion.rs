use std::cell::Cell;
use std::marker::PhantomData;

use crate::errors::{CopyError, RecursionCeiling, Result};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static STACK_BASE: Cell<usize> = const { Cell::new(0) };
}

/// Ceilings for one thread's descent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecursionLimits {
    /// Advisory depth limit; may be raised arbitrarily
    pub(crate) limit: usize,
    /// Bytes of stack the descent may use below its outermost entry
    pub(crate) stack_budget: usize,
}

/// One level of non-atomic descent
///
/// Dropping the guard pops the level, so early returns through `?` keep the
/// counter balanced.
pub(crate) struct DepthGuard {
    _not_send: PhantomData<*const ()>,
}

impl DepthGuard {
    pub(crate) fn enter(limits: RecursionLimits) -> Result<Self> {
        let depth = DEPTH.get() + 1;
        let here = stack_address();
        if depth == 1 {
            STACK_BASE.set(here);
        }

        if depth > limits.limit {
            return Err(CopyError::RecursionExceeded {
                depth,
                ceiling: RecursionCeiling::Limit {
                    limit: limits.limit,
                },
            });
        }

        let used = STACK_BASE.get().abs_diff(here);
        if used > limits.stack_budget {
            return Err(CopyError::RecursionExceeded {
                depth,
                ceiling: RecursionCeiling::StackBudget {
                    used,
                    budget: limits.stack_budget,
                },
            });
        }

        DEPTH.set(depth);
        Ok(Self {
            _not_send: PhantomData,
        })
    }

    /// Current depth on this thread
    pub(crate) fn depth() -> usize {
        DEPTH.get()
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.set(DEPTH.get().saturating_sub(1));
    }
}

#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}
