//! Per-thread reuse of engine-owned memos
//!
//! A call without a caller-supplied memo borrows the thread's pooled memo.
//! When the call ends the memo goes back to the pool only if no hook kept a
//! handle to it; it is emptied first, and shrunk if it grew large, so a
//! thread's steady-state footprint stays bounded.

use std::cell::RefCell;

use super::Memo;

thread_local! {
    static POOLED: RefCell<Option<Memo>> = const { RefCell::new(None) };
}

pub(crate) fn acquire() -> Memo {
    POOLED
        .with(|pooled| pooled.borrow_mut().take())
        .unwrap_or_else(Memo::engine_owned)
}

pub(crate) fn release(memo: Memo) {
    if !memo.is_exclusive() {
        return;
    }
    memo.reset();
    POOLED.with(|pooled| {
        let mut slot = pooled.borrow_mut();
        if slot.is_none() {
            *slot = Some(memo);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::{MAX_RETAINED_CAPACITY, SHRUNK_CAPACITY};
    use crate::value::Value;

    #[test]
    fn test_released_memo_is_reused_empty() {
        let memo = acquire();
        let identity = memo.identity();
        memo.remember(&Value::list([]), Value::list([]));
        release(memo);

        let again = acquire();
        assert_eq!(again.identity(), identity);
        assert!(again.is_empty());
        release(again);
    }

    #[test]
    fn test_retained_memo_is_not_pooled() {
        let memo = acquire();
        let retained = memo.clone();
        release(memo);

        let fresh = acquire();
        assert!(!fresh.ptr_eq(&retained));
        release(fresh);
    }

    #[test]
    fn test_large_memo_is_shrunk_on_release() {
        let memo = acquire();
        let originals: Vec<Value> = (0..MAX_RETAINED_CAPACITY + 1).map(|_| Value::list([])).collect();
        for original in &originals {
            memo.remember(original, Value::None);
        }
        release(memo);

        let again = acquire();
        assert!(again.capacity() <= SHRUNK_CAPACITY.max(MAX_RETAINED_CAPACITY));
        release(again);
    }
}
