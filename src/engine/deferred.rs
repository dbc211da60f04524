//! Deferred removal confirmations.
//!
//! `onbeforeremove` hooks may return a [`Deferred`]: a single-shot,
//! callback-on-settle handle. The removal coordinator counts outstanding
//! confirmations per removed subtree and detaches it once all of them have
//! settled. Dropping the [`Settle`] side without resolving it counts as
//! settlement - a confirmation failure must not leak the subtree in the
//! host.
//!
//! # Example
//!
//! ```
//! use reweave::Deferred;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let (deferred, settle) = Deferred::pending();
//! let fired = Rc::new(Cell::new(false));
//! let flag = fired.clone();
//! deferred.on_settle(move || flag.set(true));
//!
//! assert!(!fired.get());
//! settle.settle();
//! assert!(fired.get());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct DeferredState {
    settled: bool,
    waiters: Vec<Box<dyn FnOnce()>>,
}

impl DeferredState {
    fn fire(state: &Rc<RefCell<DeferredState>>) {
        let waiters = {
            let mut inner = state.borrow_mut();
            if inner.settled {
                return;
            }
            inner.settled = true;
            std::mem::take(&mut inner.waiters)
        };
        // Run outside the borrow so a waiter may inspect the deferred.
        for waiter in waiters {
            waiter();
        }
    }
}

/// The waitable side of a pending confirmation.
#[derive(Clone)]
pub struct Deferred {
    state: Rc<RefCell<DeferredState>>,
}

impl Deferred {
    /// A pending confirmation and the handle that resolves it.
    pub fn pending() -> (Deferred, Settle) {
        let state = Rc::new(RefCell::new(DeferredState::default()));
        (
            Deferred {
                state: state.clone(),
            },
            Settle { state: Some(state) },
        )
    }

    /// An already-settled confirmation; waiters run immediately.
    pub fn settled() -> Deferred {
        let (deferred, settle) = Deferred::pending();
        settle.settle();
        deferred
    }

    pub fn is_settled(&self) -> bool {
        self.state.borrow().settled
    }

    /// Register a continuation. Runs immediately if already settled,
    /// otherwise exactly once at settlement.
    pub fn on_settle(&self, waiter: impl FnOnce() + 'static) {
        let mut pending = Some(waiter);
        {
            let mut inner = self.state.borrow_mut();
            if !inner.settled {
                if let Some(waiter) = pending.take() {
                    inner.waiters.push(Box::new(waiter));
                }
            }
        }
        if let Some(waiter) = pending {
            waiter();
        }
    }
}

/// The resolving side of a pending confirmation. Settling consumes the
/// handle; dropping it unsettled also settles (failure is treated the same
/// as success).
pub struct Settle {
    state: Option<Rc<RefCell<DeferredState>>>,
}

impl Settle {
    pub fn settle(mut self) {
        if let Some(state) = self.state.take() {
            DeferredState::fire(&state);
        }
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            DeferredState::fire(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_settle_fires_waiters_once() {
        let (deferred, settle) = Deferred::pending();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        deferred.on_settle(move || c.set(c.get() + 1));

        assert!(!deferred.is_settled());
        settle.settle();
        assert!(deferred.is_settled());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_waiter_after_settlement_runs_immediately() {
        let deferred = Deferred::settled();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        deferred.on_settle(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn test_drop_counts_as_settlement() {
        let (deferred, settle) = Deferred::pending();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        deferred.on_settle(move || r.set(true));

        drop(settle);
        assert!(deferred.is_settled());
        assert!(ran.get());
    }
}
