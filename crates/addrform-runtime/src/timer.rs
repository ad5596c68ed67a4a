#![forbid(unsafe_code)]

//! Single-threaded timer queue.
//!
//! The form has exactly one suspension point, the debounce window, and this
//! queue is where it waits. The host event loop owns the cadence: it calls
//! [`TimerQueue::run_due`] whenever it wakes, and may sleep until
//! [`TimerQueue::next_deadline`] in between.
//!
//! # Invariants
//!
//! 1. A timer fires at most once, and never before its deadline.
//! 2. Due timers fire in deadline order; equal deadlines fire in scheduling
//!    order.
//! 3. [`cancel`](TimerQueue::cancel) on a pending timer guarantees its
//!    callback never runs, and returns `true` exactly once per timer.
//! 4. No borrow is held while a callback runs, so callbacks may schedule or
//!    cancel timers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use addrform_core::clock::Clock;
use web_time::{Duration, Instant};

type TimerFn = Box<dyn FnOnce()>;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    deadline: Instant,
}

impl TimerHandle {
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

struct QueueInner {
    next_id: u64,
    timers: BTreeMap<(Instant, u64), TimerFn>,
}

/// Deadline-ordered queue of one-shot callbacks.
///
/// Cloning creates a new handle to the **same** queue.
#[derive(Clone)]
pub struct TimerQueue {
    clock: Clock,
    inner: Rc<RefCell<QueueInner>>,
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending())
            .field("lab", &self.clock.is_lab())
            .finish()
    }
}

impl TimerQueue {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            inner: Rc::new(RefCell::new(QueueInner {
                next_id: 0,
                timers: BTreeMap::new(),
            })),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Run `callback` once `after` has elapsed.
    pub fn schedule(&self, after: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        let deadline = self.clock.now() + after;
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.timers.insert((deadline, id), Box::new(callback));
        TimerHandle { id, deadline }
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// already cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let removed = self
            .inner
            .borrow_mut()
            .timers
            .remove(&(handle.deadline, handle.id));
        // Drop the callback outside the borrow: its captures may own handles
        // back into this queue.
        removed.is_some()
    }

    /// Whether `handle` is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.inner
            .borrow()
            .timers
            .contains_key(&(handle.deadline, handle.id))
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .borrow()
            .timers
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Fire every timer whose deadline has passed. Returns how many fired.
    ///
    /// Timers scheduled by a callback fire in the same pass if they are
    /// already due.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                match inner.timers.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= now => inner.timers.pop_first(),
                    _ => None,
                }
            };
            let Some((_, callback)) = next else {
                break;
            };
            callback();
            fired += 1;
        }
        fired
    }
}
