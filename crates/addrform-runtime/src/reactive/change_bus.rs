#![forbid(unsafe_code)]

//! Single-slot, replay-latest change channel.
//!
//! # Design
//!
//! [`ChangeBus<T>`] holds exactly one current value plus an ordered list of
//! subscriber callbacks, all behind one `Rc<RefCell<..>>`. Publishing replaces
//! the value and calls every live subscriber synchronously, in subscription
//! order. Subscribing delivers the held value to the new callback before
//! returning, then every later publication until the [`Subscription`] is
//! detached or dropped.
//!
//! # Invariants
//!
//! 1. The held value is only written by [`publish`](ChangeBus::publish).
//! 2. Subscribers are notified in registration order.
//! 3. A detached subscriber is never called again, even if it is detached by
//!    another subscriber's callback in the middle of a notification cycle.
//! 4. Every publication is delivered, including one equal to the held value.
//!    Deduplication is the consumer's job.
//! 5. Nothing is buffered: a subscriber attached after a publication only sees
//!    the latest value.
//!
//! # Re-entrancy
//!
//! No borrow is held while a callback runs, so callbacks may read the bus,
//! subscribe, detach, or publish. A publish from inside a callback updates
//! the held value at once but is delivered only after the current cycle
//! finishes, so every subscriber sees publications in order and ends on the
//! held value.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;
type Targets<T> = Vec<(Rc<Cell<bool>>, Callback<T>)>;

struct Entry<T> {
    id: u64,
    active: Rc<Cell<bool>>,
    callback: Callback<T>,
}

struct BusInner<T> {
    value: T,
    version: u64,
    next_id: u64,
    subscribers: Vec<Entry<T>>,
    notifying: bool,
    queued: VecDeque<(T, Targets<T>)>,
}

impl<T> BusInner<T> {
    fn targets(&self) -> Targets<T> {
        self.subscribers
            .iter()
            .map(|e| (Rc::clone(&e.active), Rc::clone(&e.callback)))
            .collect()
    }
}

/// Ends a notification cycle, even if a callback unwinds.
struct CycleGuard<'a, T> {
    inner: &'a RefCell<BusInner<T>>,
}

impl<T> Drop for CycleGuard<'_, T> {
    fn drop(&mut self) {
        let abandoned = self.inner.try_borrow_mut().ok().map(|mut inner| {
            inner.notifying = false;
            std::mem::take(&mut inner.queued)
        });
        drop(abandoned);
    }
}

/// Replay-latest channel carrying values of type `T`.
///
/// Cloning a `ChangeBus` creates a new handle to the **same** channel.
pub struct ChangeBus<T> {
    inner: Rc<RefCell<BusInner<T>>>,
}

impl<T> Clone for ChangeBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ChangeBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ChangeBus")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> ChangeBus<T> {
    /// Create a bus holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                value: initial,
                version: 0,
                next_id: 0,
                subscribers: Vec::new(),
                notifying: false,
                queued: VecDeque::new(),
            })),
        }
    }

    /// Clone of the held value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the held value by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` publishes to this bus (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of publications so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Replace the held value and notify every subscriber in order.
    ///
    /// Called from inside a callback, the value is queued behind the cycle
    /// in progress and delivered to the subscribers attached at this call.
    pub fn publish(&self, value: T) {
        let targets = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value.clone();
            inner.version += 1;
            let targets = inner.targets();
            if inner.notifying {
                inner.queued.push_back((value, targets));
                return;
            }
            inner.notifying = true;
            targets
        };

        let _cycle = CycleGuard { inner: &*self.inner };
        let mut next = Some((value, targets));
        while let Some((value, targets)) = next {
            for (active, callback) in targets {
                if active.get() {
                    callback(&value);
                }
            }
            next = self.inner.borrow_mut().queued.pop_front();
        }
    }

    /// Attach `callback`, delivering the held value to it immediately.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Callback<T> = Rc::new(callback);
        let active = Rc::new(Cell::new(true));
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Entry {
                id,
                active: Rc::clone(&active),
                callback: Rc::clone(&callback),
            });
            (id, inner.value.clone())
        };

        let weak: Weak<RefCell<BusInner<T>>> = Rc::downgrade(&self.inner);
        let remove_flag = Rc::clone(&active);
        let subscription = Subscription {
            active: Rc::clone(&active),
            detach: Some(Box::new(move || {
                remove_flag.set(false);
                if let Some(inner) = weak.upgrade() {
                    let removed = {
                        let mut inner = inner.borrow_mut();
                        let pos = inner.subscribers.iter().position(|e| e.id == id);
                        pos.map(|i| inner.subscribers.remove(i))
                    };
                    // The callback may own other subscriptions to this bus;
                    // drop it only after the borrow is released.
                    drop(removed);
                }
            })),
        };

        callback(&current);
        subscription
    }
}

/// Handle to one attached subscriber.
///
/// Detaching is idempotent. Dropping the handle detaches it.
pub struct Subscription {
    active: Rc<Cell<bool>>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Stop delivery to this subscriber. Later calls do nothing.
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Whether the subscriber still receives publications.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.active.get())
            .finish()
    }
}
