#![forbid(unsafe_code)]

//! Time source for debounce deadlines.
//!
//! Production forms read wall-clock time through `web_time::Instant`, which
//! also works on `wasm32-unknown-unknown`. Tests swap in a [`LabClock`] that
//! only moves when told to, so debounce windows can be crossed exactly.
//!
//! ```
//! use addrform_core::clock::{Clock, LabClock};
//! use web_time::Duration;
//!
//! let lab = LabClock::new();
//! let clock = Clock::lab(&lab);
//! let t0 = clock.now();
//! lab.advance(Duration::from_millis(150));
//! assert_eq!(clock.now().duration_since(t0), Duration::from_millis(150));
//! ```

use std::cell::Cell;
use std::rc::Rc;
use web_time::{Duration, Instant};

/// Test time that only moves on [`advance`](LabClock::advance).
///
/// A form, its timer queue and the test driving them hold clones of one
/// `LabClock`, so a single `advance` crosses every pending debounce deadline
/// at once. The clock is single-threaded like the rest of the form.
#[derive(Debug, Clone)]
pub struct LabClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl LabClock {
    /// Start at the current wall-clock instant with zero offset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.offset.set(self.offset.get().saturating_add(delta));
    }

    /// The instant deadlines are compared against.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    /// Sum of every `advance` so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum TimeSource {
    Real,
    Lab(LabClock),
}

/// Cheaply cloneable handle to a time source.
#[derive(Debug, Clone)]
pub struct Clock {
    source: TimeSource,
}

impl Clock {
    /// Wall-clock time.
    #[must_use]
    pub fn real() -> Self {
        Self {
            source: TimeSource::Real,
        }
    }

    /// Time controlled by `lab`.
    #[must_use]
    pub fn lab(lab: &LabClock) -> Self {
        Self {
            source: TimeSource::Lab(lab.clone()),
        }
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        match &self.source {
            TimeSource::Real => Instant::now(),
            TimeSource::Lab(c) => c.now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_lab(&self) -> bool {
        matches!(self.source, TimeSource::Lab(_))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::real()
    }
}
