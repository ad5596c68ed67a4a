#![forbid(unsafe_code)]

//! Debounced, deduplicated validation of form snapshots.
//!
//! # Stages
//!
//! ```text
//! ChangeBus<FormSnapshot> ──▶ debounce ──▶ dedup ──▶ Validity::evaluate ──▶ ChangeBus<bool>
//! ```
//!
//! 1. **Debounce**: every received snapshot cancels the pending timer and
//!    starts a new one. Only a snapshot that survives a full quiet window
//!    moves on; superseded snapshots are dropped, never queued.
//! 2. **Dedup**: a snapshot structurally equal to the last one evaluated is
//!    suppressed.
//! 3. **Evaluate** the pure validity predicate.
//! 4. **Publish** the boolean to the validity bus.
//!
//! # Teardown
//!
//! [`ValidationPipeline::detach`] (or drop) marks the pipeline detached,
//! cancels the pending timer through its handle, and detaches from the change
//! bus, all before returning. The timer callback only holds a `Weak` to the
//! pipeline state and re-checks the detached flag, so nothing reaches the
//! validity bus afterwards.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use addrform_core::{FormSnapshot, Validity};
use tracing::{debug, info, trace};

use crate::config::PipelineConfig;
use crate::reactive::{ChangeBus, Subscription};
use crate::timer::{TimerHandle, TimerQueue};

/// Counters describing what the pipeline has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Snapshots received from the change bus, including the initial replay.
    pub received: u64,
    /// Snapshots dropped because a newer one arrived inside the window.
    pub debounced: u64,
    /// Snapshots dropped because they equalled the last evaluated one.
    pub suppressed: u64,
    /// Validity evaluations performed.
    pub evaluations: u64,
}

struct Pending {
    timer: TimerHandle,
    snapshot: FormSnapshot,
}

struct PipelineState {
    config: PipelineConfig,
    timers: TimerQueue,
    validity: ChangeBus<bool>,
    pending: Option<Pending>,
    last_evaluated: Option<FormSnapshot>,
    stats: PipelineStats,
    detached: bool,
}

/// Subscriber to a snapshot [`ChangeBus`] that maintains a validity flag.
pub struct ValidationPipeline {
    state: Rc<RefCell<PipelineState>>,
    subscription: Subscription,
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ValidationPipeline")
            .field("config", &state.config)
            .field("pending", &state.pending.is_some())
            .field("stats", &state.stats)
            .field("detached", &state.detached)
            .finish()
    }
}

impl ValidationPipeline {
    /// Subscribe to `changes` and start maintaining `validity`.
    ///
    /// The bus replays its held snapshot during this call, so a debounce
    /// window is already pending when `attach` returns.
    pub fn attach(
        changes: &ChangeBus<FormSnapshot>,
        validity: ChangeBus<bool>,
        timers: TimerQueue,
        config: PipelineConfig,
    ) -> Self {
        debug!(debounce_ms = config.debounce.as_millis() as u64, dedup = config.dedup, "pipeline attach");
        let state = Rc::new(RefCell::new(PipelineState {
            config,
            timers,
            validity,
            pending: None,
            last_evaluated: None,
            stats: PipelineStats::default(),
            detached: false,
        }));

        let weak = Rc::downgrade(&state);
        let subscription = changes.subscribe(move |snapshot: &FormSnapshot| {
            receive(&weak, snapshot.clone());
        });

        Self {
            state,
            subscription,
        }
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.state.borrow().stats
    }

    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        self.state.borrow().config.clone()
    }

    /// Whether a snapshot is waiting out its debounce window.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    /// Last snapshot that reached evaluation.
    #[must_use]
    pub fn last_evaluated(&self) -> Option<FormSnapshot> {
        self.state.borrow().last_evaluated.clone()
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.state.borrow().detached
    }

    /// Push the pending snapshot through dedup and evaluation now.
    ///
    /// Returns `true` if an evaluation ran.
    pub fn flush(&self) -> bool {
        let pending = {
            let mut state = self.state.borrow_mut();
            if state.detached {
                return false;
            }
            state.pending.take()
        };
        let Some(pending) = pending else {
            return false;
        };
        self.state.borrow().timers.cancel(pending.timer);
        trace!("pipeline flush");
        proceed(&self.state, pending.snapshot)
    }

    /// Stop the pipeline: cancel the pending timer and leave the bus.
    ///
    /// Idempotent. The validity flag keeps its last value.
    pub fn detach(&mut self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            if state.detached {
                return;
            }
            state.detached = true;
            state.pending.take()
        };
        if let Some(pending) = pending {
            self.state.borrow().timers.cancel(pending.timer);
        }
        self.subscription.detach();
        debug!(stats = ?self.state.borrow().stats, "pipeline detached");
    }
}

impl Drop for ValidationPipeline {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Change-bus callback: restart the debounce window with `snapshot`.
fn receive(weak: &Weak<RefCell<PipelineState>>, snapshot: FormSnapshot) {
    let Some(state_rc) = weak.upgrade() else {
        return;
    };
    let (timers, window, superseded) = {
        let mut state = state_rc.borrow_mut();
        if state.detached {
            return;
        }
        state.stats.received += 1;
        let superseded = state.pending.take().map(|p| p.timer);
        if superseded.is_some() {
            state.stats.debounced += 1;
        }
        (state.timers.clone(), state.config.debounce, superseded)
    };

    if let Some(timer) = superseded {
        timers.cancel(timer);
        trace!("debounce restarted");
    }

    let fire_weak = weak.clone();
    let timer = timers.schedule(window, move || fire(&fire_weak));
    debug!(postal_len = snapshot.postal_code().len(), "snapshot entered debounce window");
    state_rc.borrow_mut().pending = Some(Pending { timer, snapshot });
}

/// Timer callback: the window elapsed with no newer snapshot.
fn fire(weak: &Weak<RefCell<PipelineState>>) {
    let Some(state_rc) = weak.upgrade() else {
        return;
    };
    let pending = {
        let mut state = state_rc.borrow_mut();
        if state.detached {
            return;
        }
        state.pending.take()
    };
    if let Some(pending) = pending {
        proceed(&state_rc, pending.snapshot);
    }
}

/// Dedup, evaluate and publish. Returns `true` if an evaluation ran.
fn proceed(state_rc: &Rc<RefCell<PipelineState>>, snapshot: FormSnapshot) -> bool {
    let (validity, valid) = {
        let mut state = state_rc.borrow_mut();
        if state.config.dedup && state.last_evaluated.as_ref() == Some(&snapshot) {
            state.stats.suppressed += 1;
            trace!("unchanged snapshot suppressed");
            return false;
        }
        let valid = Validity::evaluate(&snapshot);
        state.stats.evaluations += 1;
        state.last_evaluated = Some(snapshot);
        (state.validity.clone(), valid)
    };

    let previous = validity.get();
    if previous != valid {
        info!(valid, "validity changed");
    }
    validity.publish(valid);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use addrform_core::Field;
    use addrform_core::clock::{Clock, LabClock};
    use web_time::Duration;

    struct Rig {
        lab: LabClock,
        timers: TimerQueue,
        changes: ChangeBus<FormSnapshot>,
        validity: ChangeBus<bool>,
        pipeline: ValidationPipeline,
    }

    fn rig() -> Rig {
        let lab = LabClock::new();
        let timers = TimerQueue::new(Clock::lab(&lab));
        let changes = ChangeBus::new(FormSnapshot::empty());
        let validity = ChangeBus::new(false);
        let pipeline = ValidationPipeline::attach(
            &changes,
            validity.clone(),
            timers.clone(),
            PipelineConfig::default(),
        );
        Rig {
            lab,
            timers,
            changes,
            validity,
            pipeline,
        }
    }

    impl Rig {
        fn wait(&self, ms: u64) {
            self.lab.advance(Duration::from_millis(ms));
            self.timers.run_due();
        }
    }

    fn complete() -> FormSnapshot {
        FormSnapshot::new("1234567", "東京都", "新宿区", "西新宿", "").unwrap()
    }

    #[test]
    fn initial_replay_is_debounced_then_evaluated() {
        let r = rig();
        assert!(r.pipeline.has_pending());
        assert_eq!(r.pipeline.stats().evaluations, 0);

        r.wait(150);
        assert_eq!(r.pipeline.stats().evaluations, 1);
        assert_eq!(r.pipeline.last_evaluated(), Some(FormSnapshot::empty()));
        assert!(!r.validity.get());
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let r = rig();
        r.wait(150);

        let mut s = complete().with_field(Field::PostalCode, "").unwrap();
        for digit in ["1", "12", "123", "1234", "12345", "123456", "1234567"] {
            s = s.with_field(Field::PostalCode, digit).unwrap();
            r.changes.publish(s.clone());
            r.wait(40);
        }
        assert_eq!(r.pipeline.stats().evaluations, 1);

        r.wait(150);
        let stats = r.pipeline.stats();
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.debounced, 6);
        assert_eq!(r.pipeline.last_evaluated(), Some(complete()));
        assert!(r.validity.get());
    }

    #[test]
    fn same_snapshot_twice_evaluates_once() {
        let r = rig();
        r.wait(150);

        r.changes.publish(complete());
        r.wait(150);
        r.changes.publish(complete());
        r.wait(150);

        let stats = r.pipeline.stats();
        assert_eq!(stats.evaluations, 2); // initial empty + complete
        assert_eq!(stats.suppressed, 1);
    }

    #[test]
    fn dedup_can_be_disabled() {
        let lab = LabClock::new();
        let timers = TimerQueue::new(Clock::lab(&lab));
        let changes = ChangeBus::new(FormSnapshot::empty());
        let pipeline = ValidationPipeline::attach(
            &changes,
            ChangeBus::new(false),
            timers.clone(),
            PipelineConfig::default().with_dedup(false),
        );
        for _ in 0..3 {
            changes.publish(FormSnapshot::empty());
            lab.advance(Duration::from_millis(150));
            timers.run_due();
        }
        assert_eq!(pipeline.stats().evaluations, 3);
    }

    #[test]
    fn detach_cancels_pending_timer() {
        let mut r = rig();
        r.wait(150);
        r.changes.publish(complete());
        assert_eq!(r.timers.pending(), 1);

        r.pipeline.detach();
        assert_eq!(r.timers.pending(), 0);
        assert_eq!(r.changes.subscriber_count(), 0);

        r.wait(500);
        assert!(!r.validity.get());
        assert_eq!(r.pipeline.stats().evaluations, 1);

        // Idempotent.
        r.pipeline.detach();
        assert!(r.pipeline.is_detached());
    }

    #[test]
    fn drop_stops_notifications() {
        let r = rig();
        let Rig {
            lab,
            timers,
            changes,
            validity,
            pipeline,
        } = r;
        changes.publish(complete());
        drop(pipeline);

        lab.advance(Duration::from_secs(1));
        assert_eq!(timers.run_due(), 0);
        assert!(!validity.get());
        assert_eq!(validity.version(), 0);
    }

    #[test]
    fn flush_skips_the_wait() {
        let r = rig();
        r.changes.publish(complete());
        assert!(r.pipeline.flush());
        assert!(r.validity.get());
        assert_eq!(r.timers.pending(), 0);
        assert!(!r.pipeline.flush());
    }

    #[test]
    fn custom_window_is_respected() {
        let lab = LabClock::new();
        let timers = TimerQueue::new(Clock::lab(&lab));
        let changes = ChangeBus::new(complete());
        let validity = ChangeBus::new(false);
        let _pipeline = ValidationPipeline::attach(
            &changes,
            validity.clone(),
            timers.clone(),
            PipelineConfig::default().with_debounce(Duration::from_millis(20)),
        );
        lab.advance(Duration::from_millis(19));
        timers.run_due();
        assert!(!validity.get());
        lab.advance(Duration::from_millis(1));
        timers.run_due();
        assert!(validity.get());
    }
}
