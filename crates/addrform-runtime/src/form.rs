#![forbid(unsafe_code)]

//! The address form controller.
//!
//! [`AddressForm`] is what a display layer holds. It takes the four inbound
//! user actions, keeps the visible snapshot current on every accepted
//! keystroke, and decides when a snapshot becomes authoritative enough to
//! reach validation.
//!
//! ```text
//! on_field_edit ──▶ EditGate ──▶ visible bus ──(not composing)──▶ change bus ──▶ pipeline
//! on_composition_end ──▶ EditGate ──▶ visible bus ──(always)─────▶ change bus ──▶ pipeline
//! ```
//!
//! Each form owns its buses, timer queue and pipeline; two forms never share
//! state.

use addrform_core::clock::Clock;
use addrform_core::{CompositionTracker, Field, FormSnapshot};
use tracing::{debug, info};
use web_time::Instant;

use crate::config::PipelineConfig;
use crate::pipeline::{PipelineStats, ValidationPipeline};
use crate::reactive::{ChangeBus, Subscription};
use crate::timer::TimerQueue;

/// Result of [`AddressForm::on_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The flag was set; carries the snapshot that was submitted.
    Accepted(FormSnapshot),
    /// The flag was clear; nothing happened.
    Ignored,
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

type ConfirmFn = Box<dyn FnMut(&FormSnapshot)>;

/// A single address form with its own validation pipeline.
pub struct AddressForm {
    visible: ChangeBus<FormSnapshot>,
    changes: ChangeBus<FormSnapshot>,
    validity: ChangeBus<bool>,
    timers: TimerQueue,
    tracker: CompositionTracker,
    pipeline: ValidationPipeline,
    on_confirm: Option<ConfirmFn>,
}

impl std::fmt::Debug for AddressForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressForm")
            .field("snapshot", &self.visible.get())
            .field("valid", &self.validity.get())
            .field("composition", &self.tracker.state())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl AddressForm {
    /// Create an empty form reading wall-clock time.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clock(config, Clock::real())
    }

    /// Create an empty form on an explicit clock.
    #[must_use]
    pub fn with_clock(config: PipelineConfig, clock: Clock) -> Self {
        let timers = TimerQueue::new(clock);
        let visible = ChangeBus::new(FormSnapshot::empty());
        let changes = ChangeBus::new(FormSnapshot::empty());
        let validity = ChangeBus::new(false);
        let pipeline = ValidationPipeline::attach(&changes, validity.clone(), timers.clone(), config);
        Self {
            visible,
            changes,
            validity,
            timers,
            tracker: CompositionTracker::new(),
            pipeline,
            on_confirm: None,
        }
    }

    /// Call `confirm` with the submitted snapshot on every accepted submit.
    #[must_use]
    pub fn with_confirmation(mut self, confirm: impl FnMut(&FormSnapshot) + 'static) -> Self {
        self.on_confirm = Some(Box::new(confirm));
        self
    }

    // ── Inbound ──────────────────────────────────────────────────────

    /// A keystroke or paste changed `field` to `raw`.
    ///
    /// Returns `false` if the gate refused the value; the snapshot is then
    /// unchanged and nothing is published.
    pub fn on_field_edit(&mut self, field: Field, raw: &str) -> bool {
        let Some(next) = self.gate(field, raw) else {
            return false;
        };
        self.visible.publish(next.clone());
        if self.tracker.should_forward() {
            self.changes.publish(next);
        } else {
            debug!(field = field.as_str(), "edit held back during composition");
        }
        true
    }

    /// The input method began an unconfirmed composition in `field`.
    pub fn on_composition_start(&mut self, field: Field) {
        debug!(field = field.as_str(), "composition start");
        self.tracker.start(field);
    }

    /// The input method committed `committed` into `field`.
    ///
    /// Always publishes the resulting snapshot to validation, even when the
    /// committed text is refused or leaves the snapshot unchanged.
    pub fn on_composition_end(&mut self, field: Field, committed: &str) {
        let commit = self.tracker.end(field);
        let snapshot = match self.gate(field, committed) {
            Some(next) => {
                self.visible.publish(next.clone());
                next
            }
            None => self.visible.get(),
        };
        debug!(field = field.as_str(), matched = commit.matched, "composition commit");
        self.changes.publish(snapshot);
    }

    /// The user pressed submit.
    ///
    /// Re-checks the validity flag; the disabled control is only advisory. A
    /// snapshot still inside its debounce window is evaluated first, and the
    /// accepted payload is the snapshot the flag was computed from.
    pub fn on_submit(&mut self) -> SubmitOutcome {
        if self.pipeline.flush() {
            debug!("pending snapshot evaluated at submit");
        }
        let evaluated = self
            .pipeline
            .last_evaluated()
            .filter(|_| self.validity.get());
        let Some(snapshot) = evaluated else {
            debug!("submit ignored while invalid");
            return SubmitOutcome::Ignored;
        };
        info!(postal_code = snapshot.postal_code(), "address submitted");
        if let Some(confirm) = self.on_confirm.as_mut() {
            confirm(&snapshot);
        }
        SubmitOutcome::Accepted(snapshot)
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// What the display should render right now.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        self.visible.get()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity.get()
    }

    /// Whether the submit control should be enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_valid()
    }

    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.tracker.is_composing()
    }

    /// Re-render hook: called now with the visible snapshot, then on every
    /// accepted edit.
    pub fn subscribe_snapshot(&self, f: impl Fn(&FormSnapshot) + 'static) -> Subscription {
        self.visible.subscribe(f)
    }

    /// Called now with the validity flag, then on every evaluation.
    pub fn subscribe_validity(&self, f: impl Fn(&bool) + 'static) -> Subscription {
        self.validity.subscribe(f)
    }

    /// Authoritative snapshots as seen by the pipeline.
    pub fn subscribe_changes(&self, f: impl Fn(&FormSnapshot) + 'static) -> Subscription {
        self.changes.subscribe(f)
    }

    // ── Event loop ───────────────────────────────────────────────────

    /// Fire due timers. Returns how many fired.
    pub fn poll(&self) -> usize {
        self.timers.run_due()
    }

    /// When the host should next call [`poll`](Self::poll).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Evaluate any pending snapshot immediately.
    pub fn flush(&self) -> bool {
        self.pipeline.flush()
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Tear down validation. Edits keep updating the visible snapshot, but
    /// the validity flag is frozen from here on.
    pub fn close(&mut self) {
        self.pipeline.detach();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pipeline.is_detached()
    }

    fn gate(&self, field: Field, raw: &str) -> Option<FormSnapshot> {
        match self.visible.get().with_field(field, raw.to_owned()) {
            Ok(next) => Some(next),
            Err(reason) => {
                debug!(field = field.as_str(), %reason, "edit rejected");
                None
            }
        }
    }
}
