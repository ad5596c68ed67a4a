#![forbid(unsafe_code)]

//! Deterministic driver for [`AddressForm`].
//!
//! `FormSimulator` runs a form on a [`LabClock`] and records every validity
//! evaluation, so tests can script typing, IME composition and pauses and
//! then assert on exactly what the pipeline did.
//!
//! ```
//! use addrform_core::Field;
//! use addrform_runtime::simulator::FormSimulator;
//! use web_time::Duration;
//!
//! let mut sim = FormSimulator::new();
//! sim.type_text(Field::PostalCode, "1600023", Duration::from_millis(30));
//! sim.advance(Duration::from_millis(150));
//! assert_eq!(sim.evaluations(), vec![false]);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use addrform_core::clock::{Clock, LabClock};
use addrform_core::{Field, FormSnapshot};
use web_time::Duration;

use crate::config::PipelineConfig;
use crate::form::{AddressForm, SubmitOutcome};
use crate::pipeline::PipelineStats;
use crate::reactive::Subscription;

/// Scripted form session on a lab clock.
pub struct FormSimulator {
    lab: LabClock,
    form: AddressForm,
    evaluations: Rc<RefCell<Vec<bool>>>,
    _recorder: Subscription,
}

impl Default for FormSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSimulator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        let lab = LabClock::new();
        let form = AddressForm::with_clock(config, Clock::lab(&lab));
        let evaluations = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&evaluations);
        let replayed = Cell::new(false);
        let recorder = form.subscribe_validity(move |valid: &bool| {
            // The first call is the subscription replay, not an evaluation.
            if replayed.replace(true) {
                sink.borrow_mut().push(*valid);
            }
        });
        Self {
            lab,
            form,
            evaluations,
            _recorder: recorder,
        }
    }

    /// Single edit, no time passes.
    pub fn edit(&mut self, field: Field, value: &str) -> bool {
        self.form.on_field_edit(field, value)
    }

    /// Type `text` one character at a time, `gap` apart.
    ///
    /// Each keystroke proposes the whole prefix typed so far, as a text input
    /// would. Returns how many keystrokes the gate accepted.
    pub fn type_text(&mut self, field: Field, text: &str, gap: Duration) -> usize {
        let mut accepted = 0;
        let mut typed = self.form.snapshot().get(field).to_owned();
        for (i, ch) in text.chars().enumerate() {
            if i > 0 {
                self.advance(gap);
            }
            let mut proposed = typed.clone();
            proposed.push(ch);
            if self.form.on_field_edit(field, &proposed) {
                typed = proposed;
                accepted += 1;
            }
        }
        accepted
    }

    /// Full IME session: start, each intermediate edit `gap` apart, commit.
    pub fn compose(&mut self, field: Field, intermediates: &[&str], committed: &str, gap: Duration) {
        self.form.on_composition_start(field);
        for text in intermediates {
            self.form.on_field_edit(field, text);
            self.advance(gap);
        }
        self.form.on_composition_end(field, committed);
    }

    /// Move the lab clock forward and fire whatever came due.
    pub fn advance(&mut self, by: Duration) -> usize {
        self.lab.advance(by);
        self.form.poll()
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.form.on_submit()
    }

    /// Validity results in evaluation order.
    #[must_use]
    pub fn evaluations(&self) -> Vec<bool> {
        self.evaluations.borrow().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        self.form.snapshot()
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.form.stats()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.form.is_valid()
    }

    #[must_use]
    pub fn form(&self) -> &AddressForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AddressForm {
        &mut self.form
    }

    #[must_use]
    pub fn lab(&self) -> &LabClock {
        &self.lab
    }
}
