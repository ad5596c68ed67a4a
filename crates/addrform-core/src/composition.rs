#![forbid(unsafe_code)]

//! IME composition tracking.
//!
//! While an input method holds unconfirmed text, edits still reach the
//! display but are held back from validation. The tracker is the flag that
//! makes that decision.
//!
//! ```text
//!            start(field)
//!   Idle ───────────────────▶ Composing
//!    ▲                            │
//!    └────────── end(field) ──────┘
//! ```
//!
//! A commit always returns the tracker to `Idle`, including a stray `end`
//! that never saw a `start` (some platforms drop the start event when focus
//! moves mid-composition).

#[cfg(feature = "tracing")]
use crate::logging::{debug, warn};
#[cfg(not(feature = "tracing"))]
use crate::{debug, warn};

use crate::snapshot::Field;

/// Whether an input method is holding unconfirmed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionState {
    #[default]
    Idle,
    Composing,
}

/// Result of [`CompositionTracker::end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionCommit {
    /// Field the committed text belongs to.
    pub field: Field,
    /// Whether a matching `start` was observed for this field.
    pub matched: bool,
}

/// Two-state composition flag.
#[derive(Debug, Clone, Default)]
pub struct CompositionTracker {
    state: CompositionState,
    field: Option<Field>,
}

impl CompositionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> CompositionState {
        self.state
    }

    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.state == CompositionState::Composing
    }

    /// Field currently being composed, if any.
    #[must_use]
    pub fn composing_field(&self) -> Option<Field> {
        self.field
    }

    /// Whether an ordinary edit may be forwarded to validation right now.
    #[must_use]
    pub fn should_forward(&self) -> bool {
        !self.is_composing()
    }

    /// Enter `Composing` for `field`.
    pub fn start(&mut self, field: Field) {
        if self.field.is_some_and(|f| f != field) {
            debug!(
                from = ?self.field,
                to = field.as_str(),
                "composition moved to another field"
            );
        }
        self.state = CompositionState::Composing;
        self.field = Some(field);
    }

    /// Return to `Idle`, reporting whether the commit matched a start.
    pub fn end(&mut self, field: Field) -> CompositionCommit {
        let matched = self.is_composing() && self.field == Some(field);
        if !matched {
            warn!(
                field = field.as_str(),
                "composition end without a matching start"
            );
        }
        self.state = CompositionState::Idle;
        self.field = None;
        CompositionCommit { field, matched }
    }
}
