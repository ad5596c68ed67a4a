#![forbid(unsafe_code)]

//! Core: address snapshots, edit gating, composition tracking, validity.

pub mod clock;
pub mod composition;
pub mod edit_gate;
pub mod logging;
pub mod snapshot;
pub mod validity;

pub use composition::{CompositionCommit, CompositionState, CompositionTracker};
pub use edit_gate::{EditGate, GateDecision, RejectReason};
pub use snapshot::{Field, FormSnapshot, POSTAL_CODE_LEN};
pub use validity::Validity;
