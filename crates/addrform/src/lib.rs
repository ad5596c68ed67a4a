#![forbid(unsafe_code)]

//! addrform public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use addrform::prelude::*;
//!
//! let lab = LabClock::new();
//! let mut form = AddressForm::with_clock(PipelineConfig::default(), Clock::lab(&lab));
//! form.on_field_edit(Field::PostalCode, "1600023");
//! form.on_field_edit(Field::Prefecture, "東京都");
//! form.on_field_edit(Field::City, "新宿区");
//! form.on_field_edit(Field::Town, "西新宿");
//!
//! lab.advance(std::time::Duration::from_millis(150));
//! form.poll();
//! assert!(form.on_submit().is_accepted());
//! ```

pub mod prelude {
    pub use addrform_core as core;
    pub use addrform_runtime as runtime;

    pub use addrform_core::clock::{Clock, LabClock};
    pub use addrform_core::{
        CompositionState, EditGate, Field, FormSnapshot, GateDecision, RejectReason, Validity,
    };
    pub use addrform_runtime::{
        AddressForm, ChangeBus, PipelineConfig, PipelineStats, SubmitOutcome, Subscription,
    };
}
