#![forbid(unsafe_code)]

//! Runtime: the change bus, debounced validation pipeline, and form
//! controller that sit between a display layer and the address model.

pub mod config;
pub mod form;
pub mod pipeline;
pub mod reactive;
pub mod simulator;
pub mod timer;

pub use config::{ConfigError, PipelineConfig};
pub use form::{AddressForm, SubmitOutcome};
pub use pipeline::{PipelineStats, ValidationPipeline};
pub use reactive::{ChangeBus, Subscription};
pub use timer::{TimerHandle, TimerQueue};
