#![forbid(unsafe_code)]

//! Reactive plumbing for addrform.
//!
//! - [`ChangeBus`]: a shared, replay-latest cell with an ordered subscriber
//!   list. Carries both the authoritative form snapshot and the validity flag.
//! - [`Subscription`]: handle that detaches on demand or on drop.
//!
//! # Architecture
//!
//! Everything runs on one logical event loop, so shared state lives in
//! `Rc<RefCell<..>>` with no locking. Callbacks run with no outstanding
//! borrow, which keeps re-entrant reads and detaches safe.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A new subscriber receives the held value before `subscribe` returns.
//! 3. A detached subscriber is never called again.

pub mod change_bus;

pub use change_bus::{ChangeBus, Subscription};
