//! Core infrastructure for callgate.
//!
//! This crate provides the pieces every gate component shares:
//! - A monotonic [`Clock`] source for window and timeout calculations
//! - [`CallOutcome`], the per-attempt classification fed to circuit breakers
//! - The event system used for observability
//! - [`GateError`], the unified error surfaced by a composed gate

pub mod clock;
pub mod error;
pub mod events;
pub mod outcome;

pub use clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use error::{AttemptFailure, GateError};
pub use events::{EventListener, EventListeners, FnListener, GateEvent};
pub use outcome::CallOutcome;
