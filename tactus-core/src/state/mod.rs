//! Lifecycle state machine
//!
//! Core phase, power phase and display mode are tracked as independent
//! axes. Decisions read one [`LifecycleState`] snapshot and act on it.

mod lifecycle;
mod phase;

pub use lifecycle::{LifecycleState, StateCell};
pub use phase::{CoreInput, CorePhase, DisplayMode, PowerPhase, Step};
