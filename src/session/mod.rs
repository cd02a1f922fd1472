//! Session phase tracking.
//!
//! Follows a simulated client from directory login to the game view.
//! The mock server owns one [`MockSession`] per connection and advances it
//! through [`trigger::evaluate`].

pub mod state;
pub mod trigger;

pub use state::{MockSession, PhaseTransition, SessionPhase};
pub use trigger::{PhaseTrigger, TriggerResult, evaluate};
