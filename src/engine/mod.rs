//! The real-time engine: timing, stimulus generation, risk estimation,
//! the trial state machine, and the phase controller that sequences them.

pub mod controller;
pub mod risk;
pub mod stats;
pub mod stimulus;
pub mod timebase;
pub mod trial;

pub use controller::{
    AbortHandle, Collaborators, ControlState, Gesture, PhaseController, SessionOutcome,
};
pub use risk::RiskEstimator;
pub use timebase::PhaseTimer;
pub use trial::{Classification, TrialOutcome, TrialState};
