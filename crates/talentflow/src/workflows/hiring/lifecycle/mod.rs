//! The application state machine and the service that owns writes to `stage`.

mod actions;
mod service;
mod transitions;

pub use actions::{AiReviewOutcome, PrescreenOutcome};
pub use service::{ApplicationLifecycle, NewApplication, Proposal, StageUpdate};
pub use transitions::{allowed_transitions, validate_transition, DeclineInput, TransitionError};
