//! Application lifecycle and recruiter assignment engine for a recruiting marketplace.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
