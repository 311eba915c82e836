//! Weighted-random dispatch of a company-side recruiter with tiered fallback.

mod draw;
mod engine;
mod weights;

pub use draw::pick_weighted;
pub use engine::{AssignmentConfig, PoolTier, RecruiterAssignment, RecruiterAssignmentEngine};
pub use weights::{
    activity_weight, workload_weight, RecruiterCandidate, SubscriptionTier,
    ACTIVE_WINDOW_DAYS, RECENT_WINDOW_DAYS,
};
