use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::RecruiterId;

pub const RECENT_WINDOW_DAYS: i64 = 30;
pub const ACTIVE_WINDOW_DAYS: i64 = 90;

/// Recruiter subscription plan level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Starter,
    Pro,
    Partner,
}

impl SubscriptionTier {
    pub const fn weight(self) -> u32 {
        match self {
            SubscriptionTier::Starter => 1,
            SubscriptionTier::Pro => 2,
            SubscriptionTier::Partner => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Partner => "partner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starter" => Some(Self::Starter),
            "pro" => Some(Self::Pro),
            "partner" => Some(Self::Partner),
            _ => None,
        }
    }
}

/// 3 inside the recent window, 2 inside the active window, otherwise 1.
pub fn activity_weight(last_application_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    match last_application_at {
        Some(at) if now - at <= Duration::days(RECENT_WINDOW_DAYS) => 3,
        Some(at) if now - at <= Duration::days(ACTIVE_WINDOW_DAYS) => 2,
        _ => 1,
    }
}

/// Inverse of the current pre-screen backlog.
pub fn workload_weight(pending_prescreens: u32) -> u32 {
    match pending_prescreens {
        0 => 3,
        1..=2 => 2,
        _ => 1,
    }
}

/// Per-attempt working set entry; discarded after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecruiterCandidate {
    pub recruiter_id: RecruiterId,
    pub tier: Option<SubscriptionTier>,
    pub last_application_at: Option<DateTime<Utc>>,
    pub pending_prescreens: u32,
}

impl RecruiterCandidate {
    /// Product of tier, activity, and workload factors (1..=27).
    pub fn weight(&self, now: DateTime<Utc>) -> u32 {
        let tier = self.tier.map(SubscriptionTier::weight).unwrap_or(1);
        tier * activity_weight(self.last_application_at, now) * workload_weight(self.pending_prescreens)
    }
}
