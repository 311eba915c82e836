use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for job applications.
    ApplicationId
);
string_id!(JobId);
string_id!(CompanyId);
string_id!(CandidateId);
string_id!(RecruiterId);
string_id!(
    /// Identity issued by the external provider, accepted as given.
    UserId
);
string_id!(NoteId);
string_id!(AuditEntryId);

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Position of an application in the multi-party review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    AiReview,
    AiReviewed,
    RecruiterRequest,
    RecruiterProposed,
    RecruiterReview,
    Screen,
    Submitted,
    CompanyReview,
    CompanyFeedback,
    Interview,
    Offer,
    Hired,
    Rejected,
    Withdrawn,
    Expired,
}

impl Stage {
    pub const ALL: [Stage; 16] = [
        Stage::Draft,
        Stage::AiReview,
        Stage::AiReviewed,
        Stage::RecruiterRequest,
        Stage::RecruiterProposed,
        Stage::RecruiterReview,
        Stage::Screen,
        Stage::Submitted,
        Stage::CompanyReview,
        Stage::CompanyFeedback,
        Stage::Interview,
        Stage::Offer,
        Stage::Hired,
        Stage::Rejected,
        Stage::Withdrawn,
        Stage::Expired,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::AiReview => "ai_review",
            Stage::AiReviewed => "ai_reviewed",
            Stage::RecruiterRequest => "recruiter_request",
            Stage::RecruiterProposed => "recruiter_proposed",
            Stage::RecruiterReview => "recruiter_review",
            Stage::Screen => "screen",
            Stage::Submitted => "submitted",
            Stage::CompanyReview => "company_review",
            Stage::CompanyFeedback => "company_feedback",
            Stage::Interview => "interview",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
            Stage::Withdrawn => "withdrawn",
            Stage::Expired => "expired",
        }
    }

    /// Terminal stages never transition further.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::Hired | Stage::Rejected | Stage::Withdrawn | Stage::Expired
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Posting an application targets. The company-side recruiter lives here, not on the
/// application, so fee splits follow the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub company_id: CompanyId,
    pub title: String,
    pub company_recruiter_id: Option<RecruiterId>,
}

/// The central entity. `stage` is only written through the lifecycle service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub stage: Stage,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub candidate_recruiter_id: Option<RecruiterId>,
    pub salary: Option<u64>,
    pub decline_reason: Option<String>,
    pub decline_details: Option<String>,
    pub ai_review: Option<AiReviewSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with its job, the shape every side check needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application: Application,
    pub job: Job,
}

impl ApplicationRecord {
    pub fn id(&self) -> &ApplicationId {
        &self.application.id
    }

    pub fn stage(&self) -> Stage {
        self.application.stage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitRecommendation {
    StrongFit,
    GoodFit,
    FairFit,
    PoorFit,
}

impl FitRecommendation {
    pub const fn label(self) -> &'static str {
        match self {
            FitRecommendation::StrongFit => "strong_fit",
            FitRecommendation::GoodFit => "good_fit",
            FitRecommendation::FairFit => "fair_fit",
            FitRecommendation::PoorFit => "poor_fit",
        }
    }
}

/// Payload delivered by the external reviewer once an AI review finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiReviewResult {
    pub recommendation: FitRecommendation,
    #[serde(default)]
    pub fit_score: Option<u8>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

impl AiReviewResult {
    /// Poor fits, and fair fits with concrete concerns, are sent back for improvement.
    pub fn needs_improvement(&self) -> bool {
        match self.recommendation {
            FitRecommendation::PoorFit => true,
            FitRecommendation::FairFit => self.concerns.iter().any(|c| !c.trim().is_empty()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiReviewSummary {
    pub recommendation: FitRecommendation,
    pub fit_score: Option<u8>,
    pub concerns: Vec<String>,
    pub strengths: Vec<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StageChanged,
    AiReviewStarted,
    AiReviewCompleted,
    PrescreenRequested,
    ProposalAccepted,
    ProposalDeclined,
    Hired,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StageChanged => "stage_changed",
            AuditAction::AiReviewStarted => "ai_review_started",
            AuditAction::AiReviewCompleted => "ai_review_completed",
            AuditAction::PrescreenRequested => "prescreen_requested",
            AuditAction::ProposalAccepted => "proposal_accepted",
            AuditAction::ProposalDeclined => "proposal_declined",
            AuditAction::Hired => "hired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Candidate,
    Recruiter,
    CompanyMember,
    PlatformAdmin,
    System,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Candidate => "candidate",
            ActorRole::Recruiter => "recruiter",
            ActorRole::CompanyMember => "company_member",
            ActorRole::PlatformAdmin => "platform_admin",
            ActorRole::System => "system",
        }
    }
}

/// Immutable record of one action against one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub application_id: ApplicationId,
    pub action: AuditAction,
    pub actor_user_id: Option<UserId>,
    pub actor_role: ActorRole,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Declared authorship of a note; each type belongs to exactly one side (or to the platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorType {
    Candidate,
    CandidateRecruiter,
    CompanyRecruiter,
    HiringManager,
    CompanyAdmin,
    PlatformAdmin,
}

impl CreatorType {
    pub const fn label(self) -> &'static str {
        match self {
            CreatorType::Candidate => "candidate",
            CreatorType::CandidateRecruiter => "candidate_recruiter",
            CreatorType::CompanyRecruiter => "company_recruiter",
            CreatorType::HiringManager => "hiring_manager",
            CreatorType::CompanyAdmin => "company_admin",
            CreatorType::PlatformAdmin => "platform_admin",
        }
    }
}

/// Audience scope of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Shared,
    CompanyOnly,
    CandidateOnly,
}

impl Visibility {
    pub const fn label(self) -> &'static str {
        match self {
            Visibility::Shared => "shared",
            Visibility::CompanyOnly => "company_only",
            Visibility::CandidateOnly => "candidate_only",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    #[default]
    General,
    Question,
    Answer,
    Feedback,
}

/// Threaded comment attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationNote {
    pub id: NoteId,
    pub application_id: ApplicationId,
    pub created_by_user_id: UserId,
    pub created_by_type: CreatorType,
    pub note_type: NoteType,
    pub visibility: Visibility,
    pub message: String,
    pub in_response_to_id: Option<NoteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages_are_exactly_four() {
        let terminal: Vec<Stage> = Stage::ALL
            .iter()
            .copied()
            .filter(|stage| stage.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![Stage::Hired, Stage::Rejected, Stage::Withdrawn, Stage::Expired]
        );
    }

    #[test]
    fn stage_labels_match_wire_format() {
        for stage in Stage::ALL {
            let encoded = serde_json::to_value(stage).expect("stage serializes");
            assert_eq!(encoded, serde_json::Value::String(stage.label().to_string()));
        }
    }

    #[test]
    fn fair_fit_needs_improvement_only_with_concerns() {
        let mut result = AiReviewResult {
            recommendation: FitRecommendation::FairFit,
            fit_score: Some(55),
            concerns: Vec::new(),
            strengths: vec!["Rust".to_string()],
        };
        assert!(!result.needs_improvement());

        result.concerns.push("   ".to_string());
        assert!(!result.needs_improvement());

        result.concerns.push("No production experience".to_string());
        assert!(result.needs_improvement());
    }

    #[test]
    fn poor_fit_always_needs_improvement() {
        let result = AiReviewResult {
            recommendation: FitRecommendation::PoorFit,
            fit_score: None,
            concerns: Vec::new(),
            strengths: Vec::new(),
        };
        assert!(result.needs_improvement());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ApplicationId::new("app-1");
        assert_eq!(serde_json::to_string(&id).expect("serializes"), "\"app-1\"");
    }
}
