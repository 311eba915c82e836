use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assignment::SubscriptionTier;
use super::domain::{
    AiReviewSummary, Application, ApplicationId, ApplicationNote, ApplicationRecord,
    AuditLogEntry, CandidateId, CompanyId, Job, JobId, NoteId, RecruiterId, Stage, UserId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stage changed concurrently (expected {expected}, found {actual})")]
    StageMismatch { expected: Stage, actual: Stage },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Field changes applied together with a stage write. None of them land if the
/// conditional check fails.
#[derive(Debug, Clone, PartialEq)]
pub struct StageWrite {
    pub stage: Stage,
    pub decline_reason: Option<String>,
    pub decline_details: Option<String>,
    pub salary: Option<u64>,
    pub ai_review: Option<AiReviewSummary>,
    /// Company-side recruiter recorded on the application's job.
    pub company_recruiter: Option<RecruiterId>,
    /// Recruiter-company relationship activated with the write.
    pub relationship: Option<RecruiterCompanyLink>,
    pub at: DateTime<Utc>,
}

impl StageWrite {
    pub fn to(stage: Stage, at: DateTime<Utc>) -> Self {
        Self {
            stage,
            decline_reason: None,
            decline_details: None,
            salary: None,
            ai_review: None,
            company_recruiter: None,
            relationship: None,
            at,
        }
    }
}

/// Range-scan filter for application listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationScope {
    All,
    Participant {
        candidate_id: Option<CandidateId>,
        recruiter_id: Option<RecruiterId>,
        company_ids: BTreeSet<CompanyId>,
    },
}

pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Conditional write: fails with `StageMismatch` unless the stored stage equals `expected`.
    fn write_stage(
        &self,
        id: &ApplicationId,
        expected: Stage,
        write: StageWrite,
    ) -> Result<Application, RepositoryError>;
    fn list_applications(
        &self,
        scope: &ApplicationScope,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

pub trait JobRepository: Send + Sync {
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
}

/// Append-only audit trail.
pub trait AuditLogRepository: Send + Sync {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError>;
    fn entries_for(&self, id: &ApplicationId) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}

pub trait NoteRepository: Send + Sync {
    fn insert_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError>;
    fn fetch_note(&self, id: &NoteId) -> Result<Option<ApplicationNote>, RepositoryError>;
    fn notes_for(&self, id: &ApplicationId) -> Result<Vec<ApplicationNote>, RepositoryError>;
    fn update_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError>;
    fn delete_note(&self, id: &NoteId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecruiterStatus {
    Active,
    Pending,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterProfile {
    pub id: RecruiterId,
    pub user_id: UserId,
    pub status: RecruiterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Admin,
    HiringManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMembership {
    pub company_id: CompanyId,
    pub role: MembershipRole,
}

/// Relational lookups the access resolver joins per request.
pub trait AccessDirectory: Send + Sync {
    fn candidate_for_user(&self, user: &UserId) -> Result<Option<CandidateId>, RepositoryError>;
    fn recruiter_for_user(&self, user: &UserId)
        -> Result<Option<RecruiterProfile>, RepositoryError>;
    fn recruiter_by_id(&self, id: &RecruiterId)
        -> Result<Option<RecruiterProfile>, RepositoryError>;
    fn memberships_for_user(&self, user: &UserId)
        -> Result<Vec<CompanyMembership>, RepositoryError>;
    fn is_platform_admin(&self, user: &UserId) -> Result<bool, RepositoryError>;
}

/// Row in the `recruiter_companies` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterCompanyLink {
    pub recruiter_id: RecruiterId,
    pub company_id: CompanyId,
    pub role: String,
    pub can_manage_company_jobs: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Queries backing the recruiter assignment engine.
pub trait RecruiterPool: Send + Sync {
    /// Active recruiters with an active relationship to the company.
    fn company_recruiters(&self, company: &CompanyId) -> Result<Vec<RecruiterId>, RepositoryError>;
    /// Platform-wide active recruiters, bounded by `limit`.
    fn active_recruiters(&self, limit: usize) -> Result<Vec<RecruiterId>, RepositoryError>;
    /// Tier of each recruiter's active subscription; recruiters without one are absent.
    fn subscription_tiers(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, SubscriptionTier>, RepositoryError>;
    /// Most recent application each recruiter brought in as candidate-side recruiter.
    fn last_application_activity(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, DateTime<Utc>>, RepositoryError>;
    fn pending_prescreens(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, u32>, RepositoryError>;
    /// Upsert keyed on (recruiter, company): an existing row is reactivated in place.
    fn activate_relationship(&self, link: RecruiterCompanyLink) -> Result<(), RepositoryError>;
}

/// Everything the pipeline reads and writes, typically one relational store.
pub trait PipelineStore:
    ApplicationRepository
    + JobRepository
    + AuditLogRepository
    + NoteRepository
    + AccessDirectory
    + RecruiterPool
{
}

impl<T> PipelineStore for T where
    T: ApplicationRepository
        + JobRepository
        + AuditLogRepository
        + NoteRepository
        + AccessDirectory
        + RecruiterPool
{
}
