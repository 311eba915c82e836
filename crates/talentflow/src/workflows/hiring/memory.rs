//! Process-local store and event bus used by the demo, the simulator and the test suites.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::assignment::SubscriptionTier;
use super::domain::{
    Application, ApplicationId, ApplicationNote, ApplicationRecord, AuditLogEntry, CandidateId,
    CompanyId, Job, JobId, NoteId, RecruiterId, Stage, UserId,
};
use super::events::{EventError, EventPublisher, PipelineEvent};
use super::repository::{
    AccessDirectory, ApplicationRepository, ApplicationScope, AuditLogRepository,
    CompanyMembership, JobRepository, NoteRepository, RecruiterCompanyLink, RecruiterPool,
    RecruiterProfile, RecruiterStatus, RepositoryError, StageWrite,
};

#[derive(Default)]
struct StoreState {
    applications: BTreeMap<ApplicationId, Application>,
    jobs: HashMap<JobId, Job>,
    audit: Vec<AuditLogEntry>,
    notes: Vec<ApplicationNote>,
    candidates: HashMap<UserId, CandidateId>,
    recruiters: BTreeMap<RecruiterId, RecruiterProfile>,
    memberships: HashMap<UserId, Vec<CompanyMembership>>,
    platform_admins: BTreeSet<UserId>,
    links: Vec<RecruiterCompanyLink>,
    subscriptions: HashMap<RecruiterId, (SubscriptionTier, bool)>,
}

impl StoreState {
    fn record(&self, application: &Application) -> Option<ApplicationRecord> {
        self.jobs.get(&application.job_id).map(|job| ApplicationRecord {
            application: application.clone(),
            job: job.clone(),
        })
    }

    /// Reactivates an existing (recruiter, company) row, keeping its role and creation time.
    fn upsert_link(&mut self, link: RecruiterCompanyLink) {
        match self.links.iter_mut().find(|existing| {
            existing.recruiter_id == link.recruiter_id && existing.company_id == link.company_id
        }) {
            Some(existing) => existing.active = true,
            None => self.links.push(link),
        }
    }

    fn is_active(&self, recruiter_id: &RecruiterId) -> bool {
        self.recruiters
            .get(recruiter_id)
            .map(|profile| profile.status == RecruiterStatus::Active)
            .unwrap_or(false)
    }
}

/// Single-mutex relational stand-in; every trait call is atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_candidate(&self, user_id: UserId, candidate_id: CandidateId) {
        self.state().candidates.insert(user_id, candidate_id);
    }

    pub fn add_recruiter(&self, profile: RecruiterProfile) {
        self.state().recruiters.insert(profile.id.clone(), profile);
    }

    pub fn add_membership(&self, user_id: UserId, membership: CompanyMembership) {
        self.state()
            .memberships
            .entry(user_id)
            .or_default()
            .push(membership);
    }

    pub fn grant_platform_admin(&self, user_id: UserId) {
        self.state().platform_admins.insert(user_id);
    }

    pub fn add_job(&self, job: Job) {
        self.state().jobs.insert(job.id.clone(), job);
    }

    pub fn add_relationship(&self, link: RecruiterCompanyLink) {
        self.state().links.push(link);
    }

    pub fn set_subscription(&self, recruiter_id: RecruiterId, tier: SubscriptionTier, active: bool) {
        self.state()
            .subscriptions
            .insert(recruiter_id, (tier, active));
    }

    pub fn relationships(&self) -> Vec<RecruiterCompanyLink> {
        self.state().links.clone()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state().audit.clone()
    }

    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.state().jobs.get(id).cloned()
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state();
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        if !state.jobs.contains_key(&application.job_id) {
            return Err(RepositoryError::NotFound);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let state = self.state();
        Ok(state
            .applications
            .get(id)
            .and_then(|application| state.record(application)))
    }

    fn write_stage(
        &self,
        id: &ApplicationId,
        expected: Stage,
        write: StageWrite,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state();
        let application = state
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if application.stage != expected {
            return Err(RepositoryError::StageMismatch {
                expected,
                actual: application.stage,
            });
        }

        let job_id = application.job_id.clone();
        application.stage = write.stage;
        if write.decline_reason.is_some() || write.decline_details.is_some() {
            application.decline_reason = write.decline_reason;
            application.decline_details = write.decline_details;
        }
        if write.salary.is_some() {
            application.salary = write.salary;
        }
        if write.ai_review.is_some() {
            application.ai_review = write.ai_review;
        }
        application.updated_at = write.at;
        let application = application.clone();

        if let Some(recruiter_id) = write.company_recruiter {
            if let Some(job) = state.jobs.get_mut(&job_id) {
                job.company_recruiter_id = Some(recruiter_id);
            }
        }
        if let Some(link) = write.relationship {
            state.upsert_link(link);
        }
        Ok(application)
    }

    fn list_applications(
        &self,
        scope: &ApplicationScope,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let state = self.state();
        let mut records: Vec<ApplicationRecord> = state
            .applications
            .values()
            .filter_map(|application| state.record(application))
            .filter(|record| match scope {
                ApplicationScope::All => true,
                ApplicationScope::Participant {
                    candidate_id,
                    recruiter_id,
                    company_ids,
                } => {
                    candidate_id.as_ref() == Some(&record.application.candidate_id)
                        || (recruiter_id.is_some()
                            && (*recruiter_id == record.application.candidate_recruiter_id
                                || *recruiter_id == record.job.company_recruiter_id))
                        || company_ids.contains(&record.job.company_id)
                }
            })
            .collect();
        records.sort_by(|a, b| b.application.created_at.cmp(&a.application.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

impl JobRepository for InMemoryStore {
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.state().jobs.get(id).cloned())
    }
}

impl AuditLogRepository for InMemoryStore {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError> {
        self.state().audit.push(entry);
        Ok(())
    }

    fn entries_for(&self, id: &ApplicationId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Ok(self
            .state()
            .audit
            .iter()
            .filter(|entry| &entry.application_id == id)
            .cloned()
            .collect())
    }
}

impl NoteRepository for InMemoryStore {
    fn insert_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError> {
        let mut state = self.state();
        if state.notes.iter().any(|existing| existing.id == note.id) {
            return Err(RepositoryError::Conflict);
        }
        state.notes.push(note.clone());
        Ok(note)
    }

    fn fetch_note(&self, id: &NoteId) -> Result<Option<ApplicationNote>, RepositoryError> {
        Ok(self.state().notes.iter().find(|note| &note.id == id).cloned())
    }

    fn notes_for(&self, id: &ApplicationId) -> Result<Vec<ApplicationNote>, RepositoryError> {
        Ok(self
            .state()
            .notes
            .iter()
            .filter(|note| &note.application_id == id)
            .cloned()
            .collect())
    }

    fn update_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError> {
        let mut state = self.state();
        let slot = state
            .notes
            .iter_mut()
            .find(|existing| existing.id == note.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = note.clone();
        Ok(note)
    }

    fn delete_note(&self, id: &NoteId) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let before = state.notes.len();
        state.notes.retain(|note| &note.id != id);
        if state.notes.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl AccessDirectory for InMemoryStore {
    fn candidate_for_user(&self, user: &UserId) -> Result<Option<CandidateId>, RepositoryError> {
        Ok(self.state().candidates.get(user).cloned())
    }

    fn recruiter_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<RecruiterProfile>, RepositoryError> {
        Ok(self
            .state()
            .recruiters
            .values()
            .find(|profile| &profile.user_id == user)
            .cloned())
    }

    fn recruiter_by_id(
        &self,
        id: &RecruiterId,
    ) -> Result<Option<RecruiterProfile>, RepositoryError> {
        Ok(self.state().recruiters.get(id).cloned())
    }

    fn memberships_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<CompanyMembership>, RepositoryError> {
        Ok(self
            .state()
            .memberships
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    fn is_platform_admin(&self, user: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.state().platform_admins.contains(user))
    }
}

impl RecruiterPool for InMemoryStore {
    fn company_recruiters(&self, company: &CompanyId) -> Result<Vec<RecruiterId>, RepositoryError> {
        let state = self.state();
        Ok(state
            .links
            .iter()
            .filter(|link| {
                link.active && &link.company_id == company && state.is_active(&link.recruiter_id)
            })
            .map(|link| link.recruiter_id.clone())
            .collect())
    }

    fn active_recruiters(&self, limit: usize) -> Result<Vec<RecruiterId>, RepositoryError> {
        Ok(self
            .state()
            .recruiters
            .values()
            .filter(|profile| profile.status == RecruiterStatus::Active)
            .take(limit)
            .map(|profile| profile.id.clone())
            .collect())
    }

    fn subscription_tiers(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, SubscriptionTier>, RepositoryError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| match state.subscriptions.get(id) {
                Some((tier, true)) => Some((id.clone(), *tier)),
                _ => None,
            })
            .collect())
    }

    fn last_application_activity(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, DateTime<Utc>>, RepositoryError> {
        let state = self.state();
        let mut latest: HashMap<RecruiterId, DateTime<Utc>> = HashMap::new();
        for application in state.applications.values() {
            let Some(recruiter_id) = &application.candidate_recruiter_id else {
                continue;
            };
            if !ids.contains(recruiter_id) {
                continue;
            }
            latest
                .entry(recruiter_id.clone())
                .and_modify(|at| *at = (*at).max(application.created_at))
                .or_insert(application.created_at);
        }
        Ok(latest)
    }

    fn pending_prescreens(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, u32>, RepositoryError> {
        let state = self.state();
        let mut counts: HashMap<RecruiterId, u32> = HashMap::new();
        for application in state.applications.values() {
            if application.stage != Stage::Screen {
                continue;
            }
            let recruiter_id = state
                .jobs
                .get(&application.job_id)
                .and_then(|job| job.company_recruiter_id.as_ref());
            if let Some(recruiter_id) = recruiter_id.filter(|id| ids.contains(id)) {
                *counts.entry(recruiter_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn activate_relationship(&self, link: RecruiterCompanyLink) -> Result<(), RepositoryError> {
        self.state().upsert_link(link);
        Ok(())
    }
}

/// Records every published event in order.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<PipelineEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
