use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::hiring::assignment::SubscriptionTier;
use crate::workflows::hiring::domain::{
    AiReviewResult, Application, ApplicationId, ApplicationNote, ApplicationRecord,
    AuditLogEntry, CandidateId, CompanyId, FitRecommendation, Job, JobId, NoteId, RecruiterId,
    Stage, UserId,
};
use crate::workflows::hiring::events::{EventError, EventPublisher, EventTopic, PipelineEvent};
use crate::workflows::hiring::repository::{
    AccessDirectory, ApplicationRepository, ApplicationScope, AuditLogRepository,
    CompanyMembership, JobRepository, MembershipRole, NoteRepository, RecruiterCompanyLink,
    RecruiterPool, RecruiterProfile, RecruiterStatus, RepositoryError, StageWrite,
};
use crate::workflows::hiring::{
    AccessContext, HiringPipeline, InMemoryEventBus, InMemoryStore, NewApplication,
    PipelineConfig,
};

pub(super) const CANDIDATE_USER: &str = "user-candidate";
pub(super) const CANDIDATE: &str = "cand-1";
pub(super) const OTHER_CANDIDATE_USER: &str = "user-other-candidate";
pub(super) const OTHER_CANDIDATE: &str = "cand-2";
pub(super) const AGENT_USER: &str = "user-agent";
pub(super) const AGENT: &str = "rec-agent";
pub(super) const SCREENER_USER: &str = "user-screener";
pub(super) const SCREENER: &str = "rec-screener";
pub(super) const COMPANY_ADMIN_USER: &str = "user-acme-admin";
pub(super) const HIRING_MANAGER_USER: &str = "user-acme-hm";
pub(super) const OUTSIDER_USER: &str = "user-globex-admin";
pub(super) const PLATFORM_ADMIN_USER: &str = "user-platform";
pub(super) const COMPANY: &str = "acme";
pub(super) const OTHER_COMPANY: &str = "globex";
pub(super) const JOB: &str = "job-backend";
pub(super) const OTHER_JOB: &str = "job-globex-ops";

pub(super) type TestPipeline = HiringPipeline<InMemoryStore, InMemoryEventBus>;

pub(super) fn active_profile(id: &str, user: &str) -> RecruiterProfile {
    RecruiterProfile {
        id: RecruiterId::new(id),
        user_id: UserId::new(user),
        status: RecruiterStatus::Active,
    }
}

pub(super) fn link(recruiter: &str, company: &str) -> RecruiterCompanyLink {
    RecruiterCompanyLink {
        recruiter_id: RecruiterId::new(recruiter),
        company_id: CompanyId::new(company),
        role: "recruiter".to_string(),
        can_manage_company_jobs: false,
        active: true,
        created_at: Utc::now(),
    }
}

/// Acme has one linked screener; Globex has no linked recruiters.
pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store.add_candidate(UserId::new(CANDIDATE_USER), CandidateId::new(CANDIDATE));
    store.add_candidate(
        UserId::new(OTHER_CANDIDATE_USER),
        CandidateId::new(OTHER_CANDIDATE),
    );
    store.add_recruiter(active_profile(AGENT, AGENT_USER));
    store.add_recruiter(active_profile(SCREENER, SCREENER_USER));
    store.add_membership(
        UserId::new(COMPANY_ADMIN_USER),
        CompanyMembership {
            company_id: CompanyId::new(COMPANY),
            role: MembershipRole::Admin,
        },
    );
    store.add_membership(
        UserId::new(HIRING_MANAGER_USER),
        CompanyMembership {
            company_id: CompanyId::new(COMPANY),
            role: MembershipRole::HiringManager,
        },
    );
    store.add_membership(
        UserId::new(OUTSIDER_USER),
        CompanyMembership {
            company_id: CompanyId::new(OTHER_COMPANY),
            role: MembershipRole::Admin,
        },
    );
    store.grant_platform_admin(UserId::new(PLATFORM_ADMIN_USER));
    store.add_job(Job {
        id: JobId::new(JOB),
        company_id: CompanyId::new(COMPANY),
        title: "Backend Engineer".to_string(),
        company_recruiter_id: None,
    });
    store.add_job(Job {
        id: JobId::new(OTHER_JOB),
        company_id: CompanyId::new(OTHER_COMPANY),
        title: "Operations Lead".to_string(),
        company_recruiter_id: None,
    });
    store.add_relationship(link(SCREENER, COMPANY));
    store.set_subscription(RecruiterId::new(SCREENER), SubscriptionTier::Pro, true);
    Arc::new(store)
}

pub(super) fn build_pipeline() -> (TestPipeline, Arc<InMemoryStore>, Arc<InMemoryEventBus>) {
    let store = seeded_store();
    let events = Arc::new(InMemoryEventBus::new());
    let pipeline = HiringPipeline::new(store.clone(), events.clone(), PipelineConfig::default());
    (pipeline, store, events)
}

pub(super) fn context(pipeline: &TestPipeline, user: &str) -> AccessContext {
    pipeline
        .resolver()
        .resolve(user)
        .expect("identity resolves")
}

pub(super) fn draft_application(
    pipeline: &TestPipeline,
    job: &str,
    with_agent: bool,
) -> ApplicationRecord {
    let candidate = context(pipeline, CANDIDATE_USER);
    pipeline
        .lifecycle()
        .create_application(
            &candidate,
            NewApplication {
                job_id: JobId::new(job),
                candidate_recruiter_id: with_agent.then(|| RecruiterId::new(AGENT)),
            },
        )
        .expect("draft created")
}

/// Moves an application directly in the store, bypassing validation, to set up a scenario.
pub(super) fn force_stage(store: &InMemoryStore, id: &ApplicationId, stage: Stage) {
    let current = store
        .fetch_application(id)
        .expect("fetch succeeds")
        .expect("application present")
        .stage();
    store
        .write_stage(id, current, StageWrite::to(stage, Utc::now()))
        .expect("forced write");
}

pub(super) fn review(recommendation: FitRecommendation, concerns: &[&str]) -> AiReviewResult {
    AiReviewResult {
        recommendation,
        fit_score: Some(42),
        concerns: concerns.iter().map(|c| c.to_string()).collect(),
        strengths: vec!["Distributed systems".to_string()],
    }
}

pub(super) fn topics(events: &InMemoryEventBus) -> Vec<EventTopic> {
    events.events().into_iter().map(|event| event.topic).collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct FailingEvents;

impl EventPublisher for FailingEvents {
    fn publish(&self, _event: PipelineEvent) -> Result<(), EventError> {
        Err(EventError::Transport("broker offline".to_string()))
    }
}

/// Pool double with fixed answers that records which queries ran.
#[derive(Default)]
pub(super) struct ScriptedPool {
    pub(super) linked: Vec<RecruiterId>,
    pub(super) platform: Vec<RecruiterId>,
    pub(super) tiers: HashMap<RecruiterId, SubscriptionTier>,
    pub(super) activity: HashMap<RecruiterId, DateTime<Utc>>,
    pub(super) workload: HashMap<RecruiterId, u32>,
    pub(super) platform_queries: Mutex<usize>,
    pub(super) weighted_sets: Mutex<Vec<Vec<RecruiterId>>>,
    pub(super) activated: Mutex<Vec<RecruiterCompanyLink>>,
}

impl ScriptedPool {
    pub(super) fn platform_queries(&self) -> usize {
        *self.platform_queries.lock().expect("pool mutex poisoned")
    }

    pub(super) fn activated(&self) -> Vec<RecruiterCompanyLink> {
        self.activated.lock().expect("pool mutex poisoned").clone()
    }

    pub(super) fn weighted_sets(&self) -> Vec<Vec<RecruiterId>> {
        self.weighted_sets
            .lock()
            .expect("pool mutex poisoned")
            .clone()
    }
}

impl RecruiterPool for ScriptedPool {
    fn company_recruiters(&self, _company: &CompanyId) -> Result<Vec<RecruiterId>, RepositoryError> {
        Ok(self.linked.clone())
    }

    fn active_recruiters(&self, limit: usize) -> Result<Vec<RecruiterId>, RepositoryError> {
        *self.platform_queries.lock().expect("pool mutex poisoned") += 1;
        Ok(self.platform.iter().take(limit).cloned().collect())
    }

    fn subscription_tiers(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, SubscriptionTier>, RepositoryError> {
        self.weighted_sets
            .lock()
            .expect("pool mutex poisoned")
            .push(ids.to_vec());
        Ok(self.tiers.clone())
    }

    fn last_application_activity(
        &self,
        _ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, DateTime<Utc>>, RepositoryError> {
        Ok(self.activity.clone())
    }

    fn pending_prescreens(
        &self,
        _ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, u32>, RepositoryError> {
        Ok(self.workload.clone())
    }

    fn activate_relationship(&self, link: RecruiterCompanyLink) -> Result<(), RepositoryError> {
        self.activated
            .lock()
            .expect("pool mutex poisoned")
            .push(link);
        Ok(())
    }
}

/// Store that lets another writer move an application between the caller's read and its
/// conditional stage write.
pub(super) struct RacingStore {
    pub(super) inner: Arc<InMemoryStore>,
    race: Mutex<Option<Stage>>,
}

impl RacingStore {
    pub(super) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            race: Mutex::new(None),
        }
    }

    /// The next stage write first sees the application moved to `stage`.
    pub(super) fn interleave(&self, stage: Stage) {
        *self.race.lock().expect("race mutex poisoned") = Some(stage);
    }
}

impl ApplicationRepository for RacingStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn write_stage(
        &self,
        id: &ApplicationId,
        expected: Stage,
        write: StageWrite,
    ) -> Result<Application, RepositoryError> {
        let racing = self.race.lock().expect("race mutex poisoned").take();
        if let Some(stage) = racing {
            self.inner
                .write_stage(id, expected, StageWrite::to(stage, Utc::now()))?;
        }
        self.inner.write_stage(id, expected, write)
    }

    fn list_applications(
        &self,
        scope: &ApplicationScope,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.list_applications(scope, limit)
    }
}

impl JobRepository for RacingStore {
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id)
    }
}

impl AuditLogRepository for RacingStore {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError> {
        self.inner.append(entry)
    }

    fn entries_for(&self, id: &ApplicationId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        self.inner.entries_for(id)
    }
}

impl NoteRepository for RacingStore {
    fn insert_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError> {
        self.inner.insert_note(note)
    }

    fn fetch_note(&self, id: &NoteId) -> Result<Option<ApplicationNote>, RepositoryError> {
        self.inner.fetch_note(id)
    }

    fn notes_for(&self, id: &ApplicationId) -> Result<Vec<ApplicationNote>, RepositoryError> {
        self.inner.notes_for(id)
    }

    fn update_note(&self, note: ApplicationNote) -> Result<ApplicationNote, RepositoryError> {
        self.inner.update_note(note)
    }

    fn delete_note(&self, id: &NoteId) -> Result<(), RepositoryError> {
        self.inner.delete_note(id)
    }
}

impl AccessDirectory for RacingStore {
    fn candidate_for_user(&self, user: &UserId) -> Result<Option<CandidateId>, RepositoryError> {
        self.inner.candidate_for_user(user)
    }

    fn recruiter_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<RecruiterProfile>, RepositoryError> {
        self.inner.recruiter_for_user(user)
    }

    fn recruiter_by_id(
        &self,
        id: &RecruiterId,
    ) -> Result<Option<RecruiterProfile>, RepositoryError> {
        self.inner.recruiter_by_id(id)
    }

    fn memberships_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<CompanyMembership>, RepositoryError> {
        self.inner.memberships_for_user(user)
    }

    fn is_platform_admin(&self, user: &UserId) -> Result<bool, RepositoryError> {
        self.inner.is_platform_admin(user)
    }
}

impl RecruiterPool for RacingStore {
    fn company_recruiters(&self, company: &CompanyId) -> Result<Vec<RecruiterId>, RepositoryError> {
        self.inner.company_recruiters(company)
    }

    fn active_recruiters(&self, limit: usize) -> Result<Vec<RecruiterId>, RepositoryError> {
        self.inner.active_recruiters(limit)
    }

    fn subscription_tiers(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, SubscriptionTier>, RepositoryError> {
        self.inner.subscription_tiers(ids)
    }

    fn last_application_activity(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, DateTime<Utc>>, RepositoryError> {
        self.inner.last_application_activity(ids)
    }

    fn pending_prescreens(
        &self,
        ids: &[RecruiterId],
    ) -> Result<HashMap<RecruiterId, u32>, RepositoryError> {
        self.inner.pending_prescreens(ids)
    }

    fn activate_relationship(&self, link: RecruiterCompanyLink) -> Result<(), RepositoryError> {
        self.inner.activate_relationship(link)
    }
}
