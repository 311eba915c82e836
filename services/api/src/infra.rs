use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talentflow::error::AppError;
use talentflow::workflows::hiring::{
    CandidateId, CompanyId, CompanyMembership, EventError, EventPublisher, InMemoryStore, Job,
    JobId, MembershipRole, PipelineEvent, RecruiterCompanyLink, RecruiterId, RecruiterProfile,
    RecruiterStatus, RosterImporter, SubscriptionTier, UserId,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Publishes pipeline events to the log stream until a real bus is wired in.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventError> {
        info!(
            topic = event.topic.as_str(),
            application_id = %event.application_id,
            details = ?event.details,
            "pipeline event"
        );
        Ok(())
    }
}

pub(crate) const DEMO_CANDIDATE_USER: &str = "user-maya";
pub(crate) const DEMO_AGENT_USER: &str = "user-jordan";
pub(crate) const DEMO_COMPANY_ADMIN_USER: &str = "user-northwind-admin";
pub(crate) const DEMO_HIRING_MANAGER_USER: &str = "user-northwind-hm";
pub(crate) const DEMO_GLOBEX_MANAGER_USER: &str = "user-globex-hm";
pub(crate) const DEMO_PLATFORM_ADMIN_USER: &str = "user-ops";

pub(crate) const DEMO_AGENT: &str = "rec-jordan";
pub(crate) const DEMO_NORTHWIND_JOB: &str = "job-northwind-sre";
pub(crate) const DEMO_GLOBEX_JOB: &str = "job-globex-data";

/// Seed a small marketplace: two companies, two jobs, a candidate with an agent, and a
/// recruiter bench split between a linked company recruiter and the platform pool.
pub(crate) fn seed_demo_store(
    store: &InMemoryStore,
    now: DateTime<Utc>,
) {
    let northwind = CompanyId::new("northwind");
    let globex = CompanyId::new("globex");

    store.add_candidate(UserId::new(DEMO_CANDIDATE_USER), CandidateId::new("cand-maya"));
    store.add_candidate(UserId::new("user-omar"), CandidateId::new("cand-omar"));
    store.grant_platform_admin(UserId::new(DEMO_PLATFORM_ADMIN_USER));

    for (user, company, role) in [
        (DEMO_COMPANY_ADMIN_USER, &northwind, MembershipRole::Admin),
        (DEMO_HIRING_MANAGER_USER, &northwind, MembershipRole::HiringManager),
        (DEMO_GLOBEX_MANAGER_USER, &globex, MembershipRole::HiringManager),
    ] {
        store.add_membership(
            UserId::new(user),
            CompanyMembership {
                company_id: company.clone(),
                role,
            },
        );
    }

    let bench = [
        (DEMO_AGENT, DEMO_AGENT_USER, SubscriptionTier::Pro),
        ("rec-priya", "user-priya", SubscriptionTier::Partner),
        ("rec-sam", "user-sam", SubscriptionTier::Starter),
        ("rec-lee", "user-lee", SubscriptionTier::Pro),
    ];
    for (recruiter, user, tier) in bench {
        store.add_recruiter(RecruiterProfile {
            id: RecruiterId::new(recruiter),
            user_id: UserId::new(user),
            status: RecruiterStatus::Active,
        });
        store.set_subscription(RecruiterId::new(recruiter), tier, true);
    }

    store.add_relationship(RecruiterCompanyLink {
        recruiter_id: RecruiterId::new("rec-priya"),
        company_id: northwind.clone(),
        role: "recruiter".to_string(),
        can_manage_company_jobs: true,
        active: true,
        created_at: now - Duration::days(90),
    });

    store.add_job(Job {
        id: JobId::new(DEMO_NORTHWIND_JOB),
        company_id: northwind,
        title: "Site Reliability Engineer".to_string(),
        company_recruiter_id: None,
    });
    store.add_job(Job {
        id: JobId::new(DEMO_GLOBEX_JOB),
        company_id: globex,
        title: "Data Platform Engineer".to_string(),
        company_recruiter_id: None,
    });
}

pub(crate) fn load_roster(
    store: &InMemoryStore,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let roster = RosterImporter::from_path(path)?;
    Ok(roster.load_into(store, now))
}
