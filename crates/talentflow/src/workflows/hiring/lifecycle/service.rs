use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::super::access::{sides_for, AccessContext, ApplicationSides};
use super::super::assignment::RecruiterAssignmentEngine;
use super::super::domain::{
    generate_id, ActorRole, Application, ApplicationId, ApplicationRecord, AuditAction,
    AuditEntryId, AuditLogEntry, CandidateId, JobId, RecruiterId, Stage, UserId,
};
use super::super::error::PipelineError;
use super::super::events::{publish_best_effort, EventPublisher, EventTopic, PipelineEvent};
use super::super::repository::{ApplicationScope, PipelineStore, RecruiterStatus, StageWrite};
use super::transitions::{validate_submission, validate_transition, DeclineInput};

/// Candidate-initiated application request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: JobId,
    #[serde(default)]
    pub candidate_recruiter_id: Option<RecruiterId>,
}

/// Recruiter-initiated creation on a candidate's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    #[serde(default)]
    pub pitch: Option<String>,
}

/// Generic stage change through the validated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: Stage,
    #[serde(default)]
    pub decline_reason: Option<String>,
    #[serde(default)]
    pub decline_details: Option<String>,
}

/// Who performed a change, as recorded in the audit log.
#[derive(Debug, Clone)]
pub(super) struct Actor {
    pub(super) user_id: Option<UserId>,
    pub(super) role: ActorRole,
}

impl Actor {
    pub(super) fn system() -> Self {
        Self {
            user_id: None,
            role: ActorRole::System,
        }
    }

    pub(super) fn for_caller(context: &AccessContext, record: &ApplicationRecord) -> Self {
        let role = if context.is_platform_admin {
            ActorRole::PlatformAdmin
        } else if context.candidate_id.as_ref() == Some(&record.application.candidate_id) {
            ActorRole::Candidate
        } else if context.recruiter_id.is_some()
            && (context.recruiter_id == record.application.candidate_recruiter_id
                || context.recruiter_id == record.job.company_recruiter_id)
        {
            ActorRole::Recruiter
        } else {
            ActorRole::CompanyMember
        };

        Self {
            user_id: Some(context.user_id.clone()),
            role,
        }
    }
}

/// Audit and event payload attached to one committed stage write.
pub(super) struct ChangeSet {
    pub(super) actor: Actor,
    pub(super) action: AuditAction,
    pub(super) metadata: BTreeMap<String, String>,
    pub(super) events: Vec<PipelineEvent>,
    submission: bool,
}

impl ChangeSet {
    pub(super) fn new(actor: Actor, action: AuditAction) -> Self {
        Self {
            actor,
            action,
            metadata: BTreeMap::new(),
            events: Vec::new(),
            submission: false,
        }
    }

    /// Validate against the submission routes instead of the generic table.
    pub(super) fn submission(mut self) -> Self {
        self.submission = true;
        self
    }

    pub(super) fn meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub(super) fn event(mut self, event: PipelineEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Owns the `stage` field: validates transitions, writes them conditionally, then appends
/// the audit entry and publishes events on a best-effort basis.
pub struct ApplicationLifecycle<S, E> {
    pub(super) store: Arc<S>,
    pub(super) events: Arc<E>,
    pub(super) engine: RecruiterAssignmentEngine<S>,
    list_limit: usize,
}

impl<S, E> ApplicationLifecycle<S, E>
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        events: Arc<E>,
        engine: RecruiterAssignmentEngine<S>,
        list_limit: usize,
    ) -> Self {
        Self {
            store,
            events,
            engine,
            list_limit,
        }
    }

    pub fn engine(&self) -> &RecruiterAssignmentEngine<S> {
        &self.engine
    }

    /// Candidate applies to a job; the application starts in `draft`.
    pub fn create_application(
        &self,
        context: &AccessContext,
        request: NewApplication,
    ) -> Result<ApplicationRecord, PipelineError> {
        let candidate_id = context.candidate_id.clone().ok_or_else(|| {
            PipelineError::Forbidden("only candidates can create applications".to_string())
        })?;

        if let Some(recruiter_id) = &request.candidate_recruiter_id {
            if recruiter_id.as_str().trim().is_empty() {
                return Err(PipelineError::InvalidInput(
                    "candidate_recruiter_id must not be blank".to_string(),
                ));
            }
            let active = self
                .store
                .recruiter_by_id(recruiter_id)?
                .is_some_and(|profile| profile.status == RecruiterStatus::Active);
            if !active {
                return Err(PipelineError::InvalidInput(format!(
                    "candidate recruiter {recruiter_id} is not an active recruiter"
                )));
            }
        }

        self.insert_new(
            context,
            candidate_id,
            request.job_id,
            request.candidate_recruiter_id,
            Stage::Draft,
            "candidate",
            None,
        )
    }

    /// Recruiter proposes a job to a candidate; the candidate accepts or declines later.
    pub fn propose_job_to_candidate(
        &self,
        context: &AccessContext,
        proposal: Proposal,
    ) -> Result<ApplicationRecord, PipelineError> {
        let recruiter_id = context.recruiter_id.clone().ok_or_else(|| {
            PipelineError::Forbidden("only active recruiters can propose jobs".to_string())
        })?;

        self.insert_new(
            context,
            proposal.candidate_id,
            proposal.job_id,
            Some(recruiter_id),
            Stage::RecruiterProposed,
            "recruiter_proposal",
            proposal.pitch,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_new(
        &self,
        context: &AccessContext,
        candidate_id: CandidateId,
        job_id: JobId,
        candidate_recruiter_id: Option<RecruiterId>,
        stage: Stage,
        source: &str,
        pitch: Option<String>,
    ) -> Result<ApplicationRecord, PipelineError> {
        let job = self
            .store
            .fetch_job(&job_id)?
            .ok_or_else(|| PipelineError::not_found(format!("job {job_id}")))?;

        let existing = self.store.list_applications(
            &ApplicationScope::Participant {
                candidate_id: Some(candidate_id.clone()),
                recruiter_id: None,
                company_ids: Default::default(),
            },
            usize::MAX,
        )?;
        if existing
            .iter()
            .any(|record| record.job.id == job_id && !record.stage().is_terminal())
        {
            return Err(PipelineError::InvalidInput(format!(
                "candidate {candidate_id} already has an open application for job {job_id}"
            )));
        }

        let now = Utc::now();
        let application = self.store.insert_application(Application {
            id: ApplicationId::new(generate_id()),
            stage,
            candidate_id,
            job_id,
            candidate_recruiter_id,
            salary: None,
            decline_reason: None,
            decline_details: None,
            ai_review: None,
            created_at: now,
            updated_at: now,
        })?;
        let record = ApplicationRecord { application, job };

        info!(
            application_id = %record.application.id,
            job_id = %record.job.id,
            %stage,
            source,
            "application created"
        );

        let actor = Actor::for_caller(context, &record);
        let mut metadata = BTreeMap::from([("source".to_string(), source.to_string())]);
        if let Some(pitch) = pitch.filter(|p| !p.trim().is_empty()) {
            metadata.insert("pitch".to_string(), pitch);
        }
        self.record_audit(AuditLogEntry {
            id: AuditEntryId::new(generate_id()),
            application_id: record.application.id.clone(),
            action: AuditAction::Created,
            actor_user_id: actor.user_id,
            actor_role: actor.role,
            old_value: None,
            new_value: Some(json!({ "stage": stage })),
            metadata,
            created_at: now,
        });

        let mut event =
            PipelineEvent::new(EventTopic::ApplicationCreated, record.application.id.clone())
                .with("candidate_id", &record.application.candidate_id)
                .with("job_id", &record.job.id)
                .with("company_id", &record.job.company_id)
                .with("stage", stage)
                .with("source", source);
        if let Some(recruiter_id) = &record.application.candidate_recruiter_id {
            event = event.with("candidate_recruiter_id", recruiter_id);
        }
        self.emit(event);

        Ok(record)
    }

    pub fn get_application(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, _) = self.load_visible(context, id)?;
        Ok(record)
    }

    /// Applications on which the caller holds at least one side.
    pub fn list_applications(
        &self,
        context: &AccessContext,
    ) -> Result<Vec<ApplicationRecord>, PipelineError> {
        let scope = if context.is_platform_admin {
            ApplicationScope::All
        } else {
            ApplicationScope::Participant {
                candidate_id: context.candidate_id.clone(),
                recruiter_id: context.recruiter_id.clone(),
                company_ids: context.company_ids.clone(),
            }
        };

        let records = self.store.list_applications(&scope, self.list_limit)?;
        Ok(records
            .into_iter()
            .filter(|record| sides_for(context, record).any())
            .take(self.list_limit)
            .collect())
    }

    pub fn application_history(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, PipelineError> {
        self.load_visible(context, id)?;
        let mut entries = self.store.entries_for(id)?;
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    /// Generic stage change. Withdrawal stays a candidate-side action.
    pub fn update_application(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        update: StageUpdate,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        if update.stage == Stage::Withdrawn {
            require_candidate_side(sides, "withdraw an application")?;
        }

        let mut write = StageWrite::to(update.stage, Utc::now());
        write.decline_reason = normalized(update.decline_reason);
        write.decline_details = normalized(update.decline_details);

        let actor = Actor::for_caller(context, &record);
        self.commit(record, write, ChangeSet::new(actor, AuditAction::StageChanged))
    }

    pub(super) fn load(&self, id: &ApplicationId) -> Result<ApplicationRecord, PipelineError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| PipelineError::not_found(format!("application {id}")))
    }

    /// Applications the caller holds no side on are reported as absent.
    pub(super) fn load_visible(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<(ApplicationRecord, ApplicationSides), PipelineError> {
        let record = self.load(id)?;
        let sides = sides_for(context, &record);
        if !sides.any() {
            return Err(PipelineError::not_found(format!("application {id}")));
        }
        Ok((record, sides))
    }

    /// Validate, write conditionally on the stage that was read, then audit and publish.
    pub(super) fn commit(
        &self,
        record: ApplicationRecord,
        write: StageWrite,
        change: ChangeSet,
    ) -> Result<ApplicationRecord, PipelineError> {
        let from = record.stage();
        let to = write.stage;
        if change.submission {
            validate_submission(from, to)?;
        } else {
            validate_transition(
                from,
                to,
                DeclineInput {
                    reason: write.decline_reason.as_deref(),
                    details: write.decline_details.as_deref(),
                },
            )?;
        }

        let at = write.at;
        let id = record.application.id.clone();
        let application = self
            .store
            .write_stage(&id, from, write)
            .map_err(|err| PipelineError::from_stage_write(&id, err))?;

        info!(
            application_id = %id,
            %from,
            %to,
            action = change.action.label(),
            actor = change.actor.role.label(),
            "stage transition committed"
        );

        let ChangeSet {
            actor,
            action,
            metadata,
            events,
            ..
        } = change;

        self.record_audit(AuditLogEntry {
            id: AuditEntryId::new(generate_id()),
            application_id: id.clone(),
            action,
            actor_user_id: actor.user_id,
            actor_role: actor.role,
            old_value: Some(json!({ "stage": from })),
            new_value: Some(json!({ "stage": to })),
            metadata,
            created_at: at,
        });

        self.emit(
            PipelineEvent::new(EventTopic::StageChanged, id)
                .with("from", from)
                .with("to", to)
                .with("actor_role", actor.role.label()),
        );
        for event in events {
            self.emit(event);
        }

        Ok(ApplicationRecord {
            application,
            job: record.job,
        })
    }

    pub(super) fn record_audit(&self, entry: AuditLogEntry) {
        let application_id = entry.application_id.clone();
        let action = entry.action.label();
        if let Err(err) = self.store.append(entry) {
            warn!(%application_id, action, error = %err, "audit append failed; continuing");
        }
    }

    pub(super) fn emit(&self, event: PipelineEvent) {
        publish_best_effort(self.events.as_ref(), event);
    }
}

pub(super) fn require_candidate_side(
    sides: ApplicationSides,
    action: &str,
) -> Result<(), PipelineError> {
    if sides.candidate {
        Ok(())
    } else {
        Err(PipelineError::Forbidden(format!(
            "only the candidate side can {action}"
        )))
    }
}

pub(super) fn require_company_side(
    sides: ApplicationSides,
    action: &str,
) -> Result<(), PipelineError> {
    if sides.company {
        Ok(())
    } else {
        Err(PipelineError::Forbidden(format!(
            "only the hiring company can {action}"
        )))
    }
}

pub(super) fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
