use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::super::access::AccessContext;
use super::super::assignment::RecruiterAssignment;
use super::super::domain::{
    AiReviewResult, AiReviewSummary, ApplicationId, ApplicationRecord, AuditAction, Stage,
};
use super::super::error::PipelineError;
use super::super::events::{EventPublisher, EventTopic, PipelineEvent};
use super::super::repository::{PipelineStore, StageWrite};
use super::service::{
    normalized, require_candidate_side, require_company_side, Actor, ApplicationLifecycle,
    ChangeSet,
};
use super::transitions::{validate_transition, DeclineInput};

const DEFAULT_PROPOSAL_DECLINE_REASON: &str = "declined_by_candidate";

#[derive(Debug, Clone, Serialize)]
pub struct AiReviewOutcome {
    pub record: ApplicationRecord,
    pub needs_improvement: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescreenOutcome {
    pub record: ApplicationRecord,
    /// `None` when the job already had a company-side recruiter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<RecruiterAssignment>,
}

impl<S, E> ApplicationLifecycle<S, E>
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    /// Start the external AI review. Only drafts can be reviewed.
    pub fn trigger_ai_review(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        require_candidate_side(sides, "request an AI review")?;
        expect_stage(&record, &[Stage::Draft], Stage::AiReview)?;

        let event = PipelineEvent::new(EventTopic::AiReviewRequested, id.clone())
            .with("candidate_id", &record.application.candidate_id)
            .with("job_id", &record.job.id);
        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::AiReviewStarted,
        )
        .event(event);

        self.commit(record, StageWrite::to(Stage::AiReview, Utc::now()), change)
    }

    /// Callback from the external reviewer.
    pub fn handle_ai_review_completed(
        &self,
        id: &ApplicationId,
        result: AiReviewResult,
    ) -> Result<AiReviewOutcome, PipelineError> {
        if result.fit_score.map(|score| score > 100).unwrap_or(false) {
            return Err(PipelineError::InvalidInput(
                "fit_score must be between 0 and 100".to_string(),
            ));
        }

        let record = self.load(id)?;
        let needs_improvement = result.needs_improvement();
        let recommendation = result.recommendation.label();
        let now = Utc::now();

        let mut write = StageWrite::to(Stage::AiReviewed, now);
        write.ai_review = Some(AiReviewSummary {
            recommendation: result.recommendation,
            fit_score: result.fit_score,
            concerns: result.concerns.clone(),
            strengths: result.strengths,
            reviewed_at: now,
        });

        let mut reviewed = PipelineEvent::new(EventTopic::AiReviewed, id.clone())
            .with("recommendation", recommendation)
            .with("needs_improvement", needs_improvement);
        if let Some(score) = result.fit_score {
            reviewed = reviewed.with("fit_score", score);
        }

        let mut change = ChangeSet::new(Actor::system(), AuditAction::AiReviewCompleted)
            .meta("recommendation", recommendation)
            .meta("needs_improvement", needs_improvement)
            .event(reviewed);
        if needs_improvement {
            change = change.event(
                PipelineEvent::new(EventTopic::NeedsImprovement, id.clone())
                    .with("candidate_id", &record.application.candidate_id)
                    .with("recommendation", recommendation)
                    .with("concerns", result.concerns.len()),
            );
        }

        let record = self.commit(record, write, change)?;
        Ok(AiReviewOutcome {
            record,
            needs_improvement,
        })
    }

    /// Route to the candidate's recruiter when one is attached, otherwise straight to the company.
    pub fn submit_application(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        require_candidate_side(sides, "submit an application")?;

        let target = match record.application.candidate_recruiter_id {
            Some(_) => Stage::RecruiterReview,
            None => Stage::Submitted,
        };
        expect_stage(&record, &[Stage::AiReviewed, Stage::Screen], target)?;

        let mut event = PipelineEvent::new(EventTopic::Submitted, id.clone())
            .with("job_id", &record.job.id)
            .with("company_id", &record.job.company_id)
            .with("stage", target);
        if let Some(recruiter_id) = &record.application.candidate_recruiter_id {
            event = event.with("candidate_recruiter_id", recruiter_id);
        }
        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::StageChanged,
        )
        .meta("route", target)
        .event(event)
        .submission();

        self.commit(record, StageWrite::to(target, Utc::now()), change)
    }

    pub fn return_to_draft(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        require_candidate_side(sides, "return an application to draft")?;
        expect_stage(
            &record,
            &[Stage::AiReviewed, Stage::RecruiterRequest, Stage::Screen],
            Stage::Draft,
        )?;

        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::StageChanged,
        );
        self.commit(record, StageWrite::to(Stage::Draft, Utc::now()), change)
    }

    /// Candidate self-service cancel. Applications are never hard-deleted.
    pub fn withdraw_application(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        reason: Option<String>,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        require_candidate_side(sides, "withdraw an application")?;

        let mut change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::StageChanged,
        );
        if let Some(reason) = normalized(reason) {
            change = change.meta("reason", reason);
        }
        self.commit(record, StageWrite::to(Stage::Withdrawn, Utc::now()), change)
    }

    pub fn reject_application(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        decline_reason: Option<String>,
        decline_details: Option<String>,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, _) = self.load_visible(context, id)?;

        let mut write = StageWrite::to(Stage::Rejected, Utc::now());
        write.decline_reason = normalized(decline_reason);
        write.decline_details = normalized(decline_details);

        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::StageChanged,
        );
        self.commit(record, write, change)
    }

    pub fn accept_proposal(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let record = self.load_proposal(context, id, Stage::Draft)?;

        let event = PipelineEvent::new(EventTopic::ProposalAccepted, id.clone())
            .with("candidate_id", &record.application.candidate_id)
            .with("job_id", &record.job.id);
        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::ProposalAccepted,
        )
        .event(event);

        self.commit(record, StageWrite::to(Stage::Draft, Utc::now()), change)
    }

    pub fn decline_proposal(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        reason: Option<String>,
    ) -> Result<ApplicationRecord, PipelineError> {
        let record = self.load_proposal(context, id, Stage::Rejected)?;

        let reason =
            normalized(reason).unwrap_or_else(|| DEFAULT_PROPOSAL_DECLINE_REASON.to_string());
        let mut write = StageWrite::to(Stage::Rejected, Utc::now());
        write.decline_reason = Some(reason.clone());

        let event = PipelineEvent::new(EventTopic::ProposalDeclined, id.clone())
            .with("candidate_id", &record.application.candidate_id)
            .with("reason", &reason);
        let change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::ProposalDeclined,
        )
        .event(event);

        self.commit(record, write, change)
    }

    /// Only the proposed candidate may answer a proposal.
    fn load_proposal(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        target: Stage,
    ) -> Result<ApplicationRecord, PipelineError> {
        let record = self.load(id)?;
        if context.candidate_id.as_ref() != Some(&record.application.candidate_id) {
            return Err(PipelineError::Forbidden(
                "only the proposed candidate can answer this proposal".to_string(),
            ));
        }
        expect_stage(&record, &[Stage::RecruiterProposed], target)?;
        Ok(record)
    }

    /// Company asks for a recruiter pre-screen. Runs the assignment engine when the job has
    /// no company-side recruiter yet; the selection and any new company link land in the same
    /// conditional write as the stage.
    pub fn request_prescreen(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
    ) -> Result<PrescreenOutcome, PipelineError> {
        let (mut record, sides) = self.load_visible(context, id)?;
        require_company_side(sides, "request a pre-screen")?;
        validate_transition(record.stage(), Stage::Screen, DeclineInput::default())?;

        let now = Utc::now();
        let mut write = StageWrite::to(Stage::Screen, now);
        let mut change = ChangeSet::new(
            Actor::for_caller(context, &record),
            AuditAction::PrescreenRequested,
        );

        let assignment = match record.job.company_recruiter_id.clone() {
            Some(existing) => {
                change = change
                    .meta("recruiter_id", &existing)
                    .meta("assignment", "existing");
                None
            }
            None => {
                let company_id = record.job.company_id.clone();
                let assignment = self
                    .engine
                    .plan_recruiter(&company_id)?
                    .ok_or(PipelineError::NoRecruiterAvailable(company_id.clone()))?;
                write.company_recruiter = Some(assignment.recruiter_id.clone());
                write.relationship = assignment.relationship(&company_id, now);
                record.job.company_recruiter_id = Some(assignment.recruiter_id.clone());
                change = change
                    .meta("recruiter_id", &assignment.recruiter_id)
                    .meta("assignment", "assigned")
                    .meta("pool", assignment.pool.label())
                    .meta("weight", assignment.weight)
                    .meta("created_relationship", assignment.created_relationship);
                Some(assignment)
            }
        };

        let mut event = PipelineEvent::new(EventTopic::PrescreenRequested, id.clone())
            .with("job_id", &record.job.id)
            .with("company_id", &record.job.company_id);
        if let Some(recruiter_id) = &record.job.company_recruiter_id {
            event = event.with("recruiter_id", recruiter_id);
        }
        if let Some(assignment) = &assignment {
            event = event.with("created_relationship", assignment.created_relationship);
        }
        change = change.event(event);

        let record = self.commit(record, write, change)?;
        if let Some(assignment) = &assignment {
            info!(
                application_id = %id,
                job_id = %record.job.id,
                recruiter_id = %assignment.recruiter_id,
                pool = assignment.pool.label(),
                created_relationship = assignment.created_relationship,
                "assigned pre-screen recruiter"
            );
        }
        Ok(PrescreenOutcome { record, assignment })
    }

    /// Close an offer as a hire. The placement record is created downstream from the event.
    pub fn hire_candidate(
        &self,
        context: &AccessContext,
        id: &ApplicationId,
        salary: u64,
    ) -> Result<ApplicationRecord, PipelineError> {
        let (record, sides) = self.load_visible(context, id)?;
        require_company_side(sides, "hire a candidate")?;
        expect_stage(&record, &[Stage::Offer], Stage::Hired)?;
        if salary == 0 {
            return Err(PipelineError::InvalidInput(
                "salary must be greater than zero".to_string(),
            ));
        }

        let mut write = StageWrite::to(Stage::Hired, Utc::now());
        write.salary = Some(salary);

        let mut event = PipelineEvent::new(EventTopic::Hired, id.clone())
            .with("candidate_id", &record.application.candidate_id)
            .with("job_id", &record.job.id)
            .with("company_id", &record.job.company_id)
            .with("salary", salary);
        if let Some(recruiter_id) = &record.application.candidate_recruiter_id {
            event = event.with("candidate_recruiter_id", recruiter_id);
        }
        if let Some(recruiter_id) = &record.job.company_recruiter_id {
            event = event.with("company_recruiter_id", recruiter_id);
        }
        let change = ChangeSet::new(Actor::for_caller(context, &record), AuditAction::Hired)
            .meta("salary", salary)
            .event(event);

        self.commit(record, write, change)
    }
}

fn expect_stage(
    record: &ApplicationRecord,
    allowed_from: &[Stage],
    to: Stage,
) -> Result<(), PipelineError> {
    let from = record.stage();
    if allowed_from.contains(&from) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition { from, to })
    }
}
