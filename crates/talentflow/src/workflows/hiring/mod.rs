//! Application lifecycle, recruiter assignment, and note visibility for the hiring pipeline.
//!
//! Every inbound call resolves an [`AccessContext`] once and then flows into either the
//! [`ApplicationLifecycle`] (stage-changing operations) or the [`NoteGateway`] (discussion
//! operations). The lifecycle service calls the [`RecruiterAssignmentEngine`] synchronously
//! when a company requests a pre-screen.

pub mod access;
pub mod assignment;
pub mod domain;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod memory;
pub mod notes;
pub mod repository;
pub mod roster;
pub mod router;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use access::{AccessContext, AccessResolver, ApplicationSides, Role};
pub use assignment::{
    AssignmentConfig, PoolTier, RecruiterAssignment, RecruiterAssignmentEngine,
    RecruiterCandidate, SubscriptionTier,
};
pub use domain::{
    ActorRole, AiReviewResult, AiReviewSummary, Application, ApplicationId, ApplicationNote,
    ApplicationRecord, AuditAction, AuditEntryId, AuditLogEntry, CandidateId, CompanyId,
    CreatorType, FitRecommendation, Job, JobId, NoteId, NoteType, RecruiterId, Stage, UserId,
    Visibility,
};
pub use error::PipelineError;
pub use events::{EventError, EventPublisher, EventTopic, PipelineEvent};
pub use lifecycle::{
    AiReviewOutcome, ApplicationLifecycle, NewApplication, PrescreenOutcome, Proposal, StageUpdate,
};
pub use memory::{InMemoryEventBus, InMemoryStore};
pub use notes::{NewNote, NoteEdit, NoteGateway, NoteThread};
pub use repository::{
    AccessDirectory, ApplicationRepository, ApplicationScope, AuditLogRepository,
    CompanyMembership, JobRepository, MembershipRole, NoteRepository, PipelineStore,
    RecruiterCompanyLink, RecruiterPool, RecruiterProfile, RecruiterStatus, RepositoryError,
    StageWrite,
};
pub use roster::{RosterEntry, RosterImportError, RosterImporter};
pub use router::pipeline_router;

/// Tunables for the pipeline services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub assignment: AssignmentConfig,
    /// Upper bound on records returned by list operations.
    pub list_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assignment: AssignmentConfig::default(),
            list_limit: 100,
        }
    }
}

/// Facade bundling the request-scoped services over one shared store and event bus.
pub struct HiringPipeline<S, E> {
    resolver: AccessResolver<S>,
    lifecycle: ApplicationLifecycle<S, E>,
    notes: NoteGateway<S, E>,
}

impl<S, E> HiringPipeline<S, E>
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<E>, config: PipelineConfig) -> Self {
        let engine = RecruiterAssignmentEngine::new(store.clone(), config.assignment.clone());
        Self {
            resolver: AccessResolver::new(store.clone()),
            lifecycle: ApplicationLifecycle::new(
                store.clone(),
                events.clone(),
                engine,
                config.list_limit,
            ),
            notes: NoteGateway::new(store, events),
        }
    }

    pub fn resolver(&self) -> &AccessResolver<S> {
        &self.resolver
    }

    pub fn lifecycle(&self) -> &ApplicationLifecycle<S, E> {
        &self.lifecycle
    }

    pub fn notes(&self) -> &NoteGateway<S, E> {
        &self.notes
    }
}
