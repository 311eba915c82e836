use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::ApplicationId;

/// Named events published after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    #[serde(rename = "application.created")]
    ApplicationCreated,
    #[serde(rename = "application.stage_changed")]
    StageChanged,
    #[serde(rename = "application.submitted")]
    Submitted,
    #[serde(rename = "application.ai_review_requested")]
    AiReviewRequested,
    #[serde(rename = "application.ai_reviewed")]
    AiReviewed,
    #[serde(rename = "application.needs_improvement")]
    NeedsImprovement,
    #[serde(rename = "application.prescreen_requested")]
    PrescreenRequested,
    #[serde(rename = "application.proposal_accepted")]
    ProposalAccepted,
    #[serde(rename = "application.proposal_declined")]
    ProposalDeclined,
    #[serde(rename = "application.hired")]
    Hired,
    #[serde(rename = "application.note.created")]
    NoteCreated,
    #[serde(rename = "application.note.updated")]
    NoteUpdated,
    #[serde(rename = "application.note.deleted")]
    NoteDeleted,
}

impl EventTopic {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventTopic::ApplicationCreated => "application.created",
            EventTopic::StageChanged => "application.stage_changed",
            EventTopic::Submitted => "application.submitted",
            EventTopic::AiReviewRequested => "application.ai_review_requested",
            EventTopic::AiReviewed => "application.ai_reviewed",
            EventTopic::NeedsImprovement => "application.needs_improvement",
            EventTopic::PrescreenRequested => "application.prescreen_requested",
            EventTopic::ProposalAccepted => "application.proposal_accepted",
            EventTopic::ProposalDeclined => "application.proposal_declined",
            EventTopic::Hired => "application.hired",
            EventTopic::NoteCreated => "application.note.created",
            EventTopic::NoteUpdated => "application.note.updated",
            EventTopic::NoteDeleted => "application.note.deleted",
        }
    }
}

/// Flat payload of ids and enum labels; subscribers live outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub topic: EventTopic,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(topic: EventTopic, application_id: ApplicationId) -> Self {
        Self {
            topic,
            application_id,
            details: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

/// Outbound event bus hook (e.g., a queue or webhook adapter).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// At-most-once delivery: failures are logged and never reach the caller.
pub(crate) fn publish_best_effort<E>(publisher: &E, event: PipelineEvent)
where
    E: EventPublisher + ?Sized,
{
    let topic = event.topic.as_str();
    let application_id = event.application_id.clone();
    if let Err(err) = publisher.publish(event) {
        warn!(%application_id, topic, error = %err, "event publish failed; continuing");
    }
}
