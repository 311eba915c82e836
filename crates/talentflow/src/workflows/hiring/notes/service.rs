use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::super::access::visibility::validate_visibility;
use super::super::access::{sides_for, validate_note_author, visible_classes, AccessContext};
use super::super::domain::{
    generate_id, ApplicationId, ApplicationNote, ApplicationRecord, CreatorType, NoteId,
    NoteType, Visibility,
};
use super::super::error::PipelineError;
use super::super::events::{publish_best_effort, EventPublisher, EventTopic, PipelineEvent};
use super::super::repository::PipelineStore;

pub const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub created_by_type: CreatorType,
    #[serde(default)]
    pub note_type: NoteType,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    pub message: String,
    #[serde(default)]
    pub in_response_to_id: Option<NoteId>,
}

fn default_visibility() -> Visibility {
    Visibility::Shared
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEdit {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteThread {
    pub note: ApplicationNote,
    pub replies: Vec<ApplicationNote>,
}

/// Discussion thread access, filtered through the caller's visibility classes.
pub struct NoteGateway<S, E> {
    store: Arc<S>,
    events: Arc<E>,
}

impl<S, E> NoteGateway<S, E>
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<E>) -> Self {
        Self { store, events }
    }

    pub fn create_note(
        &self,
        context: &AccessContext,
        application_id: &ApplicationId,
        request: NewNote,
    ) -> Result<ApplicationNote, PipelineError> {
        let record = self.load_visible(context, application_id)?;
        let message = checked_message(&request.message)?;
        validate_note_author(context, request.created_by_type, request.visibility)
            .map_err(|err| PipelineError::InvalidInput(err.to_string()))?;

        if let Some(parent_id) = &request.in_response_to_id {
            let classes = visible_classes(context, &record);
            self.store
                .fetch_note(parent_id)?
                .filter(|parent| {
                    &parent.application_id == application_id && classes.contains(&parent.visibility)
                })
                .ok_or_else(|| PipelineError::not_found(format!("note {parent_id}")))?;
        }

        let now = Utc::now();
        let note = self.store.insert_note(ApplicationNote {
            id: NoteId::new(generate_id()),
            application_id: application_id.clone(),
            created_by_user_id: context.user_id.clone(),
            created_by_type: request.created_by_type,
            note_type: request.note_type,
            visibility: request.visibility,
            message,
            in_response_to_id: request.in_response_to_id,
            created_at: now,
            updated_at: now,
        })?;

        info!(
            %application_id,
            note_id = %note.id,
            creator = note.created_by_type.label(),
            visibility = note.visibility.label(),
            "note created"
        );

        let mut event = PipelineEvent::new(EventTopic::NoteCreated, application_id.clone())
            .with("note_id", &note.id)
            .with("created_by_type", note.created_by_type.label())
            .with("visibility", note.visibility.label());
        if let Some(parent_id) = &note.in_response_to_id {
            event = event.with("in_response_to_id", parent_id);
        }
        publish_best_effort(self.events.as_ref(), event);

        Ok(note)
    }

    /// Notes the caller may read, oldest first.
    pub fn list_notes(
        &self,
        context: &AccessContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<ApplicationNote>, PipelineError> {
        let record = self.load_visible(context, application_id)?;
        let classes = visible_classes(context, &record);
        let mut notes: Vec<ApplicationNote> = self
            .store
            .notes_for(application_id)?
            .into_iter()
            .filter(|note| classes.contains(&note.visibility))
            .collect();
        notes.sort_by_key(|note| note.created_at);
        Ok(notes)
    }

    /// Replies are grouped under their root; a reply whose ancestors are hidden becomes a root.
    pub fn list_note_threads(
        &self,
        context: &AccessContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<NoteThread>, PipelineError> {
        let notes = self.list_notes(context, application_id)?;
        let parents: HashMap<NoteId, Option<NoteId>> = notes
            .iter()
            .map(|note| (note.id.clone(), note.in_response_to_id.clone()))
            .collect();

        let (roots, replies): (Vec<_>, Vec<_>) = notes
            .into_iter()
            .map(|note| (thread_root(&note.id, &parents), note))
            .partition(|(root, note)| *root == note.id);

        let mut threads: Vec<NoteThread> = roots
            .into_iter()
            .map(|(_, note)| NoteThread {
                note,
                replies: Vec::new(),
            })
            .collect();
        let positions: HashMap<NoteId, usize> = threads
            .iter()
            .enumerate()
            .map(|(index, thread)| (thread.note.id.clone(), index))
            .collect();
        for (root, reply) in replies {
            if let Some(&index) = positions.get(&root) {
                threads[index].replies.push(reply);
            }
        }
        Ok(threads)
    }

    /// Only the creator may edit; a new visibility is revalidated against the creator type.
    pub fn update_note(
        &self,
        context: &AccessContext,
        note_id: &NoteId,
        edit: NoteEdit,
    ) -> Result<ApplicationNote, PipelineError> {
        let mut note = self.load_note(context, note_id)?;
        if note.created_by_user_id != context.user_id {
            return Err(PipelineError::Forbidden(
                "only the note's creator can edit it".to_string(),
            ));
        }

        if let Some(message) = &edit.message {
            note.message = checked_message(message)?;
        }
        if let Some(visibility) = edit.visibility {
            validate_visibility(note.created_by_type, visibility)
                .map_err(|err| PipelineError::InvalidInput(err.to_string()))?;
            note.visibility = visibility;
        }
        note.updated_at = Utc::now();

        let note = self.store.update_note(note)?;
        info!(note_id = %note.id, application_id = %note.application_id, "note updated");
        publish_best_effort(
            self.events.as_ref(),
            PipelineEvent::new(EventTopic::NoteUpdated, note.application_id.clone())
                .with("note_id", &note.id)
                .with("visibility", note.visibility.label()),
        );
        Ok(note)
    }

    pub fn delete_note(&self, context: &AccessContext, note_id: &NoteId) -> Result<(), PipelineError> {
        let note = self.load_note(context, note_id)?;
        if note.created_by_user_id != context.user_id && !context.is_platform_admin {
            return Err(PipelineError::Forbidden(
                "only the note's creator or a platform admin can delete it".to_string(),
            ));
        }

        self.store.delete_note(note_id)?;
        info!(%note_id, application_id = %note.application_id, "note deleted");
        publish_best_effort(
            self.events.as_ref(),
            PipelineEvent::new(EventTopic::NoteDeleted, note.application_id.clone())
                .with("note_id", note_id)
                .with("deleted_by", &context.user_id),
        );
        Ok(())
    }

    fn load_visible(
        &self,
        context: &AccessContext,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, PipelineError> {
        let record = self
            .store
            .fetch_application(application_id)?
            .ok_or_else(|| PipelineError::not_found(format!("application {application_id}")))?;
        if !sides_for(context, &record).any() {
            return Err(PipelineError::not_found(format!(
                "application {application_id}"
            )));
        }
        Ok(record)
    }

    /// Notes outside the caller's visibility classes are reported as absent.
    fn load_note(
        &self,
        context: &AccessContext,
        note_id: &NoteId,
    ) -> Result<ApplicationNote, PipelineError> {
        let missing = || PipelineError::not_found(format!("note {note_id}"));
        let note = self.store.fetch_note(note_id)?.ok_or_else(missing)?;
        let record = self
            .load_visible(context, &note.application_id)
            .map_err(|err| match err {
                PipelineError::NotFound(_) => missing(),
                other => other,
            })?;
        let classes: BTreeSet<Visibility> = visible_classes(context, &record);
        if !classes.contains(&note.visibility) {
            return Err(missing());
        }
        Ok(note)
    }
}

fn checked_message(message: &str) -> Result<String, PipelineError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(PipelineError::InvalidInput(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Walk up through visible parents; stops at the first note whose parent is not listed.
fn thread_root(id: &NoteId, parents: &HashMap<NoteId, Option<NoteId>>) -> NoteId {
    let mut current = id.clone();
    let mut seen = HashSet::new();
    while seen.insert(current.clone()) {
        match parents.get(&current) {
            Some(Some(parent)) if parents.contains_key(parent) => current = parent.clone(),
            _ => break,
        }
    }
    current
}
