use super::common::*;
use crate::workflows::hiring::domain::{
    ApplicationId, CreatorType, NoteId, NoteType, Stage, Visibility,
};
use crate::workflows::hiring::events::EventTopic;
use crate::workflows::hiring::notes::MAX_MESSAGE_CHARS;
use crate::workflows::hiring::{ApplicationNote, NewNote, NoteEdit, PipelineError};

fn note(creator: CreatorType, visibility: Visibility, message: &str) -> NewNote {
    NewNote {
        created_by_type: creator,
        note_type: NoteType::General,
        visibility,
        message: message.to_string(),
        in_response_to_id: None,
    }
}

/// One note in each visibility class on a fresh application.
fn seeded_thread(pipeline: &TestPipeline) -> ApplicationId {
    let id = draft_application(pipeline, JOB, false).id().clone();
    let candidate = context(pipeline, CANDIDATE_USER);
    let admin = context(pipeline, COMPANY_ADMIN_USER);

    for (ctx, creator, visibility, message) in [
        (&candidate, CreatorType::Candidate, Visibility::Shared, "Happy to chat"),
        (&candidate, CreatorType::Candidate, Visibility::CandidateOnly, "Salary floor is firm"),
        (&admin, CreatorType::CompanyAdmin, Visibility::CompanyOnly, "Strong on systems"),
    ] {
        pipeline
            .notes()
            .create_note(ctx, &id, note(creator, visibility, message))
            .expect("note created");
    }
    id
}

fn visibilities(notes: &[ApplicationNote]) -> Vec<Visibility> {
    notes.iter().map(|note| note.visibility).collect()
}

#[test]
fn candidate_never_receives_company_only_notes() {
    let (pipeline, _, _) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let candidate = context(&pipeline, CANDIDATE_USER);

    let notes = pipeline
        .notes()
        .list_notes(&candidate, &id)
        .expect("list succeeds");
    assert_eq!(
        visibilities(&notes),
        vec![Visibility::Shared, Visibility::CandidateOnly]
    );
}

#[test]
fn company_never_receives_candidate_only_notes() {
    let (pipeline, _, _) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let manager = context(&pipeline, HIRING_MANAGER_USER);

    let notes = pipeline
        .notes()
        .list_notes(&manager, &id)
        .expect("list succeeds");
    assert_eq!(
        visibilities(&notes),
        vec![Visibility::Shared, Visibility::CompanyOnly]
    );
}

#[test]
fn platform_admin_receives_all_classes() {
    let (pipeline, _, _) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let platform = context(&pipeline, PLATFORM_ADMIN_USER);

    let notes = pipeline
        .notes()
        .list_notes(&platform, &id)
        .expect("list succeeds");
    assert_eq!(notes.len(), 3);
}

#[test]
fn candidate_cannot_write_company_only() {
    let (pipeline, _, events) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let candidate = context(&pipeline, CANDIDATE_USER);

    let err = pipeline
        .notes()
        .create_note(
            &candidate,
            &id,
            note(CreatorType::Candidate, Visibility::CompanyOnly, "psst"),
        )
        .expect_err("visibility mismatch");
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let created = pipeline
        .notes()
        .create_note(
            &candidate,
            &id,
            note(CreatorType::Candidate, Visibility::CandidateOnly, "  note to self  "),
        )
        .expect("candidate-only allowed");
    assert_eq!(created.message, "note to self");
    assert!(topics(&events).contains(&EventTopic::NoteCreated));
}

#[test]
fn caller_cannot_claim_a_creator_type_they_do_not_hold() {
    let (pipeline, _, _) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let candidate = context(&pipeline, CANDIDATE_USER);

    let err = pipeline
        .notes()
        .create_note(
            &candidate,
            &id,
            note(CreatorType::PlatformAdmin, Visibility::Shared, "hello"),
        )
        .expect_err("not a platform admin");
    assert_eq!(err.kind(), "invalid_input");
}

#[test]
fn message_must_be_non_empty_and_bounded() {
    let (pipeline, _, _) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let candidate = context(&pipeline, CANDIDATE_USER);

    let blank = pipeline
        .notes()
        .create_note(&candidate, &id, note(CreatorType::Candidate, Visibility::Shared, "   "))
        .expect_err("blank message");
    assert_eq!(blank.kind(), "invalid_input");

    let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
    let oversized = pipeline
        .notes()
        .create_note(&candidate, &id, note(CreatorType::Candidate, Visibility::Shared, &long))
        .expect_err("oversized message");
    assert_eq!(oversized.kind(), "invalid_input");

    let exact = "y".repeat(MAX_MESSAGE_CHARS);
    pipeline
        .notes()
        .create_note(&candidate, &id, note(CreatorType::Candidate, Visibility::Shared, &exact))
        .expect("boundary length accepted");
}

#[test]
fn outsider_cannot_read_or_write_notes() {
    let (pipeline, _, _) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let outsider = context(&pipeline, OUTSIDER_USER);

    let err = pipeline
        .notes()
        .list_notes(&outsider, &id)
        .expect_err("application invisible");
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[test]
fn reply_to_invisible_parent_is_not_found() {
    let (pipeline, _, _) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let admin = context(&pipeline, COMPANY_ADMIN_USER);
    let candidate = context(&pipeline, CANDIDATE_USER);

    let internal = pipeline
        .notes()
        .create_note(
            &admin,
            &id,
            note(CreatorType::CompanyAdmin, Visibility::CompanyOnly, "Internal"),
        )
        .expect("created");

    let mut reply = note(CreatorType::Candidate, Visibility::Shared, "Replying");
    reply.in_response_to_id = Some(internal.id.clone());
    let err = pipeline
        .notes()
        .create_note(&candidate, &id, reply)
        .expect_err("parent hidden from candidate");
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[test]
fn threads_group_replies_under_visible_roots() {
    let (pipeline, _, _) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let admin = context(&pipeline, COMPANY_ADMIN_USER);
    let candidate = context(&pipeline, CANDIDATE_USER);

    let question = pipeline
        .notes()
        .create_note(
            &admin,
            &id,
            NewNote {
                note_type: NoteType::Question,
                ..note(CreatorType::CompanyAdmin, Visibility::Shared, "Notice period?")
            },
        )
        .expect("question");
    let internal = pipeline
        .notes()
        .create_note(
            &admin,
            &id,
            note(CreatorType::CompanyAdmin, Visibility::CompanyOnly, "Ask about relocation"),
        )
        .expect("internal");
    pipeline
        .notes()
        .create_note(
            &candidate,
            &id,
            NewNote {
                note_type: NoteType::Answer,
                in_response_to_id: Some(question.id.clone()),
                ..note(CreatorType::Candidate, Visibility::Shared, "Four weeks")
            },
        )
        .expect("answer");
    pipeline
        .notes()
        .create_note(
            &admin,
            &id,
            NewNote {
                in_response_to_id: Some(internal.id.clone()),
                ..note(CreatorType::CompanyAdmin, Visibility::Shared, "Relocation covered")
            },
        )
        .expect("shared reply to internal note");

    let company_view = pipeline
        .notes()
        .list_note_threads(&admin, &id)
        .expect("threads");
    assert_eq!(company_view.len(), 2);
    assert_eq!(company_view[0].note.id, question.id);
    assert_eq!(company_view[0].replies.len(), 1);
    assert_eq!(company_view[1].replies.len(), 1);

    let candidate_view = pipeline
        .notes()
        .list_note_threads(&candidate, &id)
        .expect("threads");
    let roots: Vec<&str> = candidate_view
        .iter()
        .map(|thread| thread.note.message.as_str())
        .collect();
    assert_eq!(roots, vec!["Notice period?", "Relocation covered"]);
    assert_eq!(candidate_view[0].replies.len(), 1);
}

#[test]
fn only_the_creator_edits_and_visibility_is_revalidated() {
    let (pipeline, _, events) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let admin = context(&pipeline, COMPANY_ADMIN_USER);
    let manager = context(&pipeline, HIRING_MANAGER_USER);

    let created = pipeline
        .notes()
        .create_note(
            &admin,
            &id,
            note(CreatorType::CompanyAdmin, Visibility::Shared, "Draft feedback"),
        )
        .expect("created");

    let err = pipeline
        .notes()
        .update_note(
            &manager,
            &created.id,
            NoteEdit {
                message: Some("Hijacked".to_string()),
                visibility: None,
            },
        )
        .expect_err("not the creator");
    assert!(matches!(err, PipelineError::Forbidden(_)));

    let err = pipeline
        .notes()
        .update_note(
            &admin,
            &created.id,
            NoteEdit {
                message: None,
                visibility: Some(Visibility::CandidateOnly),
            },
        )
        .expect_err("company admin cannot write candidate_only");
    assert_eq!(err.kind(), "invalid_input");

    let updated = pipeline
        .notes()
        .update_note(
            &admin,
            &created.id,
            NoteEdit {
                message: Some("Final feedback".to_string()),
                visibility: Some(Visibility::CompanyOnly),
            },
        )
        .expect("creator edits");
    assert_eq!(updated.message, "Final feedback");
    assert_eq!(updated.visibility, Visibility::CompanyOnly);
    assert!(topics(&events).contains(&EventTopic::NoteUpdated));
}

#[test]
fn platform_admin_may_delete_any_note() {
    let (pipeline, _, events) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let candidate = context(&pipeline, CANDIDATE_USER);
    let manager = context(&pipeline, HIRING_MANAGER_USER);
    let platform = context(&pipeline, PLATFORM_ADMIN_USER);

    let shared = pipeline
        .notes()
        .list_notes(&candidate, &id)
        .expect("list")
        .remove(0);

    let err = pipeline
        .notes()
        .delete_note(&manager, &shared.id)
        .expect_err("manager did not write it");
    assert!(matches!(err, PipelineError::Forbidden(_)));

    pipeline
        .notes()
        .delete_note(&platform, &shared.id)
        .expect("admin deletes");
    assert!(topics(&events).contains(&EventTopic::NoteDeleted));
    assert_eq!(
        pipeline.notes().list_notes(&candidate, &id).expect("list").len(),
        1
    );
}

#[test]
fn hidden_note_is_reported_missing_on_edit() {
    let (pipeline, _, _) = build_pipeline();
    let id = seeded_thread(&pipeline);
    let candidate = context(&pipeline, CANDIDATE_USER);
    let platform = context(&pipeline, PLATFORM_ADMIN_USER);

    let internal = pipeline
        .notes()
        .list_notes(&platform, &id)
        .expect("list")
        .into_iter()
        .find(|note| note.visibility == Visibility::CompanyOnly)
        .expect("company note");

    let err = pipeline
        .notes()
        .delete_note(&candidate, &internal.id)
        .expect_err("hidden from candidate");
    assert!(matches!(err, PipelineError::NotFound(_)));

    let err = pipeline
        .notes()
        .delete_note(&candidate, &NoteId::new("note-missing"))
        .expect_err("absent");
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[test]
fn assigned_prescreen_recruiter_writes_company_recruiter_notes() {
    let (pipeline, store, _) = build_pipeline();
    let id = draft_application(&pipeline, JOB, false).id().clone();
    let admin = context(&pipeline, COMPANY_ADMIN_USER);
    force_stage(&store, &id, Stage::AiReviewed);
    pipeline
        .lifecycle()
        .request_prescreen(&admin, &id)
        .expect("screener assigned");

    let screener = context(&pipeline, SCREENER_USER);
    let created = pipeline
        .notes()
        .create_note(
            &screener,
            &id,
            note(CreatorType::CompanyRecruiter, Visibility::CompanyOnly, "Screen booked"),
        )
        .expect("screener is company-side");
    assert_eq!(created.created_by_type, CreatorType::CompanyRecruiter);
}
