use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::access::AccessContext;
use super::domain::{AiReviewResult, ApplicationId, NoteId};
use super::error::PipelineError;
use super::events::EventPublisher;
use super::lifecycle::{NewApplication, Proposal, StageUpdate};
use super::notes::{NewNote, NoteEdit};
use super::repository::PipelineStore;
use super::HiringPipeline;

/// Header carrying the identity already verified by the upstream identity provider.
pub const IDENTITY_HEADER: &str = "x-identity";

type Pipeline<S, E> = Arc<HiringPipeline<S, E>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReasonBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    decline_reason: Option<String>,
    #[serde(default)]
    decline_details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HireBody {
    salary: u64,
}

/// Router builder exposing the application pipeline and note endpoints.
pub fn pipeline_router<S, E>(pipeline: Arc<HiringPipeline<S, E>>) -> Router
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(create_handler::<S, E>).get(list_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/proposals",
            post(propose_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id",
            get(get_handler::<S, E>).patch(update_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/ai-review",
            post(ai_review_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/submit",
            post(submit_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/return-to-draft",
            post(return_to_draft_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/withdraw",
            post(withdraw_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/reject",
            post(reject_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/accept",
            post(accept_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/decline",
            post(decline_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/prescreen",
            post(prescreen_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/hire",
            post(hire_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/history",
            get(history_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/notes",
            get(list_notes_handler::<S, E>).post(create_note_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:id/notes/threads",
            get(note_threads_handler::<S, E>),
        )
        .route(
            "/api/v1/notes/:id",
            patch(update_note_handler::<S, E>).delete(delete_note_handler::<S, E>),
        )
        .route(
            "/api/v1/internal/applications/:id/ai-review-completed",
            post(ai_review_completed_handler::<S, E>),
        )
        .with_state(pipeline)
}

fn caller<S, E>(pipeline: &HiringPipeline<S, E>, headers: &HeaderMap) -> Result<AccessContext, PipelineError>
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    pipeline.resolver().resolve(identity)
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, PipelineError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Json(request): Json<NewApplication>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().create_application(&ctx, request));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn propose_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Json(proposal): Json<Proposal>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().propose_job_to_candidate(&ctx, proposal));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn list_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let result =
        caller(&pipeline, &headers).and_then(|ctx| pipeline.lifecycle().list_applications(&ctx));
    respond(StatusCode::OK, result)
}

pub(crate) async fn get_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result =
        caller(&pipeline, &headers).and_then(|ctx| pipeline.lifecycle().get_application(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<StageUpdate>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().update_application(&ctx, &id, update));
    respond(StatusCode::OK, result)
}

pub(crate) async fn ai_review_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().trigger_ai_review(&ctx, &id));
    respond(StatusCode::ACCEPTED, result)
}

pub(crate) async fn ai_review_completed_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    Path(id): Path<String>,
    Json(review): Json<AiReviewResult>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = pipeline.lifecycle().handle_ai_review_completed(&id, review);
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().submit_application(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn return_to_draft_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().return_to_draft(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn withdraw_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().withdraw_application(&ctx, &id, body.reason));
    respond(StatusCode::OK, result)
}

pub(crate) async fn reject_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers).and_then(|ctx| {
        pipeline.lifecycle().reject_application(
            &ctx,
            &id,
            body.decline_reason,
            body.decline_details,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn accept_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().accept_proposal(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn decline_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().decline_proposal(&ctx, &id, body.reason));
    respond(StatusCode::OK, result)
}

pub(crate) async fn prescreen_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().request_prescreen(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn hire_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<HireBody>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().hire_candidate(&ctx, &id, body.salary));
    respond(StatusCode::OK, result)
}

pub(crate) async fn history_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.lifecycle().application_history(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_notes_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result =
        caller(&pipeline, &headers).and_then(|ctx| pipeline.notes().list_notes(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn note_threads_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.notes().list_note_threads(&ctx, &id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_note_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<NewNote>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = ApplicationId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.notes().create_note(&ctx, &id, request));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_note_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(edit): Json<NoteEdit>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = NoteId(id);
    let result = caller(&pipeline, &headers)
        .and_then(|ctx| pipeline.notes().update_note(&ctx, &id, edit));
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_note_handler<S, E>(
    State(pipeline): State<Pipeline<S, E>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
    E: EventPublisher + 'static,
{
    let id = NoteId(id);
    match caller(&pipeline, &headers).and_then(|ctx| pipeline.notes().delete_note(&ctx, &id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
