use crate::infra::{
    load_roster, seed_demo_store, DEMO_AGENT, DEMO_AGENT_USER, DEMO_CANDIDATE_USER,
    DEMO_COMPANY_ADMIN_USER, DEMO_GLOBEX_JOB, DEMO_GLOBEX_MANAGER_USER, DEMO_HIRING_MANAGER_USER,
    DEMO_NORTHWIND_JOB,
};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use talentflow::error::AppError;
use talentflow::workflows::hiring::{
    AccessContext, AiReviewResult, ApplicationId, ApplicationRecord, CandidateId, CreatorType,
    FitRecommendation, HiringPipeline, InMemoryEventBus, InMemoryStore, JobId, NewApplication,
    NewNote, NoteType, PipelineConfig, PrescreenOutcome, Proposal, RecruiterId, Stage,
    StageUpdate, Visibility,
};

type DemoPipeline = HiringPipeline<InMemoryStore, InMemoryEventBus>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Optional recruiter roster CSV layered over the demo bench.
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
    /// Salary recorded when the demo candidate is hired.
    #[arg(long, default_value_t = 145_000)]
    pub(crate) salary: u64,
    /// Skip the recruiter proposal walkthrough.
    #[arg(long)]
    pub(crate) skip_proposal: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster,
        salary,
        skip_proposal,
    } = args;

    let now = Utc::now();
    let store = Arc::new(InMemoryStore::new());
    seed_demo_store(&store, now);
    if let Some(path) = roster {
        let loaded = load_roster(&store, &path, now)?;
        println!("Loaded {loaded} recruiters from {}", path.display());
    }
    let events = Arc::new(InMemoryEventBus::new());
    let pipeline = HiringPipeline::new(store.clone(), events.clone(), PipelineConfig::default());

    println!("Hiring pipeline demo");
    let resolve = |user: &str| pipeline.resolver().resolve(user);
    let candidate = resolve(DEMO_CANDIDATE_USER)?;
    let agent = resolve(DEMO_AGENT_USER)?;
    let company_admin = resolve(DEMO_COMPANY_ADMIN_USER)?;
    let hiring_manager = resolve(DEMO_HIRING_MANAGER_USER)?;

    let id = run_candidate_journey(&pipeline, &candidate, &agent, &hiring_manager, salary)?;
    render_notes(&pipeline, &id, &candidate, &company_admin)?;
    render_history(&pipeline, &candidate, &id)?;

    if !skip_proposal {
        run_proposal_journey(&pipeline, &agent)?;
    }

    println!("\nEvents published: {}", events.events().len());
    for relationship in store.relationships() {
        println!(
            "- {} linked to {} (active: {})",
            relationship.recruiter_id, relationship.company_id, relationship.active
        );
    }
    Ok(())
}

fn run_candidate_journey(
    pipeline: &DemoPipeline,
    candidate: &AccessContext,
    agent: &AccessContext,
    hiring_manager: &AccessContext,
    salary: u64,
) -> Result<ApplicationId, AppError> {
    let lifecycle = pipeline.lifecycle();

    println!("\nCandidate journey");
    let record = lifecycle.create_application(
        candidate,
        NewApplication {
            job_id: JobId::new(DEMO_NORTHWIND_JOB),
            candidate_recruiter_id: Some(RecruiterId::new(DEMO_AGENT)),
        },
    )?;
    let id = record.id().clone();
    step("created", &record);

    step("ai review started", &lifecycle.trigger_ai_review(candidate, &id)?);
    let outcome = lifecycle.handle_ai_review_completed(
        &id,
        AiReviewResult {
            recommendation: FitRecommendation::FairFit,
            fit_score: Some(54),
            concerns: vec!["No incident command experience listed".to_string()],
            strengths: vec!["Kubernetes operations".to_string()],
        },
    )?;
    step("ai review completed", &outcome.record);
    println!("  needs improvement: {}", outcome.needs_improvement);

    step("returned to draft", &lifecycle.return_to_draft(candidate, &id)?);
    lifecycle.trigger_ai_review(candidate, &id)?;
    let outcome = lifecycle.handle_ai_review_completed(
        &id,
        AiReviewResult {
            recommendation: FitRecommendation::GoodFit,
            fit_score: Some(82),
            concerns: Vec::new(),
            strengths: vec!["Led on-call rotation".to_string()],
        },
    )?;
    step("re-reviewed", &outcome.record);

    step("submitted", &lifecycle.submit_application(candidate, &id)?);
    pipeline.notes().create_note(
        agent,
        &id,
        NewNote {
            created_by_type: CreatorType::CandidateRecruiter,
            note_type: NoteType::Feedback,
            visibility: Visibility::CandidateOnly,
            message: "Lead with the incident write-ups in the screen.".to_string(),
            in_response_to_id: None,
        },
    )?;

    let PrescreenOutcome { record, assignment } =
        lifecycle.request_prescreen(hiring_manager, &id)?;
    step("pre-screen requested", &record);
    if let Some(assignment) = assignment {
        println!(
            "  recruiter {} from the {} pool (weight {})",
            assignment.recruiter_id,
            assignment.pool.label(),
            assignment.weight
        );
    }

    pipeline.notes().create_note(
        hiring_manager,
        &id,
        NewNote {
            created_by_type: CreatorType::HiringManager,
            note_type: NoteType::General,
            visibility: Visibility::CompanyOnly,
            message: "Headcount approved for Q3.".to_string(),
            in_response_to_id: None,
        },
    )?;

    for stage in [Stage::CompanyReview, Stage::Interview, Stage::Offer] {
        let record = lifecycle.update_application(
            hiring_manager,
            &id,
            StageUpdate {
                stage,
                decline_reason: None,
                decline_details: None,
            },
        )?;
        step("advanced", &record);
    }

    step("hired", &lifecycle.hire_candidate(hiring_manager, &id, salary)?);
    Ok(id)
}

fn run_proposal_journey(pipeline: &DemoPipeline, agent: &AccessContext) -> Result<(), AppError> {
    let lifecycle = pipeline.lifecycle();
    let omar = pipeline.resolver().resolve("user-omar")?;
    let globex = pipeline.resolver().resolve(DEMO_GLOBEX_MANAGER_USER)?;

    println!("\nRecruiter proposal");
    let record = lifecycle.propose_job_to_candidate(
        agent,
        Proposal {
            candidate_id: CandidateId::new("cand-omar"),
            job_id: JobId::new(DEMO_GLOBEX_JOB),
            pitch: Some("Greenfield data platform, fully remote".to_string()),
        },
    )?;
    let id = record.id().clone();
    step("proposed", &record);
    step("accepted", &lifecycle.accept_proposal(&omar, &id)?);

    match lifecycle.request_prescreen(&globex, &id) {
        Ok(PrescreenOutcome { record, assignment }) => {
            step("pre-screen requested", &record);
            if let Some(assignment) = assignment {
                println!(
                    "  recruiter {} from the {} pool (new relationship: {})",
                    assignment.recruiter_id,
                    assignment.pool.label(),
                    assignment.created_relationship
                );
            }
        }
        Err(err) => println!("  pre-screen unavailable: {err}"),
    }
    Ok(())
}

fn render_notes(
    pipeline: &DemoPipeline,
    id: &ApplicationId,
    candidate: &AccessContext,
    company: &AccessContext,
) -> Result<(), AppError> {
    for (label, viewer) in [("candidate side", candidate), ("company side", company)] {
        let notes = pipeline.notes().list_notes(viewer, id)?;
        println!("\nNotes visible to the {label} ({})", notes.len());
        for note in notes {
            println!(
                "- [{}] {}: {}",
                note.visibility.label(),
                note.created_by_type.label(),
                note.message
            );
        }
    }
    Ok(())
}

fn render_history(
    pipeline: &DemoPipeline,
    viewer: &AccessContext,
    id: &ApplicationId,
) -> Result<(), AppError> {
    let history = pipeline.lifecycle().application_history(viewer, id)?;
    println!("\nAudit trail ({} entries)", history.len());
    for entry in history {
        println!(
            "- {} by {} {}",
            entry.action.label(),
            entry.actor_role.label(),
            entry
                .new_value
                .as_ref()
                .and_then(|value| value.get("stage"))
                .and_then(|stage| stage.as_str())
                .map(|stage| format!("-> {stage}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn step(label: &str, record: &ApplicationRecord) {
    println!("- {label}: {} is {}", record.id(), record.stage());
}
