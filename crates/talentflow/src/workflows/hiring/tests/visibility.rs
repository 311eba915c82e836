use std::collections::BTreeSet;

use chrono::Utc;

use super::common::*;
use crate::workflows::hiring::access::{
    allowed_creator_types, allowed_visibilities, sides_for, validate_note_author,
    visible_classes, AccessContext, AuthorshipViolation, Role,
};
use crate::workflows::hiring::domain::{
    Application, ApplicationId, ApplicationRecord, CandidateId, CompanyId, CreatorType, Job,
    JobId, RecruiterId, Stage, UserId, Visibility,
};
use crate::workflows::hiring::repository::{RecruiterProfile, RecruiterStatus};

fn record(candidate_recruiter: Option<&str>, company_recruiter: Option<&str>) -> ApplicationRecord {
    let now = Utc::now();
    ApplicationRecord {
        application: Application {
            id: ApplicationId::new("app-1"),
            stage: Stage::Submitted,
            candidate_id: CandidateId::new(CANDIDATE),
            job_id: JobId::new(JOB),
            candidate_recruiter_id: candidate_recruiter.map(RecruiterId::new),
            salary: None,
            decline_reason: None,
            decline_details: None,
            ai_review: None,
            created_at: now,
            updated_at: now,
        },
        job: Job {
            id: JobId::new(JOB),
            company_id: CompanyId::new(COMPANY),
            title: "Backend Engineer".to_string(),
            company_recruiter_id: company_recruiter.map(RecruiterId::new),
        },
    }
}

fn user(id: &str) -> AccessContext {
    AccessContext::for_user(UserId::new(id))
}

#[test]
fn candidate_sees_shared_and_candidate_only() {
    let ctx = user(CANDIDATE_USER).with_candidate(CandidateId::new(CANDIDATE));
    let classes = visible_classes(&ctx, &record(None, None));
    assert_eq!(
        classes,
        BTreeSet::from([Visibility::Shared, Visibility::CandidateOnly])
    );
}

#[test]
fn company_member_sees_shared_and_company_only() {
    let ctx = user(COMPANY_ADMIN_USER).with_company(CompanyId::new(COMPANY), Role::CompanyAdmin);
    let classes = visible_classes(&ctx, &record(None, None));
    assert_eq!(
        classes,
        BTreeSet::from([Visibility::Shared, Visibility::CompanyOnly])
    );
}

#[test]
fn platform_admin_sees_everything_without_membership() {
    let ctx = user(PLATFORM_ADMIN_USER).as_platform_admin();
    let sides = sides_for(&ctx, &record(None, None));
    assert!(sides.candidate && sides.company);
    assert_eq!(visible_classes(&ctx, &record(None, None)).len(), 3);
}

#[test]
fn unrelated_caller_holds_no_side() {
    let ctx = user(OUTSIDER_USER).with_company(CompanyId::new(OTHER_COMPANY), Role::CompanyAdmin);
    let sides = sides_for(&ctx, &record(Some(AGENT), None));
    assert!(!sides.any());
    assert_eq!(
        visible_classes(&ctx, &record(Some(AGENT), None)),
        BTreeSet::from([Visibility::Shared])
    );
}

#[test]
fn recruiter_side_follows_which_slot_they_occupy() {
    let agent = user(AGENT_USER).with_recruiter(RecruiterId::new(AGENT));
    let agent_sides = sides_for(&agent, &record(Some(AGENT), Some(SCREENER)));
    assert!(agent_sides.candidate);
    assert!(!agent_sides.company);

    let screener = user(SCREENER_USER).with_recruiter(RecruiterId::new(SCREENER));
    let screener_sides = sides_for(&screener, &record(Some(AGENT), Some(SCREENER)));
    assert!(!screener_sides.candidate);
    assert!(screener_sides.company);
}

#[test]
fn recruiter_without_slots_has_no_side() {
    let recruiter = user(AGENT_USER).with_recruiter(RecruiterId::new(AGENT));
    assert!(!sides_for(&recruiter, &record(None, None)).any());
}

#[test]
fn both_sides_grant_the_union() {
    let ctx = user("user-dual")
        .with_candidate(CandidateId::new(CANDIDATE))
        .with_company(CompanyId::new(COMPANY), Role::HiringManager);
    assert_eq!(visible_classes(&ctx, &record(None, None)).len(), 3);
}

#[test]
fn creator_types_follow_resolved_roles() {
    let recruiter = user(AGENT_USER).with_recruiter(RecruiterId::new(AGENT));
    assert_eq!(
        allowed_creator_types(&recruiter),
        BTreeSet::from([CreatorType::CandidateRecruiter, CreatorType::CompanyRecruiter])
    );

    let manager = user(HIRING_MANAGER_USER)
        .with_company(CompanyId::new(COMPANY), Role::HiringManager);
    assert_eq!(
        allowed_creator_types(&manager),
        BTreeSet::from([CreatorType::HiringManager])
    );
    assert!(allowed_creator_types(&user("nobody")).is_empty());
}

#[test]
fn visibility_must_match_creator_side() {
    assert_eq!(
        allowed_visibilities(CreatorType::Candidate),
        &[Visibility::Shared, Visibility::CandidateOnly]
    );
    assert_eq!(
        allowed_visibilities(CreatorType::CompanyAdmin),
        &[Visibility::Shared, Visibility::CompanyOnly]
    );
    assert_eq!(allowed_visibilities(CreatorType::PlatformAdmin).len(), 3);
}

#[test]
fn note_author_checks_type_then_visibility() {
    let candidate = user(CANDIDATE_USER).with_candidate(CandidateId::new(CANDIDATE));

    assert_eq!(
        validate_note_author(&candidate, CreatorType::HiringManager, Visibility::Shared),
        Err(AuthorshipViolation::CreatorType("hiring_manager"))
    );
    assert_eq!(
        validate_note_author(&candidate, CreatorType::Candidate, Visibility::CompanyOnly),
        Err(AuthorshipViolation::Visibility {
            creator: "candidate",
            visibility: "company_only"
        })
    );
    assert!(
        validate_note_author(&candidate, CreatorType::Candidate, Visibility::CandidateOnly)
            .is_ok()
    );
}

#[test]
fn resolver_maps_directory_rows_to_roles() {
    let (pipeline, _, _) = build_pipeline();

    let admin = context(&pipeline, COMPANY_ADMIN_USER);
    assert!(admin.has_role(Role::CompanyAdmin));
    assert!(admin.company_ids.contains(&CompanyId::new(COMPANY)));
    assert!(admin.candidate_id.is_none());

    let platform = context(&pipeline, PLATFORM_ADMIN_USER);
    assert!(platform.is_platform_admin);

    let err = pipeline.resolver().resolve("  ").expect_err("blank identity");
    assert_eq!(err.kind(), "forbidden");
}

#[test]
fn resolver_ignores_inactive_recruiter_profiles() {
    let (pipeline, store, _) = build_pipeline();
    store.add_recruiter(RecruiterProfile {
        id: RecruiterId::new("rec-suspended"),
        user_id: UserId::new("user-suspended"),
        status: RecruiterStatus::Suspended,
    });

    let ctx = context(&pipeline, "user-suspended");
    assert!(ctx.recruiter_id.is_none());
    assert!(!ctx.has_role(Role::Recruiter));
}
