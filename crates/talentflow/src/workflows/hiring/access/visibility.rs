//! Side determination and the two lookup tables governing note authorship.

use std::collections::BTreeSet;

use super::super::domain::{ApplicationRecord, CreatorType, Visibility};
use super::context::{AccessContext, Role};

/// Which parties of an application the caller speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplicationSides {
    pub candidate: bool,
    pub company: bool,
}

impl ApplicationSides {
    pub fn any(self) -> bool {
        self.candidate || self.company
    }
}

pub fn sides_for(context: &AccessContext, record: &ApplicationRecord) -> ApplicationSides {
    if context.is_platform_admin {
        return ApplicationSides {
            candidate: true,
            company: true,
        };
    }

    let application = &record.application;
    let candidate = context.candidate_id.as_ref() == Some(&application.candidate_id)
        || (context.recruiter_id.is_some()
            && context.recruiter_id == application.candidate_recruiter_id);

    let company = context.company_ids.contains(&record.job.company_id)
        || (context.recruiter_id.is_some()
            && context.recruiter_id == record.job.company_recruiter_id);

    ApplicationSides { candidate, company }
}

/// Visibility classes the caller may read on this application.
pub fn visible_classes(context: &AccessContext, record: &ApplicationRecord) -> BTreeSet<Visibility> {
    let sides = sides_for(context, record);
    let mut classes = BTreeSet::from([Visibility::Shared]);
    if sides.candidate {
        classes.insert(Visibility::CandidateOnly);
    }
    if sides.company {
        classes.insert(Visibility::CompanyOnly);
    }
    classes
}

const ROLE_CREATOR_TYPES: &[(Role, &[CreatorType])] = &[
    (Role::Candidate, &[CreatorType::Candidate]),
    (
        Role::Recruiter,
        &[CreatorType::CandidateRecruiter, CreatorType::CompanyRecruiter],
    ),
    (Role::CompanyAdmin, &[CreatorType::CompanyAdmin]),
    (Role::HiringManager, &[CreatorType::HiringManager]),
    (Role::PlatformAdmin, &[CreatorType::PlatformAdmin]),
];

const CREATOR_VISIBILITIES: &[(CreatorType, &[Visibility])] = &[
    (
        CreatorType::Candidate,
        &[Visibility::Shared, Visibility::CandidateOnly],
    ),
    (
        CreatorType::CandidateRecruiter,
        &[Visibility::Shared, Visibility::CandidateOnly],
    ),
    (
        CreatorType::CompanyRecruiter,
        &[Visibility::Shared, Visibility::CompanyOnly],
    ),
    (
        CreatorType::HiringManager,
        &[Visibility::Shared, Visibility::CompanyOnly],
    ),
    (
        CreatorType::CompanyAdmin,
        &[Visibility::Shared, Visibility::CompanyOnly],
    ),
    (
        CreatorType::PlatformAdmin,
        &[
            Visibility::Shared,
            Visibility::CompanyOnly,
            Visibility::CandidateOnly,
        ],
    ),
];

/// Creator types the caller's resolved roles entitle them to claim.
pub fn allowed_creator_types(context: &AccessContext) -> BTreeSet<CreatorType> {
    ROLE_CREATOR_TYPES
        .iter()
        .filter(|(role, _)| context.has_role(*role))
        .flat_map(|(_, types)| types.iter().copied())
        .collect()
}

pub fn allowed_visibilities(creator: CreatorType) -> &'static [Visibility] {
    CREATOR_VISIBILITIES
        .iter()
        .find(|(candidate, _)| *candidate == creator)
        .map(|(_, visibilities)| *visibilities)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorshipViolation {
    #[error("caller cannot author notes as {0}")]
    CreatorType(&'static str),
    #[error("{creator} notes cannot use visibility {visibility}")]
    Visibility {
        creator: &'static str,
        visibility: &'static str,
    },
}

/// Both checks must pass: the claimed creator type, then the visibility for that type.
pub fn validate_note_author(
    context: &AccessContext,
    creator: CreatorType,
    visibility: Visibility,
) -> Result<(), AuthorshipViolation> {
    if !allowed_creator_types(context).contains(&creator) {
        return Err(AuthorshipViolation::CreatorType(creator.label()));
    }
    validate_visibility(creator, visibility)
}

pub(crate) fn validate_visibility(
    creator: CreatorType,
    visibility: Visibility,
) -> Result<(), AuthorshipViolation> {
    if allowed_visibilities(creator).contains(&visibility) {
        Ok(())
    } else {
        Err(AuthorshipViolation::Visibility {
            creator: creator.label(),
            visibility: visibility.label(),
        })
    }
}
