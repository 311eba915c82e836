use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::domain::{CandidateId, CompanyId, RecruiterId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Recruiter,
    CompanyAdmin,
    HiringManager,
    PlatformAdmin,
}

/// Request-scoped capability set. Never persisted or cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user_id: UserId,
    pub candidate_id: Option<CandidateId>,
    pub recruiter_id: Option<RecruiterId>,
    pub company_ids: BTreeSet<CompanyId>,
    pub roles: BTreeSet<Role>,
    pub is_platform_admin: bool,
}

impl AccessContext {
    /// Context with no capabilities beyond a known identity.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            candidate_id: None,
            recruiter_id: None,
            company_ids: BTreeSet::new(),
            roles: BTreeSet::new(),
            is_platform_admin: false,
        }
    }

    pub fn with_candidate(mut self, candidate_id: CandidateId) -> Self {
        self.candidate_id = Some(candidate_id);
        self.roles.insert(Role::Candidate);
        self
    }

    pub fn with_recruiter(mut self, recruiter_id: RecruiterId) -> Self {
        self.recruiter_id = Some(recruiter_id);
        self.roles.insert(Role::Recruiter);
        self
    }

    pub fn with_company(mut self, company_id: CompanyId, role: Role) -> Self {
        self.company_ids.insert(company_id);
        self.roles.insert(role);
        self
    }

    pub fn as_platform_admin(mut self) -> Self {
        self.is_platform_admin = true;
        self.roles.insert(Role::PlatformAdmin);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
