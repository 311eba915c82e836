use std::sync::Arc;

use tracing::debug;

use super::super::domain::UserId;
use super::super::error::PipelineError;
use super::super::repository::{AccessDirectory, MembershipRole, RecruiterStatus};
use super::context::{AccessContext, Role};

/// Derives an [`AccessContext`] from live relational state on every call.
pub struct AccessResolver<D> {
    directory: Arc<D>,
}

impl<D> AccessResolver<D>
where
    D: AccessDirectory + 'static,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub fn resolve(&self, identity: &str) -> Result<AccessContext, PipelineError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(PipelineError::Forbidden(
                "missing caller identity".to_string(),
            ));
        }

        let mut context = AccessContext::for_user(UserId::new(identity));

        if let Some(candidate_id) = self.directory.candidate_for_user(&context.user_id)? {
            context = context.with_candidate(candidate_id);
        }

        if let Some(profile) = self.directory.recruiter_for_user(&context.user_id)? {
            if profile.status == RecruiterStatus::Active {
                context = context.with_recruiter(profile.id);
            } else {
                debug!(user_id = %context.user_id, status = ?profile.status, "ignoring inactive recruiter profile");
            }
        }

        for membership in self.directory.memberships_for_user(&context.user_id)? {
            let role = match membership.role {
                MembershipRole::Admin => Role::CompanyAdmin,
                MembershipRole::HiringManager => Role::HiringManager,
            };
            context = context.with_company(membership.company_id, role);
        }

        if self.directory.is_platform_admin(&context.user_id)? {
            context = context.as_platform_admin();
        }

        debug!(
            user_id = %context.user_id,
            roles = ?context.roles,
            companies = context.company_ids.len(),
            "resolved access context"
        );
        Ok(context)
    }
}
