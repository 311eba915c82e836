use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::super::domain::{CompanyId, RecruiterId};
use super::super::repository::{RecruiterCompanyLink, RecruiterPool, RepositoryError};
use super::draw::pick_weighted;
use super::weights::RecruiterCandidate;

const DEFAULT_FALLBACK_SAMPLE_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Bound on the platform-wide fallback pool.
    pub fallback_sample_limit: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            fallback_sample_limit: DEFAULT_FALLBACK_SAMPLE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolTier {
    /// Recruiters already linked to the company.
    Company,
    /// Any active recruiter on the platform.
    Platform,
}

impl PoolTier {
    pub const fn label(self) -> &'static str {
        match self {
            PoolTier::Company => "company",
            PoolTier::Platform => "platform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterAssignment {
    pub recruiter_id: RecruiterId,
    pub created_relationship: bool,
    pub pool: PoolTier,
    pub weight: u32,
}

impl RecruiterAssignment {
    /// Active relationship row a platform-pool pick needs; `None` for linked recruiters.
    pub fn relationship(
        &self,
        company_id: &CompanyId,
        now: DateTime<Utc>,
    ) -> Option<RecruiterCompanyLink> {
        self.created_relationship.then(|| RecruiterCompanyLink {
            recruiter_id: self.recruiter_id.clone(),
            company_id: company_id.clone(),
            role: "recruiter".to_string(),
            can_manage_company_jobs: false,
            active: true,
            created_at: now,
        })
    }
}

/// Selects one recruiter for a company, creating the company relationship when the
/// selection came from the platform-wide fallback pool.
pub struct RecruiterAssignmentEngine<P> {
    pool: Arc<P>,
    config: AssignmentConfig,
}

impl<P> RecruiterAssignmentEngine<P>
where
    P: RecruiterPool + 'static,
{
    pub fn new(pool: Arc<P>, config: AssignmentConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// `Ok(None)` means no eligible recruiter exists in either pool.
    pub fn select_recruiter(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<RecruiterAssignment>, RepositoryError> {
        self.select_recruiter_with(company_id, Utc::now(), &mut rand::thread_rng())
    }

    /// Draw and, for a platform-pool pick, activate the company relationship immediately.
    pub fn select_recruiter_with<R>(
        &self,
        company_id: &CompanyId,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<RecruiterAssignment>, RepositoryError>
    where
        R: Rng + ?Sized,
    {
        let selection = self.plan_recruiter_with(company_id, now, rng)?;
        if let Some(assignment) = &selection {
            if let Some(link) = assignment.relationship(company_id, now) {
                self.pool.activate_relationship(link)?;
                info!(
                    %company_id,
                    recruiter_id = %assignment.recruiter_id,
                    "linked fallback recruiter to company"
                );
            }
        }
        Ok(selection)
    }

    pub fn plan_recruiter(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<RecruiterAssignment>, RepositoryError> {
        self.plan_recruiter_with(company_id, Utc::now(), &mut rand::thread_rng())
    }

    /// Read-only draw. A platform-pool pick reports `created_relationship = true`; the caller
    /// persists the link from [`RecruiterAssignment::relationship`].
    pub fn plan_recruiter_with<R>(
        &self,
        company_id: &CompanyId,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<RecruiterAssignment>, RepositoryError>
    where
        R: Rng + ?Sized,
    {
        let linked = dedupe(self.pool.company_recruiters(company_id)?);
        if !linked.is_empty() {
            let candidates = self.working_set(&linked)?;
            let selection = select(&candidates, now, rng).map(|(recruiter_id, weight)| {
                RecruiterAssignment {
                    recruiter_id,
                    created_relationship: false,
                    pool: PoolTier::Company,
                    weight,
                }
            });
            if let Some(assignment) = &selection {
                debug!(
                    %company_id,
                    recruiter_id = %assignment.recruiter_id,
                    weight = assignment.weight,
                    pool_size = candidates.len(),
                    "selected linked recruiter"
                );
            }
            return Ok(selection);
        }

        let platform = dedupe(
            self.pool
                .active_recruiters(self.config.fallback_sample_limit)?,
        );
        if platform.is_empty() {
            info!(%company_id, "no recruiters available in company or platform pool");
            return Ok(None);
        }

        let candidates = self.working_set(&platform)?;
        let selection = select(&candidates, now, rng).map(|(recruiter_id, weight)| {
            RecruiterAssignment {
                recruiter_id,
                created_relationship: true,
                pool: PoolTier::Platform,
                weight,
            }
        });
        if let Some(assignment) = &selection {
            debug!(
                %company_id,
                recruiter_id = %assignment.recruiter_id,
                weight = assignment.weight,
                pool_size = candidates.len(),
                "selected platform recruiter"
            );
        }
        Ok(selection)
    }

    /// Joins the three independent factor queries into one candidate list.
    pub fn working_set(
        &self,
        recruiters: &[RecruiterId],
    ) -> Result<Vec<RecruiterCandidate>, RepositoryError> {
        let tiers = self.pool.subscription_tiers(recruiters)?;
        let activity = self.pool.last_application_activity(recruiters)?;
        let workload = self.pool.pending_prescreens(recruiters)?;

        Ok(recruiters
            .iter()
            .map(|id| RecruiterCandidate {
                recruiter_id: id.clone(),
                tier: tiers.get(id).copied(),
                last_application_at: activity.get(id).copied(),
                pending_prescreens: workload.get(id).copied().unwrap_or(0),
            })
            .collect())
    }
}

fn select<R>(
    candidates: &[RecruiterCandidate],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<(RecruiterId, u32)>
where
    R: Rng + ?Sized,
{
    pick_weighted(candidates, |candidate| candidate.weight(now), rng)
        .map(|candidate| (candidate.recruiter_id.clone(), candidate.weight(now)))
}

fn dedupe(ids: Vec<RecruiterId>) -> Vec<RecruiterId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
