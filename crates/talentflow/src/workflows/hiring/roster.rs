//! Recruiter roster CSV import (`recruiter_id,user_id,status,tier,companies`).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::info;

use super::assignment::SubscriptionTier;
use super::domain::{CompanyId, RecruiterId, UserId};
use super::memory::InMemoryStore;
use super::repository::{RecruiterCompanyLink, RecruiterProfile, RecruiterStatus};

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to open roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed roster csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unknown subscription tier `{value}`")]
    InvalidTier { row: usize, value: String },
    #[error("row {row}: unknown recruiter status `{value}`")]
    InvalidStatus { row: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub recruiter_id: RecruiterId,
    pub user_id: UserId,
    pub status: RecruiterStatus,
    pub tier: Option<SubscriptionTier>,
    pub companies: Vec<CompanyId>,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    recruiter_id: String,
    user_id: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tier: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    companies: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_status(raw: &str) -> Option<RecruiterStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => Some(RecruiterStatus::Active),
        "pending" => Some(RecruiterStatus::Pending),
        "suspended" => Some(RecruiterStatus::Suspended),
        _ => None,
    }
}

/// Parsed roster, ready to seed an [`InMemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct RosterImporter {
    entries: Vec<RosterEntry>,
}

impl RosterImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RosterImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let row_number = index + 2;
            let row = record?;

            let status =
                parse_status(&row.status).ok_or_else(|| RosterImportError::InvalidStatus {
                    row: row_number,
                    value: row.status.clone(),
                })?;
            let tier = match row.tier {
                Some(raw) => Some(SubscriptionTier::parse(&raw).ok_or(
                    RosterImportError::InvalidTier {
                        row: row_number,
                        value: raw,
                    },
                )?),
                None => None,
            };
            let companies = row
                .companies
                .as_deref()
                .unwrap_or_default()
                .split(';')
                .map(str::trim)
                .filter(|company| !company.is_empty())
                .map(CompanyId::new)
                .collect();

            entries.push(RosterEntry {
                recruiter_id: RecruiterId::new(row.recruiter_id),
                user_id: UserId::new(row.user_id),
                status,
                tier,
                companies,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Seeds recruiter profiles, active subscriptions and company relationships.
    pub fn load_into(&self, store: &InMemoryStore, now: DateTime<Utc>) -> usize {
        for entry in &self.entries {
            store.add_recruiter(RecruiterProfile {
                id: entry.recruiter_id.clone(),
                user_id: entry.user_id.clone(),
                status: entry.status,
            });
            if let Some(tier) = entry.tier {
                store.set_subscription(entry.recruiter_id.clone(), tier, true);
            }
            for company_id in &entry.companies {
                store.add_relationship(RecruiterCompanyLink {
                    recruiter_id: entry.recruiter_id.clone(),
                    company_id: company_id.clone(),
                    role: "recruiter".to_string(),
                    can_manage_company_jobs: false,
                    active: true,
                    created_at: now,
                });
            }
        }
        info!(recruiters = self.entries.len(), "recruiter roster loaded");
        self.entries.len()
    }
}
