use chrono::{DateTime, Utc};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use talentflow::error::AppError;
use talentflow::workflows::hiring::assignment::pick_weighted;
use talentflow::workflows::hiring::{
    AssignmentConfig, CompanyId, InMemoryStore, PipelineError, PoolTier, RecruiterAssignmentEngine,
    RecruiterCandidate, RecruiterId, RecruiterPool, RosterImporter,
};

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Recruiter roster CSV (`recruiter_id,user_id,status,tier,companies`)
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Company whose pre-screen pool is sampled
    #[arg(long)]
    pub(crate) company: String,
    /// Number of draws
    #[arg(long, default_value_t = 1_000)]
    pub(crate) trials: u32,
    /// RNG seed for reproducible runs
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimulationRow {
    pub(crate) recruiter_id: RecruiterId,
    pub(crate) weight: u32,
    pub(crate) expected_share: f64,
    pub(crate) picks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimulationReport {
    pub(crate) pool: PoolTier,
    pub(crate) trials: u32,
    pub(crate) rows: Vec<SimulationRow>,
}

pub(crate) fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        roster,
        company,
        trials,
        seed,
    } = args;

    let now = Utc::now();
    let store = Arc::new(InMemoryStore::new());
    RosterImporter::from_path(&roster)?.load_into(&store, now);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let company = CompanyId::new(company);
    let report = simulate(
        &store,
        &AssignmentConfig::default(),
        &company,
        trials,
        now,
        &mut rng,
    )?;

    let Some(report) = report else {
        println!("No recruiter available for {company}: both pools are empty");
        return Ok(());
    };

    println!(
        "Recruiter assignment simulation for {company} ({} pool, {} trials)",
        report.pool.label(),
        report.trials
    );
    if report.pool == PoolTier::Platform {
        println!("  company has no linked recruiters; each real dispatch would create a link");
    }
    for row in &report.rows {
        let observed = if report.trials == 0 {
            0.0
        } else {
            f64::from(row.picks) / f64::from(report.trials)
        };
        println!(
            "- {}: weight {} | expected {:.1}% | observed {:.1}% ({} picks)",
            row.recruiter_id,
            row.weight,
            row.expected_share * 100.0,
            observed * 100.0,
            row.picks
        );
    }
    Ok(())
}

/// Repeats the weighted draw over the pool a dispatch would use, without persisting links.
pub(crate) fn simulate<P, R>(
    pool: &Arc<P>,
    config: &AssignmentConfig,
    company: &CompanyId,
    trials: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Option<SimulationReport>, PipelineError>
where
    P: RecruiterPool + 'static,
    R: rand::Rng + ?Sized,
{
    let engine = RecruiterAssignmentEngine::new(pool.clone(), config.clone());

    let linked = pool.company_recruiters(company)?;
    let (tier, mut members) = if linked.is_empty() {
        (
            PoolTier::Platform,
            pool.active_recruiters(config.fallback_sample_limit)?,
        )
    } else {
        (PoolTier::Company, linked)
    };
    if members.is_empty() {
        return Ok(None);
    }

    let mut seen = HashSet::new();
    members.retain(|id| seen.insert(id.clone()));
    let candidates: Vec<RecruiterCandidate> = engine.working_set(&members)?;

    let total: u32 = candidates.iter().map(|c| c.weight(now)).sum();
    let mut picks: BTreeMap<RecruiterId, u32> = BTreeMap::new();
    for _ in 0..trials {
        if let Some(winner) = pick_weighted(&candidates, |c| c.weight(now), rng) {
            *picks.entry(winner.recruiter_id.clone()).or_default() += 1;
        }
    }

    let rows = candidates
        .iter()
        .map(|candidate| {
            let weight = candidate.weight(now);
            SimulationRow {
                recruiter_id: candidate.recruiter_id.clone(),
                weight,
                expected_share: if total == 0 {
                    0.0
                } else {
                    f64::from(weight) / f64::from(total)
                },
                picks: picks.get(&candidate.recruiter_id).copied().unwrap_or(0),
            }
        })
        .collect();

    Ok(Some(SimulationReport {
        pool: tier,
        trials,
        rows,
    }))
}
