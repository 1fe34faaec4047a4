// End-to-end analysis: vocabulary -> subset -> pair -> estimate -> rank.
//
// Everything here is in memory. Loading inputs and writing the export are
// the caller's job, so a failed run never leaves a partial file behind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{Exclusion, ExclusionReason, PipelineError};
use crate::lexicon::vocabulary::Vocabulary;
use crate::lexicon::CategoryMap;
use crate::matrix::sparse::TokenScoreMatrix;
use crate::matrix::subset;
use crate::posts::Post;
use crate::ranking::{self, RankedEntry};
use crate::stats::estimator::{self, ProgressObserver};
use crate::stats::paired;

/// The three externally supplied inputs.
pub struct PipelineInputs<'a> {
    pub posts: &'a [Post],
    pub lexicon: &'a CategoryMap,
    pub matrix: &'a TokenScoreMatrix,
}

/// What happened during a run, for the operator.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub seed: u64,
    pub vocabulary_size: usize,
    pub posts_in_scope: usize,
    pub complete_users: usize,
    pub incomplete_users: usize,
    pub tokens_estimated: usize,
    /// Estimated tokens whose d was undefined (no spread in the differences)
    pub undefined_estimates: usize,
    /// Estimated tokens whose interval was unavailable
    pub unavailable_intervals: usize,
    pub exclusions: Vec<Exclusion>,
}

impl RunSummary {
    /// Exclusion counts grouped by reason label.
    pub fn exclusion_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for exclusion in &self.exclusions {
            *counts.entry(exclusion.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Ranked output plus the run summary.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub entries: Vec<RankedEntry>,
    pub summary: RunSummary,
}

/// Run the full analysis.
///
/// Configuration problems are caught before any data is processed.
/// `progress` is advanced once per token during estimation.
pub fn run(
    config: &AnalysisConfig,
    inputs: &PipelineInputs<'_>,
    progress: &dyn ProgressObserver,
) -> Result<PipelineReport, PipelineError> {
    let started_at = Utc::now();
    config.validate()?;

    // Vocabulary and column subset
    let vocabulary = Vocabulary::select(inputs.lexicon, &config.categories)?;
    let mut exclusions: Vec<Exclusion> = subset::missing_from_matrix(inputs.matrix, &vocabulary)
        .into_iter()
        .map(|token| Exclusion {
            token,
            reason: ExclusionReason::NotInMatrix,
        })
        .collect();
    if !exclusions.is_empty() {
        warn!(
            missing = exclusions.len(),
            "Vocabulary tokens absent from the score matrix"
        );
    }
    let scores = subset::subset(inputs.matrix, &vocabulary);

    // Paired aggregation over in-scope posts only
    let posts = config.labels.filter_posts(inputs.posts);
    let table = paired::aggregate(&scores, &posts, &config.labels)?;

    // Effect sizes, optionally on a bounded worker pool
    let estimator_config = config.estimator_config();
    let outcome = match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| {
                    PipelineError::Configuration(format!("cannot start {threads} worker threads: {e}"))
                })?;
            pool.install(|| estimator::estimate(&table, &estimator_config, progress))?
        }
        None => estimator::estimate(&table, &estimator_config, progress)?,
    };
    exclusions.extend(outcome.exclusions);

    let entries = ranking::rank(&outcome.records, &vocabulary, config.top_n);

    let summary = RunSummary {
        started_at,
        seed: outcome.seed,
        vocabulary_size: vocabulary.union().len(),
        posts_in_scope: posts.len(),
        complete_users: table.n_users(),
        incomplete_users: table.incomplete_users,
        tokens_estimated: outcome.records.len(),
        undefined_estimates: outcome.records.iter().filter(|r| r.cohen_d.is_none()).count(),
        unavailable_intervals: outcome.records.iter().filter(|r| r.ci.is_none()).count(),
        exclusions,
    };

    info!(
        entries = entries.len(),
        estimated = summary.tokens_estimated,
        excluded = summary.exclusions.len(),
        seed = summary.seed,
        "Pipeline complete"
    );

    Ok(PipelineReport { entries, summary })
}
