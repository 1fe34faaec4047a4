// Per-token effect size estimation, parallel across tokens.
//
// Each token owns one output slot and one RNG seeded from the run seed plus
// the token's position, so results don't depend on thread count or
// scheduling. The ordered parallel collect is the only merge step.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use super::effect_size::{bootstrap_interval, paired_differences, standardized_mean, BootstrapSpec};
use super::paired::PairedTable;
use crate::config::CiMethod;
use crate::error::{Exclusion, ExclusionReason, PipelineError};

/// Minimum paired users for an effect size to be defined.
pub const MIN_PAIRED_USERS: usize = 2;

/// Settings for the estimation stage.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub n_boot: usize,
    pub confidence: f64,
    pub method: CiMethod,
    /// Run seed. `None` draws one from OS entropy (and logs it).
    pub seed: Option<u64>,
    /// Share of `n_boot` draws that must be valid for an interval to be reported
    pub min_valid_fraction: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            n_boot: 2000,
            confidence: 0.95,
            method: CiMethod::Percentile,
            seed: None,
            min_valid_fraction: 0.5,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.n_boot == 0 {
            return Err(PipelineError::Configuration(
                "bootstrap resample count must be at least 1".to_string(),
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(PipelineError::Configuration(format!(
                "confidence level {} must be strictly between 0 and 1",
                self.confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.min_valid_fraction) {
            return Err(PipelineError::Configuration(format!(
                "minimum valid resample fraction {} must be within [0, 1]",
                self.min_valid_fraction
            )));
        }
        Ok(())
    }

    fn bootstrap_spec(&self) -> BootstrapSpec {
        BootstrapSpec {
            n_boot: self.n_boot,
            confidence: self.confidence,
            method: self.method,
            min_valid: (self.min_valid_fraction * self.n_boot as f64).ceil() as usize,
        }
    }
}

/// Point estimate and interval for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSizeRecord {
    pub token: String,
    /// Complete-case users behind the estimate
    pub n_users: usize,
    /// Paired Cohen's d; `None` when the differences have no spread
    pub cohen_d: Option<f64>,
    /// Bootstrap (low, high), 4 decimals; `None` when too few draws were valid
    pub ci: Option<(f64, f64)>,
    pub valid_resamples: usize,
}

/// Everything the estimation stage produced.
#[derive(Debug, Clone)]
pub struct EstimateOutcome {
    /// Records in the paired table's token order
    pub records: Vec<EffectSizeRecord>,
    pub exclusions: Vec<Exclusion>,
    /// The seed actually used, for replaying the run
    pub seed: u64,
}

/// Receives a tick each time a token finishes. Called from worker threads.
pub trait ProgressObserver: Sync {
    /// Called once with the number of tokens about to be processed.
    fn start(&self, _total: u64) {}

    fn advance(&self, tokens: u64);
}

/// Ignores progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn advance(&self, _tokens: u64) {}
}

impl ProgressObserver for indicatif::ProgressBar {
    fn start(&self, total: u64) {
        self.set_length(total);
        self.set_position(0);
    }

    fn advance(&self, tokens: u64) {
        self.inc(tokens);
    }
}

/// Counts finished tokens. Useful for polling from another thread.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicUsize);

impl ProgressCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl ProgressObserver for ProgressCounter {
    fn advance(&self, tokens: u64) {
        self.0.fetch_add(tokens as usize, Ordering::Relaxed);
    }
}

enum TokenOutcome {
    Estimated(EffectSizeRecord),
    Excluded(Exclusion),
}

/// Estimate every token in the paired table.
///
/// Runs on the current rayon pool; wrap in `ThreadPool::install` to bound
/// the worker count.
pub fn estimate(
    table: &PairedTable,
    config: &EstimatorConfig,
    progress: &dyn ProgressObserver,
) -> Result<EstimateOutcome, PipelineError> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let spec = config.bootstrap_spec();

    info!(
        tokens = table.tokens.len(),
        users = table.n_users(),
        n_boot = spec.n_boot,
        confidence = spec.confidence,
        method = ?spec.method,
        seed,
        "Estimating paired effect sizes"
    );

    progress.start(table.tokens.len() as u64);
    let outcomes: Vec<TokenOutcome> = (0..table.tokens.len())
        .into_par_iter()
        .map(|t| {
            let outcome = estimate_token(table, t, &spec, seed);
            progress.advance(1);
            outcome
        })
        .collect();

    let mut records = Vec::with_capacity(outcomes.len());
    let mut exclusions = Vec::new();
    for outcome in outcomes {
        match outcome {
            TokenOutcome::Estimated(record) => records.push(record),
            TokenOutcome::Excluded(exclusion) => exclusions.push(exclusion),
        }
    }

    info!(
        estimated = records.len(),
        excluded = exclusions.len(),
        "Effect size estimation complete"
    );

    Ok(EstimateOutcome {
        records,
        exclusions,
        seed,
    })
}

fn estimate_token(table: &PairedTable, t: usize, spec: &BootstrapSpec, seed: u64) -> TokenOutcome {
    let token = &table.tokens[t];
    let (a, b) = table.pair(t);

    if a.len() < MIN_PAIRED_USERS {
        return TokenOutcome::Excluded(Exclusion {
            token: token.clone(),
            reason: ExclusionReason::InsufficientData { users: a.len() },
        });
    }

    let diffs = paired_differences(a, b);
    let cohen_d = standardized_mean(&diffs);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
    let interval = bootstrap_interval(&diffs, cohen_d, spec, &mut rng);

    if interval.bounds.is_none() {
        debug!(
            token = %token,
            valid = interval.valid,
            required = spec.min_valid,
            "Interval unavailable"
        );
    }

    TokenOutcome::Estimated(EffectSizeRecord {
        token: token.clone(),
        n_users: a.len(),
        cohen_d,
        ci: interval.bounds,
        valid_resamples: interval.valid,
    })
}
