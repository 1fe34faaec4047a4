use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::error::PipelineError;
use crate::posts::ConditionLabels;
use crate::stats::estimator::EstimatorConfig;

/// How the bootstrap interval is read off the resampled distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CiMethod {
    /// Plain percentile bootstrap: the α/2 and 1-α/2 quantiles.
    Percentile,
    /// Bias-corrected percentile: quantile levels shifted by the share of
    /// resampled statistics falling below the point estimate.
    BiasCorrected,
}

impl FromStr for CiMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentile" | "per" => Ok(CiMethod::Percentile),
            "bias-corrected" | "cper" => Ok(CiMethod::BiasCorrected),
            other => Err(format!(
                "unknown CI method '{other}' (expected 'percentile' or 'bias-corrected')"
            )),
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// A .env file is loaded at startup via dotenvy. CLI flags override
/// whatever is set here; `validate` runs after the overrides are applied.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Lexicon categories to analyze, in output order
    pub categories: Vec<String>,
    /// Tokens kept per category
    pub top_n: usize,
    /// Bootstrap resamples per token
    pub n_boot: usize,
    /// Two-sided interval confidence level, strictly between 0 and 1
    pub confidence: f64,
    /// Fixed seed for reproducible intervals. Drawn at random when unset.
    pub seed: Option<u64>,
    pub ci_method: CiMethod,
    /// Which post labels count as condition A and condition B
    pub labels: ConditionLabels,
    /// Minimum share of bootstrap draws that must produce a defined statistic
    pub min_valid_fraction: f64,
    /// Worker threads for the bootstrap stage (rayon default when unset)
    pub threads: Option<usize>,
    pub posts_path: PathBuf,
    pub dictionary_path: PathBuf,
    pub scores_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from("./data"))
    }
}

impl AnalysisConfig {
    /// Defaults with every input/output path rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let derivatives = data_dir.join("derivatives");
        Self {
            categories: vec!["insight".to_string(), "agency".to_string()],
            top_n: 20,
            n_boot: 2000,
            confidence: 0.95,
            seed: None,
            ci_method: CiMethod::Percentile,
            labels: ConditionLabels::default(),
            min_valid_fraction: 0.5,
            threads: None,
            posts_path: data_dir.join("dreamviews-posts.tsv"),
            dictionary_path: data_dir.join("dictionaries").join("custom.dic"),
            scores_path: derivatives.join("validate-liwc_wordscores.json"),
            output_path: derivatives.join("validate-liwc_wordscores-stats.tsv"),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults. A variable that is set but
    /// doesn't parse is an error rather than a silent default.
    pub fn load() -> Result<Self> {
        let data_dir = env::var("DREAMWORDS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let mut config = Self::with_data_dir(data_dir);

        if let Ok(raw) = env::var("DREAMWORDS_CATEGORIES") {
            config.categories = parse_category_list(&raw);
        }
        if let Some(top_n) = parse_env("DREAMWORDS_TOP_N")? {
            config.top_n = top_n;
        }
        if let Some(n_boot) = parse_env("DREAMWORDS_N_BOOT")? {
            config.n_boot = n_boot;
        }
        if let Some(confidence) = parse_env("DREAMWORDS_CONFIDENCE")? {
            config.confidence = confidence;
        }
        config.seed = parse_env("DREAMWORDS_SEED")?;
        if let Ok(raw) = env::var("DREAMWORDS_CI_METHOD") {
            config.ci_method = raw
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("DREAMWORDS_CI_METHOD")?;
        }
        if let Ok(label) = env::var("DREAMWORDS_LABEL_A") {
            config.labels.a = label;
        }
        if let Ok(label) = env::var("DREAMWORDS_LABEL_B") {
            config.labels.b = label;
        }
        if let Some(fraction) = parse_env("DREAMWORDS_MIN_VALID_FRACTION")? {
            config.min_valid_fraction = fraction;
        }
        config.threads = parse_env("DREAMWORDS_THREADS")?;

        Ok(config)
    }

    /// Check every option before any data is touched.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.categories.is_empty() {
            return Err(PipelineError::Configuration(
                "no categories of interest configured".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(PipelineError::Configuration(
                "top-N must be at least 1".to_string(),
            ));
        }
        if self.labels.a == self.labels.b {
            return Err(PipelineError::Configuration(format!(
                "condition labels must differ (both are '{}')",
                self.labels.a
            )));
        }
        self.estimator_config().validate()
    }

    /// The slice of configuration the effect size estimator needs.
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            n_boot: self.n_boot,
            confidence: self.confidence,
            method: self.ci_method,
            seed: self.seed,
            min_valid_fraction: self.min_valid_fraction,
        }
    }
}

/// Split a comma-separated category list, dropping blanks.
pub fn parse_category_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key}='{raw}' is invalid: {e}")),
        _ => Ok(None),
    }
}
