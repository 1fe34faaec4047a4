use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use dreamwords::config::{parse_category_list, AnalysisConfig, CiMethod};
use dreamwords::lexicon::vocabulary::Vocabulary;
use dreamwords::output::{terminal, tsv};
use dreamwords::pipeline::{self, PipelineInputs};

/// Dreamwords: which words separate lucid from non-lucid dream reports?
///
/// Ranks the tokens of selected lexicon categories by paired Cohen's d
/// (lucid minus non-lucid, one mean per user and condition), with
/// bootstrap confidence intervals.
#[derive(Parser)]
#[command(name = "dreamwords", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute effect sizes and export the top tokens per category
    Run(RunArgs),

    /// Show how much of each category's vocabulary the score matrix covers
    Vocab {
        /// Comma-separated categories (default: DREAMWORDS_CATEGORIES)
        #[arg(long)]
        categories: Option<String>,

        /// Lexicon .dic file
        #[arg(long)]
        dictionary: Option<PathBuf>,

        /// Score matrix JSON file
        #[arg(long)]
        scores: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Comma-separated categories to rank (default: insight,agency)
    #[arg(long)]
    categories: Option<String>,

    /// Tokens kept per category (default: 20)
    #[arg(long)]
    top_n: Option<usize>,

    /// Bootstrap resamples per token (default: 2000)
    #[arg(long)]
    n_boot: Option<usize>,

    /// Interval confidence level (default: 0.95)
    #[arg(long)]
    confidence: Option<f64>,

    /// Seed for reproducible intervals
    #[arg(long)]
    seed: Option<u64>,

    /// Interval method
    #[arg(long, value_enum)]
    ci_method: Option<CiMethod>,

    /// Worker threads for the bootstrap (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Posts table (TSV with post_id, user_id, lucidity)
    #[arg(long)]
    posts: Option<PathBuf>,

    /// Lexicon .dic file
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Score matrix JSON file
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Where to write the ranked TSV
    #[arg(long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    /// Layer CLI flags over the environment-derived configuration.
    fn apply(self, config: &mut AnalysisConfig) {
        if let Some(raw) = self.categories {
            config.categories = parse_category_list(&raw);
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if let Some(n_boot) = self.n_boot {
            config.n_boot = n_boot;
        }
        if let Some(confidence) = self.confidence {
            config.confidence = confidence;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(method) = self.ci_method {
            config.ci_method = method;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(path) = self.posts {
            config.posts_path = path;
        }
        if let Some(path) = self.dictionary {
            config.dictionary_path = path;
        }
        if let Some(path) = self.scores {
            config.scores_path = path;
        }
        if let Some(path) = self.output {
            config.output_path = path;
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dreamwords=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = AnalysisConfig::load()?;
            args.apply(&mut config);
            // Fail on bad options before reading any input
            config.validate()?;

            println!("Loading inputs...");
            let posts = dreamwords::posts::load_posts(&config.posts_path)?;
            let lexicon = dreamwords::lexicon::dic::load_dic(&config.dictionary_path)?;
            let matrix = dreamwords::matrix::sparse::load_matrix(&config.scores_path)?;
            println!(
                "  {} posts, {} lexicon categories, {} x {} score matrix",
                posts.len(),
                lexicon.len(),
                matrix.n_rows(),
                matrix.n_cols()
            );

            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Bootstrap [{bar:30}] {pos}/{len} tokens ({eta})")?,
            );

            let inputs = PipelineInputs {
                posts: &posts,
                lexicon: &lexicon,
                matrix: &matrix,
            };
            let report = pipeline::run(&config, &inputs, &pb)?;
            pb.finish_and_clear();

            tsv::export(&report.entries, &config.output_path)?;

            terminal::display_rankings(&report.entries, &config.labels.a, &config.labels.b);
            terminal::display_summary(&report.summary);
            println!(
                "\n{}",
                format!("Ranked tokens saved to: {}", config.output_path.display()).bold()
            );
        }

        Commands::Vocab {
            categories,
            dictionary,
            scores,
        } => {
            let mut config = AnalysisConfig::load()?;
            if let Some(raw) = categories {
                config.categories = parse_category_list(&raw);
            }
            if let Some(path) = dictionary {
                config.dictionary_path = path;
            }
            if let Some(path) = scores {
                config.scores_path = path;
            }

            let lexicon = dreamwords::lexicon::dic::load_dic(&config.dictionary_path)?;
            let vocabulary = Vocabulary::select(&lexicon, &config.categories)?;
            let matrix = dreamwords::matrix::sparse::load_matrix(&config.scores_path)?;

            let rows = dreamwords::matrix::subset::coverage(&matrix, &vocabulary);
            info!(categories = rows.len(), "Computed vocabulary coverage");
            terminal::display_vocabulary(&rows, matrix.n_cols());

            let missing = dreamwords::matrix::subset::missing_from_matrix(&matrix, &vocabulary);
            if !missing.is_empty() {
                let preview: Vec<&str> = missing.iter().take(10).map(|s| s.as_str()).collect();
                println!(
                    "  {} {} vocabulary tokens have no matrix column, e.g. {}",
                    "Warning:".yellow(),
                    missing.len(),
                    preview.join(", ").dimmed()
                );
            }
        }
    }

    Ok(())
}
