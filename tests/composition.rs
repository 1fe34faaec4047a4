// Composition tests — the full pipeline from in-memory inputs to ranked rows.
//
// These tests exercise the data flow between modules:
//   Vocabulary -> Subset -> Paired aggregation -> Estimation -> Ranking -> TSV
// without touching the filesystem except for export checks (written to the
// system temp dir).

use std::collections::BTreeSet;

use dreamwords::config::AnalysisConfig;
use dreamwords::error::{ExclusionReason, PipelineError};
use dreamwords::lexicon::CategoryMap;
use dreamwords::matrix::sparse::TokenScoreMatrix;
use dreamwords::output::tsv;
use dreamwords::pipeline::{self, PipelineInputs, PipelineReport};
use dreamwords::posts::Post;
use dreamwords::stats::estimator::{NoProgress, ProgressCounter};

fn lexicon(entries: &[(&str, &[&str])]) -> CategoryMap {
    entries
        .iter()
        .map(|(cat, tokens)| {
            (
                cat.to_string(),
                tokens.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            )
        })
        .collect()
}

fn config(categories: &[&str], seed: u64) -> AnalysisConfig {
    AnalysisConfig {
        categories: categories.iter().map(|s| s.to_string()).collect(),
        n_boot: 400,
        seed: Some(seed),
        ..AnalysisConfig::default()
    }
}

/// A synthetic corpus: `users` users, each with two lucid and one non-lucid
/// post, scored on `tokens`. Token `k` shifts lucid scores by roughly `k/4`.
struct Corpus {
    posts: Vec<Post>,
    matrix: TokenScoreMatrix,
}

fn corpus(users: usize, tokens: &[&str]) -> Corpus {
    let mut posts = Vec::new();
    let mut post_ids = Vec::new();
    let mut rows = Vec::new();
    for u in 0..users {
        for (p, label) in ["lucid", "lucid", "non-lucid"].iter().enumerate() {
            let id = format!("u{u}-p{p}");
            posts.push(Post::new(&id, &format!("user{u:02}"), label));
            post_ids.push(id);
            let row: Vec<f64> = (0..tokens.len())
                .map(|k| {
                    let noise = ((u * 7 + p * 3 + k * 5) % 11) as f64 / 10.0;
                    let shift = if *label == "lucid" { k as f64 / 4.0 } else { 0.0 };
                    1.0 + noise + shift
                })
                .collect();
            rows.push(row);
        }
    }
    let matrix = TokenScoreMatrix::from_dense(
        post_ids,
        tokens.iter().map(|t| t.to_string()).collect(),
        &rows,
    )
    .unwrap();
    Corpus { posts, matrix }
}

fn run(config: &AnalysisConfig, lexicon: &CategoryMap, corpus: &Corpus) -> PipelineReport {
    let inputs = PipelineInputs {
        posts: &corpus.posts,
        lexicon,
        matrix: &corpus.matrix,
    };
    pipeline::run(config, &inputs, &NoProgress).unwrap()
}

// ============================================================
// Worked scenarios
// ============================================================

#[test]
fn two_user_scenario_ranks_single_token_first() {
    let lex = lexicon(&[("insight", &["notice", "realize"])]);
    let matrix = TokenScoreMatrix::from_dense(
        vec!["a1".into(), "a2".into(), "b1".into(), "b2".into()],
        vec!["notice".into()],
        &[vec![3.0], vec![1.0], vec![2.0], vec![2.0]],
    )
    .unwrap();
    let posts = vec![
        Post::new("a1", "A", "lucid"),
        Post::new("a2", "A", "non-lucid"),
        Post::new("b1", "B", "lucid"),
        Post::new("b2", "B", "non-lucid"),
    ];
    let cfg = AnalysisConfig {
        n_boot: 2000,
        min_valid_fraction: 0.25,
        ..config(&["insight"], 5)
    };
    let inputs = PipelineInputs {
        posts: &posts,
        lexicon: &lex,
        matrix: &matrix,
    };
    let report = pipeline::run(&cfg, &inputs, &NoProgress).unwrap();

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.token, "notice");
    assert_eq!(entry.rank, 1);
    let d = entry.cohen_d.unwrap();
    assert!((d - 0.7071).abs() < 1e-4, "expected 1/sqrt(2), got {d}");
    // Every valid resample of [2, 0] is [2, 0] or [0, 2], so d never moves.
    assert_eq!(entry.ci, Some((0.7071, 0.7071)));

    // "realize" has no matrix column
    assert_eq!(report.summary.exclusions.len(), 1);
    assert_eq!(report.summary.exclusions[0].token, "realize");
    assert_eq!(report.summary.exclusions[0].reason, ExclusionReason::NotInMatrix);
}

#[test]
fn no_complete_users_excludes_every_token() {
    let lex = lexicon(&[("insight", &["notice"])]);
    let matrix = TokenScoreMatrix::from_dense(
        vec!["a1".into(), "b1".into()],
        vec!["notice".into()],
        &[vec![3.0], vec![1.0]],
    )
    .unwrap();
    // each user only has one condition
    let posts = vec![Post::new("a1", "A", "lucid"), Post::new("b1", "B", "non-lucid")];
    let inputs = PipelineInputs {
        posts: &posts,
        lexicon: &lex,
        matrix: &matrix,
    };
    let report = pipeline::run(&config(&["insight"], 1), &inputs, &NoProgress).unwrap();

    assert!(report.entries.is_empty());
    assert_eq!(report.summary.complete_users, 0);
    assert_eq!(report.summary.incomplete_users, 2);
    assert_eq!(
        report.summary.exclusions[0].reason,
        ExclusionReason::InsufficientData { users: 0 }
    );

    let path = std::env::temp_dir().join(format!(
        "dreamwords-empty-export-{}.tsv",
        std::process::id()
    ));
    tsv::export(&report.entries, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1, "only the header should be written");
    assert!(!text.contains("notice"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn top_one_keeps_largest_magnitude() {
    let tokens = ["t0", "t1", "t2", "t3", "t4"];
    let lex = lexicon(&[("insight", &tokens)]);
    let data = corpus(20, &tokens);
    let report = run(
        &AnalysisConfig {
            top_n: 1,
            ..config(&["insight"], 3)
        },
        &lex,
        &data,
    );

    assert_eq!(report.entries.len(), 1);
    let full = run(&config(&["insight"], 3), &lex, &data);
    let max = full
        .entries
        .iter()
        .filter_map(|e| e.cohen_d.map(f64::abs))
        .fold(0.0_f64, f64::max);
    assert_eq!(report.entries[0].cohen_d.map(f64::abs), Some(max));
    assert_eq!(report.entries[0].rank, 1);
}

// ============================================================
// Properties
// ============================================================

#[test]
fn swapping_conditions_flips_every_sign() {
    let tokens = ["notice", "realize", "decide", "control"];
    let lex = lexicon(&[("insight", &["notice", "realize"]), ("agency", &["decide", "control"])]);
    let data = corpus(15, &tokens);

    let forward_cfg = config(&["insight", "agency"], 21);
    let mut reverse_cfg = forward_cfg.clone();
    reverse_cfg.labels = forward_cfg.labels.swapped();

    let forward = run(&forward_cfg, &lex, &data);
    let reverse = run(&reverse_cfg, &lex, &data);

    assert_eq!(forward.entries.len(), reverse.entries.len());
    for (f, r) in forward.entries.iter().zip(&reverse.entries) {
        assert_eq!(f.token, r.token, "magnitude order must not change");
        assert_eq!(f.cohen_d.map(|d| -d), r.cohen_d);
        assert_eq!(f.ci.map(|(lo, hi)| (-hi, -lo)), r.ci, "token {}", f.token);
    }
}

#[test]
fn ranks_are_a_permutation_per_category() {
    let tokens = ["a", "b", "c", "d", "e", "f", "g"];
    let lex = lexicon(&[("insight", &["a", "b", "c", "d"]), ("agency", &["c", "d", "e", "f", "g"])]);
    let data = corpus(12, &tokens);
    let report = run(
        &AnalysisConfig {
            top_n: 3,
            ..config(&["insight", "agency"], 8)
        },
        &lex,
        &data,
    );

    for category in ["insight", "agency"] {
        let mut ranks: Vec<usize> = report
            .entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.rank)
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3], "category {category}");
    }
    // shared tokens may appear once per category, never twice within one
    let insight_c = report
        .entries
        .iter()
        .filter(|e| e.category == "insight" && e.token == "c")
        .count();
    assert!(insight_c <= 1);
}

#[test]
fn fixed_seed_reproduces_entries() {
    let tokens = ["notice", "realize", "know"];
    let lex = lexicon(&[("insight", &tokens)]);
    let data = corpus(10, &tokens);
    let first = run(&config(&["insight"], 99), &lex, &data);
    let second = run(&config(&["insight"], 99), &lex, &data);
    assert_eq!(first.entries, second.entries);
}

#[test]
fn thread_count_does_not_change_results() {
    let tokens = ["notice", "realize", "know", "think", "sense"];
    let lex = lexicon(&[("insight", &tokens)]);
    let data = corpus(10, &tokens);
    let single = run(
        &AnalysisConfig {
            threads: Some(1),
            ..config(&["insight"], 4)
        },
        &lex,
        &data,
    );
    let many = run(
        &AnalysisConfig {
            threads: Some(4),
            ..config(&["insight"], 4)
        },
        &lex,
        &data,
    );
    assert_eq!(single.entries, many.entries);
}

#[test]
fn intervals_are_ordered() {
    let tokens = ["t1", "t2", "t3"];
    let lex = lexicon(&[("insight", &tokens)]);
    let report = run(&config(&["insight"], 17), &lex, &corpus(25, &tokens));
    assert_eq!(report.entries.len(), 3);
    for entry in &report.entries {
        let (lo, hi) = entry.ci.expect("25 users give plenty of valid resamples");
        assert!(lo <= hi, "{}: [{lo}, {hi}]", entry.token);
        assert_eq!(entry.n_users, 25);
    }
}

#[test]
fn progress_reaches_token_count() {
    let tokens = ["notice", "realize", "know"];
    let lex = lexicon(&[("insight", &tokens)]);
    let data = corpus(6, &tokens);
    let counter = ProgressCounter::default();
    let inputs = PipelineInputs {
        posts: &data.posts,
        lexicon: &lex,
        matrix: &data.matrix,
    };
    pipeline::run(&config(&["insight"], 2), &inputs, &counter).unwrap();
    assert_eq!(counter.get(), 3);
}

// ============================================================
// Fatal errors
// ============================================================

#[test]
fn post_without_score_row_is_fatal() {
    let tokens = ["notice"];
    let lex = lexicon(&[("insight", &tokens)]);
    let mut data = corpus(4, &tokens);
    data.posts.push(Post::new("orphan", "user00", "lucid"));
    let inputs = PipelineInputs {
        posts: &data.posts,
        lexicon: &lex,
        matrix: &data.matrix,
    };
    let err = pipeline::run(&config(&["insight"], 1), &inputs, &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::JoinIntegrity { .. }), "got {err:?}");
}

#[test]
fn out_of_scope_posts_are_ignored_not_fatal() {
    let tokens = ["notice"];
    let lex = lexicon(&[("insight", &tokens)]);
    let mut data = corpus(4, &tokens);
    // labeled "nightmare" and absent from the matrix: filtered before the join
    data.posts.push(Post::new("nm", "user00", "nightmare"));
    let report = run(&config(&["insight"], 1), &lex, &data);
    assert_eq!(report.summary.posts_in_scope, 12);
}

#[test]
fn empty_category_is_fatal() {
    let tokens = ["notice"];
    let lex = lexicon(&[("insight", &tokens), ("agency", &[])]);
    let data = corpus(4, &tokens);
    let inputs = PipelineInputs {
        posts: &data.posts,
        lexicon: &lex,
        matrix: &data.matrix,
    };
    let err = pipeline::run(&config(&["insight", "agency"], 1), &inputs, &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}
