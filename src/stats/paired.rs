// Paired aggregation — one mean per (user, condition, token).
//
// Posts are joined to their scores, averaged per user and condition, then
// aligned so every token has two equal-length vectors over the same users.
// Users who never posted under one of the conditions are dropped outright;
// nothing is imputed.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::matrix::subset::DenseScores;
use crate::posts::{Condition, ConditionLabels, Post};

/// Per-token paired vectors, aligned over `users`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedTable {
    /// Complete-case users, ascending
    pub users: Vec<String>,
    /// Token order of the subsetted score table
    pub tokens: Vec<String>,
    /// `a[token][user]`: mean score under condition A
    pub a: Vec<Vec<f64>>,
    /// `b[token][user]`: mean score under condition B
    pub b: Vec<Vec<f64>>,
    /// Users dropped for lacking one condition
    pub incomplete_users: usize,
}

impl PairedTable {
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Paired vectors for one token by position.
    pub fn pair(&self, token_idx: usize) -> (&[f64], &[f64]) {
        (&self.a[token_idx], &self.b[token_idx])
    }
}

/// Running per-token sums for one (user, condition) cell.
struct Accumulator {
    sums: Vec<f64>,
    count: usize,
}

impl Accumulator {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            count: 0,
        }
    }

    fn add(&mut self, row: &[f64]) {
        for (sum, value) in self.sums.iter_mut().zip(row) {
            *sum += value;
        }
        self.count += 1;
    }

    fn means(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.count as f64;
        self.sums.iter().map(move |s| s / n)
    }
}

/// Join, average, and align scores into paired vectors.
///
/// `posts` must already be restricted to the two paired labels. Every post
/// must match exactly one score row; anything else is a `JoinIntegrity`
/// error since it means the posts table and the matrix disagree.
pub fn aggregate(
    scores: &DenseScores,
    posts: &[Post],
    labels: &ConditionLabels,
) -> Result<PairedTable, PipelineError> {
    let row_of = scores.row_index();
    let width = scores.tokens.len();

    // Step 1: inner join by post id
    let mut joined: Vec<(&str, Condition, &[f64])> = Vec::with_capacity(posts.len());
    let mut seen_posts = std::collections::HashSet::with_capacity(posts.len());
    let mut unmatched = Vec::new();
    let mut duplicated = Vec::new();
    let mut distinct_joined = 0;
    for post in posts {
        let Some(condition) = labels.classify(&post.lucidity) else {
            return Err(PipelineError::Configuration(format!(
                "post {} has out-of-scope label '{}'; filter posts before aggregating",
                post.post_id, post.lucidity
            )));
        };
        let first_time = seen_posts.insert(post.post_id.as_str());
        if !first_time {
            duplicated.push(post.post_id.as_str());
        }
        match row_of.get(post.post_id.as_str()) {
            Some(&row) => {
                joined.push((post.user_id.as_str(), condition, scores.rows[row].as_slice()));
                if first_time {
                    distinct_joined += 1;
                }
            }
            None => unmatched.push(post.post_id.as_str()),
        }
    }

    if joined.len() != posts.len() || !duplicated.is_empty() {
        let mut detail = Vec::new();
        if !unmatched.is_empty() {
            detail.push(format!(
                "{} posts have no score row (first: {})",
                unmatched.len(),
                unmatched[0]
            ));
        }
        if !duplicated.is_empty() {
            detail.push(format!(
                "{} duplicate post ids (first: {})",
                duplicated.len(),
                duplicated[0]
            ));
        }
        return Err(PipelineError::JoinIntegrity {
            expected: posts.len(),
            joined: distinct_joined,
            detail: detail.join("; "),
        });
    }

    // Step 2: group by (user, condition) and accumulate
    let mut cells: BTreeMap<(&str, Condition), Accumulator> = BTreeMap::new();
    for (user, condition, row) in &joined {
        cells
            .entry((*user, *condition))
            .or_insert_with(|| Accumulator::new(width))
            .add(row);
    }

    // Step 3 + 4: align per user, keeping only users with both conditions
    let mut users_seen: Vec<&str> = cells.keys().map(|(u, _)| *u).collect();
    users_seen.dedup();

    let mut users = Vec::new();
    let mut a: Vec<Vec<f64>> = vec![Vec::new(); width];
    let mut b: Vec<Vec<f64>> = vec![Vec::new(); width];
    for user in &users_seen {
        let (Some(cell_a), Some(cell_b)) = (
            cells.get(&(*user, Condition::A)),
            cells.get(&(*user, Condition::B)),
        ) else {
            continue;
        };
        users.push(user.to_string());
        for (t, mean) in cell_a.means().enumerate() {
            a[t].push(mean);
        }
        for (t, mean) in cell_b.means().enumerate() {
            b[t].push(mean);
        }
    }

    let incomplete_users = users_seen.len() - users.len();
    if users.len() < 2 {
        warn!(
            complete = users.len(),
            "Fewer than two users have posts under both conditions"
        );
    }
    info!(
        posts = joined.len(),
        complete_users = users.len(),
        incomplete_users,
        tokens = width,
        "Aggregated paired observations"
    );

    Ok(PairedTable {
        users,
        tokens: scores.tokens.clone(),
        a,
        b,
        incomplete_users,
    })
}
