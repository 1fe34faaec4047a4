// Post attributes — who wrote each dream report and how it was labeled.
//
// Only the three columns the analysis needs are read from the posts table.
// Everything else in the file (titles, text, tags) is ignored.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// One dream report's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub post_id: String,
    pub user_id: String,
    pub lucidity: String,
}

impl Post {
    pub fn new(post_id: &str, user_id: &str, lucidity: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            lucidity: lucidity.to_string(),
        }
    }
}

/// The two paired conditions. `A - B` is the sign convention for effect sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Condition {
    A,
    B,
}

/// Which post labels map onto the paired conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLabels {
    pub a: String,
    pub b: String,
}

impl Default for ConditionLabels {
    fn default() -> Self {
        Self {
            a: "lucid".to_string(),
            b: "non-lucid".to_string(),
        }
    }
}

impl ConditionLabels {
    /// Map a post label onto a condition. Any other label is out of scope.
    pub fn classify(&self, label: &str) -> Option<Condition> {
        if label == self.a {
            Some(Condition::A)
        } else if label == self.b {
            Some(Condition::B)
        } else {
            None
        }
    }

    /// The same labels with the conditions swapped (flips every effect sign).
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b.clone(),
            b: self.a.clone(),
        }
    }

    /// Keep only posts labeled with one of the two paired conditions.
    pub fn filter_posts(&self, posts: &[Post]) -> Vec<Post> {
        let kept: Vec<Post> = posts
            .iter()
            .filter(|p| self.classify(&p.lucidity).is_some())
            .cloned()
            .collect();
        info!(
            total = posts.len(),
            kept = kept.len(),
            label_a = %self.a,
            label_b = %self.b,
            "Filtered posts to paired conditions"
        );
        kept
    }
}

/// Parse a tab-separated posts table with a header row.
///
/// Columns are located by name; `post_id`, `user_id` and `lucidity` must be
/// present. Blank lines are skipped.
pub fn parse_posts_tsv(content: &str) -> Result<Vec<Post>> {
    let mut lines = content.lines().enumerate();
    let (_, header) = lines.next().context("posts table is empty (no header row)")?;
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    let find = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| *c == name)
            .with_context(|| format!("posts table has no '{name}' column"))
    };
    let post_col = find("post_id")?;
    let user_col = find("user_id")?;
    let label_col = find("lucidity")?;

    let mut posts = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |idx: usize| -> Result<&str> {
            fields.get(idx).map(|f| f.trim()).with_context(|| {
                format!(
                    "posts table line {}: expected at least {} fields, found {}",
                    line_no + 1,
                    idx + 1,
                    fields.len()
                )
            })
        };
        posts.push(Post::new(field(post_col)?, field(user_col)?, field(label_col)?));
    }

    Ok(posts)
}

/// Load the posts table from disk.
pub fn load_posts(path: &Path) -> Result<Vec<Post>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read posts table {}", path.display()))?;
    let posts = parse_posts_tsv(&content)
        .with_context(|| format!("failed to parse posts table {}", path.display()))?;
    info!(posts = posts.len(), path = %path.display(), "Loaded post attributes");
    Ok(posts)
}
