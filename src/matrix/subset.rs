// Column subsetting — keep only the vocabulary's columns, densified.
//
// The full matrix can hold tens of thousands of tokens; the analysis needs a
// few hundred. Build the list of wanted column indices once, then gather
// those columns row by row.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use super::sparse::TokenScoreMatrix;
use crate::lexicon::vocabulary::Vocabulary;

/// Dense (post x token) table restricted to vocabulary columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseScores {
    pub post_ids: Vec<String>,
    /// Column keys in the source matrix's native order
    pub tokens: Vec<String>,
    /// Row-major: `rows[post][token]`
    pub rows: Vec<Vec<f64>>,
}

impl DenseScores {
    /// Position of each post id, for joining.
    pub fn row_index(&self) -> HashMap<&str, usize> {
        self.post_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }
}

/// Gather the vocabulary's columns from the matrix.
///
/// Column order follows the matrix, not the vocabulary. Every row is kept,
/// including rows whose vocabulary scores are all zero. Repeated entries for
/// the same cell are summed.
pub fn subset(matrix: &TokenScoreMatrix, vocabulary: &Vocabulary) -> DenseScores {
    let keep: Vec<usize> = matrix
        .tokens()
        .iter()
        .enumerate()
        .filter(|(_, t)| vocabulary.contains_token(t))
        .map(|(i, _)| i)
        .collect();

    // source column -> dense column
    let mut remap = vec![None; matrix.n_cols()];
    for (dense, &source) in keep.iter().enumerate() {
        remap[source] = Some(dense);
    }

    let rows: Vec<Vec<f64>> = (0..matrix.n_rows())
        .map(|r| {
            let mut row = vec![0.0; keep.len()];
            for (col, value) in matrix.row(r) {
                if let Some(dense) = remap[col] {
                    row[dense] += value;
                }
            }
            row
        })
        .collect();

    info!(
        posts = rows.len(),
        kept_tokens = keep.len(),
        total_tokens = matrix.n_cols(),
        "Subset score matrix to vocabulary"
    );

    DenseScores {
        post_ids: matrix.post_ids().to_vec(),
        tokens: keep.iter().map(|&i| matrix.tokens()[i].clone()).collect(),
        rows,
    }
}

/// Vocabulary tokens the matrix has no column for.
pub fn missing_from_matrix(matrix: &TokenScoreMatrix, vocabulary: &Vocabulary) -> Vec<String> {
    let present: BTreeSet<&str> = matrix.tokens().iter().map(|t| t.as_str()).collect();
    vocabulary
        .union()
        .iter()
        .filter(|t| !present.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Per category: (name, vocabulary tokens, tokens with a matrix column).
pub fn coverage(matrix: &TokenScoreMatrix, vocabulary: &Vocabulary) -> Vec<(String, usize, usize)> {
    let present: BTreeSet<&str> = matrix.tokens().iter().map(|t| t.as_str()).collect();
    vocabulary
        .categories()
        .map(|category| {
            let members = vocabulary.members(category).map(|m| m.len()).unwrap_or(0);
            let covered = vocabulary
                .members(category)
                .map(|m| m.iter().filter(|t| present.contains(t.as_str())).count())
                .unwrap_or(0);
            (category.to_string(), members, covered)
        })
        .collect()
}
