// Token score matrix — precomputed per-post token scores in CSR form.
//
// Rows are posts, columns are tokens. The on-disk form is a JSON document
// holding the CSR arrays plus the row and column keys:
//
//   { "post_id": [...], "token": [...],
//     "indptr": [...], "indices": [...], "data": [...] }

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Raw CSR arrays as serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrDocument {
    pub post_id: Vec<String>,
    pub token: Vec<String>,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

/// A validated sparse (post x token) score matrix.
#[derive(Debug, Clone)]
pub struct TokenScoreMatrix {
    post_ids: Vec<String>,
    tokens: Vec<String>,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl TokenScoreMatrix {
    /// Build a matrix from CSR arrays, checking every structural invariant.
    ///
    /// Repeated column indices within a row are allowed; they add up when
    /// the matrix is densified.
    pub fn from_csr(doc: CsrDocument) -> Result<Self> {
        let CsrDocument {
            post_id,
            token,
            indptr,
            indices,
            data,
        } = doc;

        if indptr.len() != post_id.len() + 1 {
            anyhow::bail!(
                "indptr has {} entries, expected rows + 1 = {}",
                indptr.len(),
                post_id.len() + 1
            );
        }
        if indptr.first() != Some(&0) {
            anyhow::bail!("indptr must start at 0");
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            anyhow::bail!("indptr must be non-decreasing");
        }
        if indices.len() != data.len() {
            anyhow::bail!(
                "indices ({}) and data ({}) differ in length",
                indices.len(),
                data.len()
            );
        }
        if indptr.last().copied() != Some(data.len()) {
            anyhow::bail!(
                "indptr ends at {:?} but there are {} stored values",
                indptr.last(),
                data.len()
            );
        }
        if let Some(bad) = indices.iter().find(|&&c| c >= token.len()) {
            anyhow::bail!("column index {bad} out of range for {} tokens", token.len());
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite() || **v < 0.0) {
            anyhow::bail!("score {bad} is not a finite non-negative value");
        }
        if let Some(dup) = first_duplicate(&post_id) {
            anyhow::bail!("duplicate post_id row key '{dup}'");
        }
        if let Some(dup) = first_duplicate(&token) {
            anyhow::bail!("duplicate token column key '{dup}'");
        }

        Ok(Self {
            post_ids: post_id,
            tokens: token,
            indptr,
            indices,
            data,
        })
    }

    /// Build a matrix from dense rows. Zeros are not stored.
    pub fn from_dense(post_ids: Vec<String>, tokens: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        if rows.len() != post_ids.len() {
            anyhow::bail!("{} rows given for {} post ids", rows.len(), post_ids.len());
        }
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != tokens.len() {
                anyhow::bail!("row {r} has {} values for {} tokens", row.len(), tokens.len());
            }
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(data.len());
        }
        Self::from_csr(CsrDocument {
            post_id: post_ids,
            token: tokens,
            indptr,
            indices,
            data,
        })
    }

    pub fn post_ids(&self) -> &[String] {
        &self.post_ids
    }

    /// Column keys, in the matrix's native order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn n_rows(&self) -> usize {
        self.post_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.tokens.len()
    }

    /// Stored (column, value) pairs of one row.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.indptr[r]..self.indptr[r + 1];
        self.indices[span.clone()]
            .iter()
            .copied()
            .zip(self.data[span].iter().copied())
    }
}

fn first_duplicate(keys: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .find(|k| !seen.insert(k.as_str()))
        .map(|k| k.as_str())
}

/// Load a JSON CSR document from disk.
pub fn load_matrix(path: &Path) -> Result<TokenScoreMatrix> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open score matrix {}", path.display()))?;
    let doc: CsrDocument = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse score matrix {}", path.display()))?;
    let matrix = TokenScoreMatrix::from_csr(doc)
        .with_context(|| format!("invalid score matrix {}", path.display()))?;
    info!(
        posts = matrix.n_rows(),
        tokens = matrix.n_cols(),
        stored = matrix.data.len(),
        "Loaded token score matrix"
    );
    Ok(matrix)
}
