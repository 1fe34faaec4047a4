// Pipeline error taxonomy.
//
// Fatal errors abort the run before anything is exported. Per-token problems
// are not errors at all: they become `Exclusion`s that are counted in the
// run summary while the remaining tokens carry on.

use std::fmt;

use thiserror::Error;

/// Fatal errors raised by the analysis core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// A requested category has no tokens, or an option is out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Joining scores to post attributes dropped or duplicated rows.
    #[error("join integrity error: expected {expected} rows, joined {joined} ({detail})")]
    JoinIntegrity {
        expected: usize,
        joined: usize,
        detail: String,
    },
}

/// Why a token was left out of the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExclusionReason {
    /// Fewer than two users have both conditions for this token.
    InsufficientData { users: usize },
    /// The token is in the vocabulary but the score matrix has no column for it.
    NotInMatrix,
}

impl ExclusionReason {
    /// Short label used to group exclusions in the run summary.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::InsufficientData { .. } => "insufficient data",
            ExclusionReason::NotInMatrix => "not in score matrix",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::InsufficientData { users } => {
                write!(f, "insufficient data ({users} paired users, need 2)")
            }
            ExclusionReason::NotInMatrix => write!(f, "not in score matrix"),
        }
    }
}

/// A token that was dropped from ranking, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub token: String,
    pub reason: ExclusionReason,
}
