// Vocabulary selection — narrow the full lexicon to the categories under study.
//
// The union vocabulary drives the matrix subsetting; the per-category sets
// drive the ranking. Categories that weren't asked for are never looked at.

use std::collections::BTreeSet;

use tracing::info;

use super::CategoryMap;
use crate::error::PipelineError;

/// The active vocabulary for one run.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// (category, members) in configured order
    categories: Vec<(String, BTreeSet<String>)>,
    union: BTreeSet<String>,
}

impl Vocabulary {
    /// Select the configured categories from the lexicon.
    ///
    /// Fails if no categories are requested, or if any requested category is
    /// missing from the lexicon or has no tokens.
    pub fn select(map: &CategoryMap, categories: &[String]) -> Result<Self, PipelineError> {
        if categories.is_empty() {
            return Err(PipelineError::Configuration(
                "no categories of interest configured".to_string(),
            ));
        }

        let mut selected: Vec<(String, BTreeSet<String>)> = Vec::with_capacity(categories.len());
        for category in categories {
            if selected.iter().any(|(name, _)| name == category) {
                continue;
            }
            let members = map.get(category).cloned().unwrap_or_default();
            if members.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "category '{category}' has no tokens in the lexicon"
                )));
            }
            selected.push((category.clone(), members));
        }

        let union: BTreeSet<String> = selected
            .iter()
            .flat_map(|(_, members)| members.iter().cloned())
            .collect();

        info!(
            categories = selected.len(),
            vocabulary = union.len(),
            "Selected vocabulary"
        );

        Ok(Self {
            categories: selected,
            union,
        })
    }

    /// All tokens across the selected categories.
    pub fn union(&self) -> &BTreeSet<String> {
        &self.union
    }

    /// Whether `token` is anywhere in the active vocabulary.
    pub fn contains_token(&self, token: &str) -> bool {
        self.union.contains(token)
    }

    /// Membership predicate for a single category. Unknown categories contain nothing.
    pub fn contains(&self, category: &str, token: &str) -> bool {
        self.members(category)
            .is_some_and(|members| members.contains(token))
    }

    pub fn members(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, members)| members)
    }

    /// Selected category names, in configured order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }
}
