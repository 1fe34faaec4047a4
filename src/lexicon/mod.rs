// Lexicon handling — category word lists and the active vocabulary.

pub mod dic;
pub mod vocabulary;

use std::collections::{BTreeMap, BTreeSet};

/// Category name -> the set of tokens belonging to it.
///
/// A token may appear under several categories.
pub type CategoryMap = BTreeMap<String, BTreeSet<String>>;
