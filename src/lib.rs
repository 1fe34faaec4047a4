// Dreamwords: word-level lucid vs non-lucid effect sizes
//
// This is the library root. Each module corresponds to one stage of the
// analysis pipeline or one of its inputs/outputs.

pub mod config;
pub mod error;
pub mod lexicon;
pub mod matrix;
pub mod output;
pub mod pipeline;
pub mod posts;
pub mod ranking;
pub mod stats;
