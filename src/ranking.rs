// Category ranking — top-N tokens per category by effect size magnitude.
//
// Ranking is by |d| only, with no preference for direction. Tokens with an
// undefined d sort after every defined one. Ties are broken by token so the
// output is stable across runs.

use std::cmp::Ordering;

use tracing::info;

use crate::lexicon::vocabulary::Vocabulary;
use crate::stats::estimator::EffectSizeRecord;

/// One token's position within one category.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub category: String,
    /// 1 = largest |d| in the category
    pub rank: usize,
    pub token: String,
    pub n_users: usize,
    pub cohen_d: Option<f64>,
    pub ci: Option<(f64, f64)>,
}

/// Ordering: larger |d| first, undefined last, then token ascending.
fn by_magnitude(a: &EffectSizeRecord, b: &EffectSizeRecord) -> Ordering {
    let magnitude = match (a.cohen_d, b.cohen_d) {
        (Some(x), Some(y)) => y.abs().total_cmp(&x.abs()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    magnitude.then_with(|| a.token.cmp(&b.token))
}

/// Rank a single category's tokens and keep the first `top_n`.
pub fn rank_category(
    category: &str,
    records: &[EffectSizeRecord],
    vocabulary: &Vocabulary,
    top_n: usize,
) -> Vec<RankedEntry> {
    let mut eligible: Vec<&EffectSizeRecord> = records
        .iter()
        .filter(|r| vocabulary.contains(category, &r.token))
        .collect();
    eligible.sort_by(|a, b| by_magnitude(a, b));

    let ranked: Vec<RankedEntry> = eligible
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, r)| RankedEntry {
            category: category.to_string(),
            rank: i + 1,
            token: r.token.clone(),
            n_users: r.n_users,
            cohen_d: r.cohen_d,
            ci: r.ci,
        })
        .collect();

    info!(
        category,
        ranked = ranked.len(),
        top = ranked.first().map(|e| e.token.as_str()).unwrap_or("-"),
        "Ranked category"
    );

    ranked
}

/// Rank every selected category, concatenated in configured category order.
///
/// A token in several categories gets an independent entry in each.
pub fn rank(records: &[EffectSizeRecord], vocabulary: &Vocabulary, top_n: usize) -> Vec<RankedEntry> {
    vocabulary
        .categories()
        .flat_map(|category| rank_category(category, records, vocabulary, top_n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::CategoryMap;

    fn record(token: &str, d: Option<f64>) -> EffectSizeRecord {
        EffectSizeRecord {
            token: token.to_string(),
            n_users: 10,
            cohen_d: d,
            ci: d.map(|v| (v - 0.1, v + 0.1)),
            valid_resamples: 2000,
        }
    }

    fn vocab() -> Vocabulary {
        let mut map = CategoryMap::new();
        map.insert(
            "insight".to_string(),
            ["notice", "realize", "know", "think"].iter().map(|s| s.to_string()).collect(),
        );
        map.insert(
            "agency".to_string(),
            ["decide", "know"].iter().map(|s| s.to_string()).collect(),
        );
        Vocabulary::select(&map, &["insight".to_string(), "agency".to_string()]).unwrap()
    }

    #[test]
    fn test_sorts_by_absolute_value() {
        let records = vec![
            record("notice", Some(0.2)),
            record("realize", Some(-0.5)),
            record("think", Some(0.3)),
        ];
        let ranked = rank_category("insight", &records, &vocab(), 20);
        let order: Vec<&str> = ranked.iter().map(|e| e.token.as_str()).collect();
        assert_eq!(order, vec!["realize", "think", "notice"]);
        let ranks: Vec<usize> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_break_by_token() {
        let records = vec![record("think", Some(0.4)), record("notice", Some(-0.4))];
        let ranked = rank_category("insight", &records, &vocab(), 20);
        assert_eq!(ranked[0].token, "notice");
        assert_eq!(ranked[1].token, "think");
    }

    #[test]
    fn test_undefined_sorts_last() {
        let records = vec![record("notice", None), record("think", Some(0.01))];
        let ranked = rank_category("insight", &records, &vocab(), 20);
        assert_eq!(ranked[0].token, "think");
        assert_eq!(ranked[1].token, "notice");
        assert_eq!(ranked[1].cohen_d, None);
    }

    #[test]
    fn test_top_n_truncates() {
        let records = vec![
            record("notice", Some(0.2)),
            record("realize", Some(-0.5)),
            record("think", Some(0.3)),
        ];
        let ranked = rank_category("insight", &records, &vocab(), 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].token, "realize");
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_shared_token_ranked_in_each_category() {
        let records = vec![
            record("know", Some(0.9)),
            record("decide", Some(0.1)),
            record("notice", Some(0.5)),
        ];
        let ranked = rank(&records, &vocab(), 20);
        let know: Vec<(&str, usize)> = ranked
            .iter()
            .filter(|e| e.token == "know")
            .map(|e| (e.category.as_str(), e.rank))
            .collect();
        assert_eq!(know, vec![("insight", 1), ("agency", 1)]);
        assert_eq!(ranked.len(), 4);
    }

    #[test]
    fn test_records_outside_category_ignored() {
        let records = vec![record("elsewhere", Some(3.0)), record("decide", Some(0.1))];
        let ranked = rank_category("agency", &records, &vocab(), 20);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].token, "decide");
    }
}
