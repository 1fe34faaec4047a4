// LIWC-style .dic lexicon reader.
//
// Layout:
//
//   %
//   1	insight
//   2	agency
//   %
//   notice	1
//   know	1	2
//
// The header maps numeric ids to category names; each body line lists a
// token followed by the ids of the categories it belongs to. Fields are
// tab-separated.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::CategoryMap;

/// Parse a .dic lexicon into category -> token set.
pub fn parse_dic(content: &str) -> Result<CategoryMap> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, "%")) => {}
        _ => anyhow::bail!("lexicon must start with a '%' line"),
    }

    let mut ids: HashMap<String, String> = HashMap::new();
    let mut map = CategoryMap::new();
    let mut in_header = true;

    for (line_no, line) in lines {
        if line == "%" {
            if !in_header {
                anyhow::bail!("line {line_no}: unexpected third '%' marker");
            }
            in_header = false;
            continue;
        }

        let mut fields = line.split('\t').map(str::trim).filter(|f| !f.is_empty());
        let Some(first) = fields.next() else { continue };

        if in_header {
            let name = fields
                .next()
                .with_context(|| format!("line {line_no}: category id '{first}' has no name"))?;
            ids.insert(first.to_string(), name.to_string());
            map.entry(name.to_string()).or_default();
        } else {
            for id in fields {
                let category = ids.get(id).with_context(|| {
                    format!("line {line_no}: token '{first}' references unknown category id '{id}'")
                })?;
                if let Some(members) = map.get_mut(category) {
                    members.insert(first.to_string());
                }
            }
        }
    }

    if in_header {
        anyhow::bail!("lexicon header is never closed with a second '%' line");
    }

    Ok(map)
}

/// Read and parse a .dic lexicon file.
pub fn load_dic(path: &Path) -> Result<CategoryMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read lexicon {}", path.display()))?;
    let map = parse_dic(&content)
        .with_context(|| format!("failed to parse lexicon {}", path.display()))?;
    info!(categories = map.len(), path = %path.display(), "Loaded lexicon");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "%\n1\tinsight\n2\tagency\n3\tunused\n%\nnotice\t1\nknow\t1\t2\ndecide\t2\n";

    #[test]
    fn test_parse_sample() {
        let map = parse_dic(SAMPLE).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["insight"].len(), 2);
        assert!(map["agency"].contains("know"));
        assert!(map["agency"].contains("decide"));
        assert!(map["unused"].is_empty());
    }

    #[test]
    fn test_unknown_category_id_fails() {
        let err = parse_dic("%\n1\tinsight\n%\nnotice\t9\n").unwrap_err();
        assert!(err.to_string().contains("unknown category id"), "got {err}");
    }

    #[test]
    fn test_multi_word_entries() {
        let map = parse_dic("%\n1\tinsight\n2\tsocial processes\n%\nkind of\t1\nnotice\t1 \t 2\n").unwrap();
        assert!(map["insight"].contains("kind of"), "got {:?}", map["insight"]);
        assert!(map["insight"].contains("notice"));
        assert!(map["social processes"].contains("notice"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_missing_header_fails() {
        assert!(parse_dic("notice\t1\n").is_err());
        assert!(parse_dic("%\n1\tinsight\nnotice\t1\n").is_err());
    }
}
