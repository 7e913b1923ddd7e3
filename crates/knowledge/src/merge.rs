//! Result merger: deduplicates and rank-orders heterogeneous context items.

use crate::types::ContextItem;
use std::collections::HashSet;

/// Merge collections of context items.
///
/// Items are concatenated in call order. An item whose trimmed text was
/// already seen is dropped (the first occurrence wins, with its metadata), as
/// are items with empty trimmed text. The remainder is stably sorted by score
/// descending, so equal scores keep their input order.
///
/// Scores from different sources are compared as-is.
pub fn merge<I, C>(collections: I) -> Vec<ContextItem>
where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = ContextItem>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<ContextItem> = collections
        .into_iter()
        .flatten()
        .filter(|item| {
            let key = item.text.trim();
            !key.is_empty() && seen.insert(key.to_string())
        })
        .collect();

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));

    tracing::debug!("Merged context into {} unique items", merged.len());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceTag;

    fn kb(text: &str, score: f32, page: u32) -> ContextItem {
        ContextItem::from_document(text, score, "algebra.pdf", page)
    }

    fn web(text: &str, score: f32) -> ContextItem {
        ContextItem::from_web(text, score, "title", "https://example.org")
    }

    #[test]
    fn test_merge_sorts_by_score_descending() {
        let merged = merge([vec![kb("a", 0.2, 1), kb("b", 0.9, 2)], vec![web("c", 0.5)]]);
        let texts: Vec<&str> = merged.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_merge_dedup_keeps_first_occurrence() {
        let merged = merge([vec![kb("  same text ", 0.3, 7)], vec![web("same text", 0.8)]]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_tag(), SourceTag::KnowledgeBase);
        assert_eq!(merged[0].page_number(), Some(7));
        assert_eq!(merged[0].score, 0.3);
    }

    #[test]
    fn test_merge_equal_scores_keep_input_order() {
        let merged = merge([vec![kb("p1", 0.5, 1), kb("p2", 0.5, 2), kb("p3", 0.5, 3)]]);
        let pages: Vec<u32> = merged.iter().filter_map(|i| i.page_number()).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_drops_empty_text() {
        let merged = merge([vec![kb("", 0.9, 1), kb("   ", 0.8, 2), kb("x", 0.1, 3)]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "x");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = vec![kb("one", 0.4, 1), kb("two", 0.4, 2), kb("one", 0.9, 3)];
        let b = vec![web("three", 2.5), web("two ", 0.1), web("four", 0.4)];

        let once = merge([a, b]);
        let twice = merge([once.clone()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_never_emits_duplicate_trimmed_text() {
        let merged = merge([
            vec![kb("x", 0.1, 1), kb(" x", 0.2, 2)],
            vec![web("x ", 0.3), web("y", 0.3)],
        ]);

        let mut texts: Vec<&str> = merged.iter().map(|i| i.text.trim()).collect();
        let before = texts.len();
        texts.sort();
        texts.dedup();
        assert_eq!(before, texts.len());
    }

    #[test]
    fn test_merge_empty_inputs() {
        let merged = merge(Vec::<Vec<ContextItem>>::new());
        assert!(merged.is_empty());
    }
}
