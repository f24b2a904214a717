// src/ingest/rank.rs
use std::collections::HashSet;

use crate::ingest::types::ScoredItem;

/// Default number of items a connector keeps.
pub const DEFAULT_TOP_N: usize = 30;

/// Keep the first instance of every id, preserving input order.
pub fn dedup_by_id(items: Vec<ScoredItem>) -> Vec<ScoredItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(it.metric.id.clone()))
        .collect()
}

/// Dedup, stable sort by score descending, truncate to `top_n`.
/// Equal scores keep their relative input order.
pub fn dedup_and_rank(items: Vec<ScoredItem>, top_n: usize) -> Vec<ScoredItem> {
    let mut out = dedup_by_id(items);
    // `sort_by` is stable.
    out.sort_by(|a, b| b.virality_score.cmp(&a.virality_score));
    out.truncate(top_n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Platform, RawMetric};
    use chrono::Utc;

    fn item(id: &str, score: u8) -> ScoredItem {
        ScoredItem {
            metric: RawMetric {
                id: id.into(),
                platform: Platform::Youtube,
                title: format!("video {id}"),
                text: String::new(),
                author: "chan".into(),
                community: None,
                url: format!("https://youtube.com/watch?v={id}"),
                thumbnail: None,
                published_at: Utc::now(),
                primary: 0,
                secondary: 0,
                tertiary: 0,
                audience: None,
                upvote_ratio: None,
            },
            hours_old: 0.0,
            velocity: 0.0,
            virality_score: score,
        }
    }

    fn ids(items: &[ScoredItem]) -> Vec<&str> {
        items.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn first_seen_duplicate_wins() {
        let out = dedup_by_id(vec![item("a", 10), item("b", 20), item("a", 90)]);
        assert_eq!(ids(&out), vec!["a", "b"]);
        assert_eq!(out[0].virality_score, 10);
    }

    #[test]
    fn ties_keep_input_order() {
        let out = dedup_and_rank(
            vec![item("a", 50), item("b", 70), item("c", 50), item("d", 70)],
            DEFAULT_TOP_N,
        );
        assert_eq!(ids(&out), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn truncates_to_top_n() {
        let items = (0..40).map(|i| item(&i.to_string(), (i % 100) as u8)).collect();
        let out = dedup_and_rank(items, DEFAULT_TOP_N);
        assert_eq!(out.len(), 30);
        assert_eq!(out[0].id(), "39");
    }
}
