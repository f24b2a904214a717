// tests/rank_dedup.rs
mod common;

use std::collections::HashSet;

use previral_radar::ingest::rank::{dedup_and_rank, dedup_by_id};

use common::scored;

#[test]
fn dedup_is_idempotent_and_keeps_every_unique_id() {
    let items = vec![
        scored("a", 10),
        scored("b", 50),
        scored("a", 90),
        scored("c", 50),
        scored("b", 1),
    ];
    let once = dedup_by_id(items.clone());
    let twice = dedup_by_id(once.clone());
    assert_eq!(once, twice);

    let ids: HashSet<_> = items.iter().map(|i| i.id().to_string()).collect();
    let kept: HashSet<_> = once.iter().map(|i| i.id().to_string()).collect();
    assert_eq!(ids, kept);
    // First occurrence wins.
    assert_eq!(once[0].virality_score, 10);
}

#[test]
fn ranking_is_stable_descending_and_truncated() {
    let items = vec![
        scored("low", 5),
        scored("tie1", 70),
        scored("top", 99),
        scored("tie2", 70),
        scored("mid", 40),
    ];
    let ranked = dedup_and_rank(items, 4);
    let ids: Vec<_> = ranked.iter().map(|i| i.id()).collect();
    assert_eq!(ids, vec!["top", "tie1", "tie2", "mid"]);
}
