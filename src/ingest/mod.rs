// src/ingest/mod.rs
pub mod cache;
pub mod providers;
pub mod rank;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "radar_source_items_total",
            "Items returned by each source connector."
        );
        describe_counter!(
            "radar_source_errors_total",
            "Connector calls that ended without data."
        );
        describe_counter!(
            "radar_source_parse_failures_total",
            "Payloads a source returned that could not be parsed."
        );
        describe_counter!(
            "radar_cache_hits_total",
            "Connector results served from cache (fresh or stale)."
        );
        describe_counter!("radar_scans_total", "Completed scan passes.");
        describe_counter!("radar_alerts_total", "Alerts attempted, by kind.");
        describe_histogram!("radar_scan_duration_ms", "Scan wall time in milliseconds.");
        describe_gauge!("radar_last_scan_ts", "Unix ts when the last scan finished.");
    });
}

/// Normalize external text: decode HTML entities, drop tags, collapse
/// whitespace, cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}
