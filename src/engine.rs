//! # Scan decisions
//! Pure, testable rules that turn a merged scan into what should happen next:
//! summarize, persist, and which alert (if any) to send. No I/O.

use crate::analyze::UrgencyCounts;
use crate::ingest::types::ScanBundle;

/// Which alert a finished scan calls for. At most one per scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Film-now or this-week trends were found.
    Content,
    /// Nothing came back and at least one source failed.
    Error,
    None,
}

/// The summarizer is only worth a call when there is something to read.
pub fn should_summarize(bundle: &ScanBundle) -> bool {
    !bundle.is_empty()
}

/// Empty scans are never stored; they would mask the last good one.
pub fn should_persist(bundle: &ScanBundle) -> bool {
    !bundle.is_empty()
}

pub fn alert_decision(bundle: &ScanBundle, counts: &UrgencyCounts, error_count: usize) -> AlertDecision {
    if bundle.is_empty() {
        return if error_count > 0 {
            AlertDecision::Error
        } else {
            AlertDecision::None
        };
    }
    if counts.urgent() > 0 {
        AlertDecision::Content
    } else {
        AlertDecision::None
    }
}
