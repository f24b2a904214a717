//! Virality scoring.
//!
//! Every platform shares one shape: start at 0, add the delta of each signal
//! bucket that applies, clamp to `[0, 100]` once at the very end. Buckets are
//! independent, so evaluation order does not matter.
//!
//! Buckets:
//! - `reach`      : primary count relative to the publisher's audience
//! - `velocity`   : primary count per hour since publish
//! - `engagement` : likes/comments/upvote ratio relative to primary count
//! - `saturation` : penalty once the item has already broken out
//! - `sweet_spot` : banded bonus around the ideal pre-viral range
//! - `rising`     : low absolute count but unusually fast
//! - `locality`   : title/body/community mentions a target region

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{RawMetric, ScoredItem};

/// Strict `value > above` threshold with its point delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub above: f64,
    pub delta: i32,
}

impl Tier {
    pub const fn new(above: f64, delta: i32) -> Self {
        Self { above, delta }
    }
}

/// Inclusive `[min, max]` band on the primary count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
    pub delta: i32,
}

impl Band {
    pub const fn new(min: f64, max: f64, delta: i32) -> Self {
        Self { min, max, delta }
    }

    fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMetric {
    /// (likes + comments) / max(primary, 1)
    InteractionsPerView,
    /// Platform-reported upvote ratio; skipped when absent.
    UpvoteRatio,
    /// comments / max(primary, 1)
    CommentsPerScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRule {
    pub metric: EngagementMetric,
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RisingRule {
    /// Primary count must be strictly below this.
    pub below: f64,
    /// Velocity must be strictly above this.
    pub min_velocity: f64,
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityRule {
    /// Lowercase substrings searched in title, body and community name.
    pub keywords: Vec<String>,
    /// Lowercase community names that count as local on their own.
    #[serde(default)]
    pub communities: Vec<String>,
    pub delta: i32,
}

/// Tunable rule set for one platform. Empty lists disable a bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringProfile {
    pub reach: Vec<Tier>,
    pub velocity: Vec<Tier>,
    pub engagement: Vec<EngagementRule>,
    pub saturation: Vec<Tier>,
    pub sweet_spot: Vec<Band>,
    pub rising: Option<RisingRule>,
    pub locality: Option<LocalityRule>,
}

/// Per-bucket deltas before clamping. Useful for debugging a surprising score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub reach: i32,
    pub velocity: i32,
    pub engagement: i32,
    pub saturation: i32,
    pub sweet_spot: i32,
    pub rising: i32,
    pub locality: i32,
}

impl ScoreBreakdown {
    /// Unclamped sum; i64 so extreme configured deltas cannot overflow.
    pub fn raw_total(&self) -> i64 {
        [
            self.reach,
            self.velocity,
            self.engagement,
            self.saturation,
            self.sweet_spot,
            self.rising,
            self.locality,
        ]
        .iter()
        .map(|&d| d as i64)
        .sum()
    }

    pub fn clamped(&self) -> u8 {
        self.raw_total().clamp(0, 100) as u8
    }
}

/// Hours between `published_at` and `now`, never negative (clock skew).
pub fn hours_since(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = now.signed_duration_since(published_at).num_milliseconds();
    (ms as f64 / 3_600_000.0).max(0.0)
}

/// Primary count per hour; items younger than an hour divide by 1.
pub fn velocity(primary: i64, hours_old: f64) -> f64 {
    primary as f64 / hours_old.max(1.0)
}

/// Score one item at the instant `now`. Buckets see the exact age and
/// velocity; the item carries both rounded to whole numbers.
pub fn score(metric: RawMetric, profile: &ScoringProfile, now: DateTime<Utc>) -> ScoredItem {
    let hours_old = hours_since(metric.published_at, now);
    let velocity = velocity(metric.primary, hours_old);
    let virality_score = breakdown(&metric, velocity, profile).clamped();
    ScoredItem {
        metric,
        hours_old: hours_old.round(),
        velocity: velocity.round(),
        virality_score,
    }
}

/// Score a batch against the same `now`.
pub fn score_all(
    metrics: Vec<RawMetric>,
    profile: &ScoringProfile,
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    metrics
        .into_iter()
        .map(|m| score(m, profile, now))
        .collect()
}

pub fn breakdown(metric: &RawMetric, velocity: f64, profile: &ScoringProfile) -> ScoreBreakdown {
    let primary = metric.primary as f64;
    let floor_primary = metric.primary.max(1) as f64;

    let reach = match metric.audience {
        Some(audience) if audience > 0 => tier_delta(&profile.reach, primary / audience as f64),
        _ => 0,
    };

    let engagement = profile
        .engagement
        .iter()
        .map(|rule| {
            let value = match rule.metric {
                EngagementMetric::InteractionsPerView => {
                    (metric.secondary.saturating_add(metric.tertiary)) as f64 / floor_primary
                }
                EngagementMetric::CommentsPerScore => metric.tertiary as f64 / floor_primary,
                EngagementMetric::UpvoteRatio => match metric.upvote_ratio {
                    Some(r) => r,
                    None => return 0,
                },
            };
            tier_delta(&rule.tiers, value)
        })
        .sum();

    let sweet_spot = profile
        .sweet_spot
        .iter()
        .find(|b| b.contains(primary))
        .map(|b| b.delta)
        .unwrap_or(0);

    let rising = match profile.rising {
        Some(r) if primary < r.below && velocity > r.min_velocity => r.delta,
        _ => 0,
    };

    let locality = match &profile.locality {
        Some(rule) if is_local(metric, rule) => rule.delta,
        _ => 0,
    };

    ScoreBreakdown {
        reach,
        velocity: tier_delta(&profile.velocity, velocity),
        engagement,
        saturation: tier_delta(&profile.saturation, primary),
        sweet_spot,
        rising,
        locality,
    }
}

/// Delta of the highest tier whose threshold `value` strictly exceeds.
fn tier_delta(tiers: &[Tier], value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    tiers
        .iter()
        .filter(|t| value > t.above)
        .max_by(|a, b| a.above.total_cmp(&b.above))
        .map(|t| t.delta)
        .unwrap_or(0)
}

fn is_local(metric: &RawMetric, rule: &LocalityRule) -> bool {
    let community = metric.community.as_deref().unwrap_or_default().to_lowercase();
    if !community.is_empty() && rule.communities.iter().any(|c| *c == community) {
        return true;
    }
    let haystack = format!("{} {} {}", metric.title, metric.text, community).to_lowercase();
    rule.keywords.iter().any(|kw| haystack.contains(kw.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Platform;
    use chrono::Duration;

    fn metric(primary: i64) -> RawMetric {
        RawMetric {
            id: "x".into(),
            platform: Platform::Reddit,
            title: "Smash burgers".into(),
            text: String::new(),
            author: "someone".into(),
            community: Some("burgers".into()),
            url: "https://example.com".into(),
            thumbnail: None,
            published_at: Utc::now(),
            primary,
            secondary: 0,
            tertiary: 0,
            audience: None,
            upvote_ratio: None,
        }
    }

    #[test]
    fn highest_exceeded_tier_wins() {
        let tiers = [Tier::new(100.0, 10), Tier::new(1000.0, 30), Tier::new(500.0, 20)];
        assert_eq!(tier_delta(&tiers, 50.0), 0);
        assert_eq!(tier_delta(&tiers, 100.0), 0);
        assert_eq!(tier_delta(&tiers, 101.0), 10);
        assert_eq!(tier_delta(&tiers, 750.0), 20);
        assert_eq!(tier_delta(&tiers, 5000.0), 30);
        assert_eq!(tier_delta(&tiers, f64::NAN), 0);
    }

    #[test]
    fn hours_since_floors_clock_skew_at_zero() {
        let now = Utc::now();
        assert_eq!(hours_since(now + Duration::hours(3), now), 0.0);
        assert!((hours_since(now - Duration::minutes(90), now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn velocity_divides_by_at_least_one_hour() {
        assert_eq!(velocity(120, 0.0), 120.0);
        assert_eq!(velocity(120, 0.25), 120.0);
        assert_eq!(velocity(120, 4.0), 30.0);
    }

    #[test]
    fn scored_item_carries_whole_age_and_velocity() {
        let now = Utc::now();
        let mut m = metric(200);
        m.published_at = now - Duration::minutes(90);
        let s = score(m, &ScoringProfile::reddit_default(), now);
        assert_eq!(s.hours_old, 2.0);
        assert_eq!(s.velocity, 133.0);
    }

    #[test]
    fn clamp_applies_once_after_summing() {
        // -40 + 30 + 30 must not be clamped per bucket: 20, not 60.
        let b = ScoreBreakdown {
            saturation: -40,
            velocity: 30,
            sweet_spot: 30,
            ..Default::default()
        };
        assert_eq!(b.clamped(), 20);
        let neg = ScoreBreakdown {
            saturation: -40,
            ..Default::default()
        };
        assert_eq!(neg.clamped(), 0);
    }

    #[test]
    fn locality_matches_keyword_or_community() {
        let rule = LocalityRule {
            keywords: vec!["boca".into()],
            communities: vec!["foodnyc".into()],
            delta: 15,
        };
        let mut m = metric(10);
        assert!(!is_local(&m, &rule));
        m.text = "New spot in Boca Raton".into();
        assert!(is_local(&m, &rule));
        m.text.clear();
        m.community = Some("FoodNYC".into());
        assert!(is_local(&m, &rule));
    }

    #[test]
    fn upvote_ratio_bucket_skipped_without_ratio() {
        let profile = ScoringProfile {
            engagement: vec![EngagementRule {
                metric: EngagementMetric::UpvoteRatio,
                tiers: vec![Tier::new(0.9, 10)],
            }],
            ..Default::default()
        };
        let m = metric(10);
        assert_eq!(breakdown(&m, 0.0, &profile).engagement, 0);
    }
}
