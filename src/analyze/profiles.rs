//! Default rule sets per platform. Overridable through `[scoring.*]` in the
//! radar config; these values are what a config without those tables gets.

use super::scoring::{
    Band, EngagementMetric, EngagementRule, LocalityRule, RisingRule, ScoringProfile, Tier,
};

/// NYC and South Florida, where the channel films.
pub const LOCAL_KEYWORDS: &[&str] = &[
    "nyc",
    "new york",
    "brooklyn",
    "manhattan",
    "queens",
    "bronx",
    "harlem",
    "boca raton",
    "boca",
    "miami",
    "south florida",
    "fort lauderdale",
    "delray",
    "palm beach",
    "dade",
];

pub const LOCAL_COMMUNITIES: &[&str] = &[
    "foodnyc",
    "nyceats",
    "brooklyn",
    "newyorkcity",
    "asknyc",
    "southflorida",
    "miami",
    "florida",
    "fortlauderdale",
    "bocaraton",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl ScoringProfile {
    /// Views against subscriber count; penalize anything past 100K views.
    pub fn youtube_default() -> Self {
        Self {
            reach: vec![Tier::new(1.0, 10), Tier::new(2.0, 20), Tier::new(5.0, 30)],
            velocity: vec![
                Tier::new(100.0, 10),
                Tier::new(500.0, 20),
                Tier::new(1000.0, 30),
            ],
            engagement: vec![EngagementRule {
                metric: EngagementMetric::InteractionsPerView,
                tiers: vec![Tier::new(0.04, 10), Tier::new(0.08, 20)],
            }],
            saturation: vec![Tier::new(100_000.0, -15), Tier::new(300_000.0, -40)],
            // First matching band wins, so the bullseye goes first.
            sweet_spot: vec![
                Band::new(10_000.0, 50_000.0, 30),
                Band::new(3_000.0, 10_000.0, 20),
                Band::new(50_000.0, 100_000.0, 15),
            ],
            rising: None,
            locality: None,
        }
    }

    /// Upvote velocity on a general feed, boosted for local content.
    pub fn reddit_default() -> Self {
        Self {
            reach: Vec::new(),
            velocity: vec![
                Tier::new(20.0, 10),
                Tier::new(50.0, 20),
                Tier::new(100.0, 30),
            ],
            engagement: vec![
                EngagementRule {
                    metric: EngagementMetric::UpvoteRatio,
                    tiers: vec![Tier::new(0.90, 10), Tier::new(0.95, 15)],
                },
                EngagementRule {
                    metric: EngagementMetric::CommentsPerScore,
                    tiers: vec![Tier::new(0.1, 15)],
                },
            ],
            saturation: vec![Tier::new(5_000.0, -15), Tier::new(10_000.0, -40)],
            sweet_spot: vec![Band::new(50.0, 2_000.0, 25)],
            rising: Some(RisingRule {
                below: 300.0,
                min_velocity: 15.0,
                delta: 25,
            }),
            locality: Some(LocalityRule {
                keywords: owned(LOCAL_KEYWORDS),
                communities: owned(LOCAL_COMMUNITIES),
                delta: 15,
            }),
        }
    }
}
