use super::LegislatorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Alignment percentage in `[0, 100]`, rounded to two decimals.
    pub score: f64,
    /// Bills that cleared the confidence threshold.
    pub bills_analyzed: u32,
}

/// The published, materialized score row. One per legislator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationScore {
    pub legislator_id: LegislatorId,
    pub score: f64,
    pub bills_analyzed: u32,
    pub last_calculated: DateTime<Utc>,
}
