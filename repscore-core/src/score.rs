//! Representation Score aggregation
//!
//! score = matching / qualifying × 100, rounded to two decimals
//!
//! Where:
//!   qualifying = bills the legislator voted on whose total constituent
//!                sentiment (support + oppose) is at least
//!                MIN_CONSTITUENT_SENTIMENTS
//!   matching   = qualifying bills where the vote's alignment equals the
//!                constituent majority
//!
//! Majority: support when support >= oppose (ties go to support).
//! Alignment: yea → support, nay → oppose, absent/present → none (never matches).
//!
//! Everything here is pure. The reads that feed it live in the server's
//! score subsystem.

use crate::models::{BillId, ScoreOutcome, SentimentTally, TallyRow, VoteRecord};
use std::collections::HashMap;

/// Minimum sentiment sample before a bill counts toward a score.
pub const MIN_CONSTITUENT_SENTIMENTS: u64 = 5;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Fold grouped `(bill, disposition, count)` rows into per-bill tallies.
/// A repeated `(bill, disposition)` row replaces the earlier count.
pub fn tally_by_bill(rows: &[TallyRow]) -> HashMap<BillId, SentimentTally> {
    let mut tallies: HashMap<BillId, SentimentTally> = HashMap::new();
    for row in rows {
        tallies
            .entry(row.bill_id.clone())
            .or_default()
            .set(row.disposition, row.count);
    }
    tallies
}

/// Compute the score for one legislator's votes against the sentiment tallies
/// of those same bills.
pub fn aggregate(votes: &[VoteRecord], tallies: &HashMap<BillId, SentimentTally>) -> ScoreOutcome {
    let mut qualifying: u32 = 0;
    let mut matching: u32 = 0;

    for vote in votes {
        let Some(tally) = tallies.get(&vote.bill_id) else {
            continue;
        };
        if tally.total() < MIN_CONSTITUENT_SENTIMENTS {
            continue;
        }

        qualifying += 1;

        if vote.outcome.alignment() == Some(tally.majority()) {
            matching += 1;
        }
    }

    let score = if qualifying > 0 {
        round_hundredths(f64::from(matching) / f64::from(qualifying) * 100.0)
    } else {
        0.0
    };

    ScoreOutcome {
        score,
        bills_analyzed: qualifying,
    }
}

/// Round half away from zero to two decimal places.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
