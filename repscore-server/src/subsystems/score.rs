//! Score Aggregator + Publisher
//!
//! `compute_score` performs the two reads (votes, then the grouped sentiment
//! tally for exactly those bills) and hands them to the pure aggregator.
//! `publish_score` upserts the result keyed by legislator id.
//!
//! Neither holds a lock across the read and the write: the published value is
//! a pure function of current votes and sentiment, so concurrent
//! compute/publish cycles for the same legislator converge by overwrite.

use chrono::Utc;
use repscore_core::score::{aggregate, tally_by_bill};
use repscore_core::{
    BillId, LegislatorId, RepresentationScore, Result, ScoreOutcome, ScoreStore, SentimentStore,
    VoteStore,
};

/// Compute a legislator's score from current votes and sentiment. No side effects.
///
/// A legislator with no votes scores `{0, 0}` without touching the sentiment table.
/// Store failures propagate; nothing is retried here.
pub async fn compute_score<S>(store: &S, legislator_id: &LegislatorId) -> Result<ScoreOutcome>
where
    S: VoteStore + SentimentStore + ?Sized,
{
    let votes = store.list_votes_by_legislator(legislator_id).await?;
    if votes.is_empty() {
        return Ok(ScoreOutcome::default());
    }

    let bill_ids: Vec<BillId> = votes.iter().map(|v| v.bill_id.clone()).collect();
    let rows = store.sentiment_tally_for_bills(&bill_ids).await?;
    let outcome = aggregate(&votes, &tally_by_bill(&rows));

    tracing::debug!(
        legislator = %legislator_id,
        votes = votes.len(),
        score = outcome.score,
        bills_analyzed = outcome.bills_analyzed,
        "Computed representation score"
    );

    Ok(outcome)
}

/// Upsert the legislator's score row, stamping it with the current time.
pub async fn publish_score<S>(
    store: &S,
    legislator_id: &LegislatorId,
    outcome: ScoreOutcome,
) -> Result<RepresentationScore>
where
    S: ScoreStore + ?Sized,
{
    let computed_at = Utc::now();
    store
        .upsert_representation_score(
            legislator_id,
            outcome.score,
            outcome.bills_analyzed,
            computed_at,
        )
        .await?;

    Ok(RepresentationScore {
        legislator_id: legislator_id.clone(),
        score: outcome.score,
        bills_analyzed: outcome.bills_analyzed,
        last_calculated: computed_at,
    })
}

/// One refresh cycle for one legislator: compute, then publish.
pub async fn refresh_legislator<S>(
    store: &S,
    legislator_id: &LegislatorId,
) -> Result<RepresentationScore>
where
    S: VoteStore + SentimentStore + ScoreStore + ?Sized,
{
    let outcome = compute_score(store, legislator_id).await?;
    publish_score(store, legislator_id, outcome).await
}
