//! Constituent sentiment: submit, withdraw, per-bill totals and a user's history.
//!
//! One row per (user, bill); resubmitting overwrites. Scores are not touched
//! here, they pick up the change on the next refresh.

use repscore_core::{
    BillId, BillStatus, CatalogStore, Disposition, RepscoreError, Result, SentimentStore, UserId,
    UserSentiment,
};
use serde::Serialize;

use super::rate_limit::RateLimiter;

/// Public sentiment totals for one bill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillSentiment {
    pub bill_id: BillId,
    pub status: BillStatus,
    pub support: u64,
    pub oppose: u64,
    /// The requesting user's own stance; null when anonymous or not yet cast.
    pub user_sentiment: Option<Disposition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSentimentHistory {
    pub user_id: UserId,
    pub sentiments: Vec<UserSentiment>,
}

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RepscoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

async fn require_bill<S>(store: &S, bill_id: &BillId) -> Result<repscore_core::Bill>
where
    S: CatalogStore + ?Sized,
{
    store
        .get_bill(bill_id)
        .await?
        .ok_or_else(|| RepscoreError::NotFound(format!("bill {bill_id}")))
}

/// Record (or overwrite) a user's stance on a bill.
///
/// Invalid ids and unknown bills are rejected before the limiter counts the
/// request.
pub async fn submit_sentiment<S>(
    store: &S,
    limiter: &RateLimiter,
    user_id: &UserId,
    bill_id: &BillId,
    disposition: Disposition,
) -> Result<()>
where
    S: CatalogStore + SentimentStore + ?Sized,
{
    require_id("user_id", user_id.as_str())?;
    require_id("bill_id", bill_id.as_str())?;
    require_bill(store, bill_id).await?;
    limiter.check(user_id)?;

    store.upsert_sentiment(user_id, bill_id, disposition).await?;
    tracing::info!(user = %user_id, bill = %bill_id, %disposition, "Sentiment recorded");
    Ok(())
}

/// Withdraw a user's stance. Returns whether anything was removed; removing
/// a stance that was never recorded is not an error.
pub async fn remove_sentiment<S>(store: &S, user_id: &UserId, bill_id: &BillId) -> Result<bool>
where
    S: SentimentStore + ?Sized,
{
    require_id("user_id", user_id.as_str())?;
    require_id("bill_id", bill_id.as_str())?;

    let removed = store.delete_sentiment(user_id, bill_id).await?;
    if removed {
        tracing::info!(user = %user_id, bill = %bill_id, "Sentiment removed");
    }
    Ok(removed)
}

pub async fn bill_sentiment<S>(
    store: &S,
    bill_id: &BillId,
    viewer: Option<&UserId>,
) -> Result<BillSentiment>
where
    S: CatalogStore + SentimentStore + ?Sized,
{
    require_id("bill_id", bill_id.as_str())?;
    let bill = require_bill(store, bill_id).await?;
    let tally = store.sentiment_counts(bill_id).await?;

    let user_sentiment = match viewer {
        Some(user_id) => {
            require_id("user_id", user_id.as_str())?;
            store.get_sentiment(user_id, bill_id).await?
        }
        None => None,
    };

    Ok(BillSentiment {
        bill_id: bill.id,
        status: bill.status,
        support: tally.support,
        oppose: tally.oppose,
        user_sentiment,
    })
}

/// Every stance the user has on record, most recently changed first.
pub async fn user_sentiments<S>(store: &S, user_id: &UserId) -> Result<UserSentimentHistory>
where
    S: SentimentStore + ?Sized,
{
    require_id("user_id", user_id.as_str())?;
    let sentiments = store.list_sentiments_by_user(user_id).await?;
    Ok(UserSentimentHistory {
        user_id: user_id.clone(),
        sentiments,
    })
}
