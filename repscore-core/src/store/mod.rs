//! Storage seams for the score engine.
//!
//! Each trait matches one component boundary:
//! - [`CatalogStore`]: legislators and bills written by ingestion (read-only here)
//! - [`VoteStore`]: recorded votes (read-only here)
//! - [`SentimentStore`]: one sentiment per (user, bill), upserted by users
//! - [`ScoreStore`]: the materialized score, one row per legislator
//!
//! [`Store`] bundles them for components that need the whole picture
//! (refresh loop, HTTP/IPC surfaces). Two implementations ship:
//! [`PgStore`] over sqlx/Postgres and [`MemoryStore`] for tests and
//! database-less runs.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::Result;
use crate::models::{
    Bill, BillId, Disposition, Legislator, LegislatorFilter, LegislatorId, LegislatorSummary,
    RepresentationScore, SentimentTally, TallyRow, UserId, UserSentiment, VoteRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_bill(&self, bill_id: &BillId) -> Result<Option<Bill>>;

    async fn get_legislator(&self, legislator_id: &LegislatorId) -> Result<Option<Legislator>>;

    async fn list_active_legislators(&self) -> Result<Vec<LegislatorId>>;

    /// Active legislators matching `filter`, left-joined with their published
    /// score, ordered by last name then first name.
    async fn list_legislators(&self, filter: &LegislatorFilter) -> Result<Vec<LegislatorSummary>>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn list_votes_by_legislator(&self, legislator_id: &LegislatorId)
        -> Result<Vec<VoteRecord>>;
}

#[async_trait]
pub trait SentimentStore: Send + Sync {
    /// Grouped aggregate: one row per (bill, disposition) present among `bill_ids`.
    /// Bills with no sentiment produce no rows.
    async fn sentiment_tally_for_bills(&self, bill_ids: &[BillId]) -> Result<Vec<TallyRow>>;

    /// Insert or overwrite the user's sentiment on a bill (last write wins).
    async fn upsert_sentiment(
        &self,
        user_id: &UserId,
        bill_id: &BillId,
        disposition: Disposition,
    ) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete_sentiment(&self, user_id: &UserId, bill_id: &BillId) -> Result<bool>;

    async fn get_sentiment(&self, user_id: &UserId, bill_id: &BillId)
        -> Result<Option<Disposition>>;

    /// The user's stances joined to their bills, most recently updated first.
    async fn list_sentiments_by_user(&self, user_id: &UserId) -> Result<Vec<UserSentiment>>;

    /// Support/oppose totals for a single bill. Defaults to the grouped aggregate.
    async fn sentiment_counts(&self, bill_id: &BillId) -> Result<SentimentTally> {
        let rows = self
            .sentiment_tally_for_bills(std::slice::from_ref(bill_id))
            .await?;
        Ok(crate::score::tally_by_bill(&rows)
            .remove(bill_id)
            .unwrap_or_default())
    }
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert or overwrite the legislator's score row. Exactly one row per
    /// legislator survives any number of concurrent calls.
    async fn upsert_representation_score(
        &self,
        legislator_id: &LegislatorId,
        score: f64,
        bills_analyzed: u32,
        computed_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_representation_score(
        &self,
        legislator_id: &LegislatorId,
    ) -> Result<Option<RepresentationScore>>;
}

/// Everything the server needs, behind one trait object.
#[async_trait]
pub trait Store: CatalogStore + VoteStore + SentimentStore + ScoreStore {
    /// Backend name plus version, e.g. `"postgres: PostgreSQL 16.2 ..."`.
    async fn health_check(&self) -> Result<String>;
}
