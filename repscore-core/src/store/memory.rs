use super::{CatalogStore, ScoreStore, SentimentStore, Store, VoteStore};
use crate::error::Result;
use crate::models::{
    Bill, BillId, Disposition, Legislator, LegislatorFilter, LegislatorId, LegislatorSummary,
    RepresentationScore, TallyRow, UserId, UserSentiment, VoteOutcome, VoteRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct SentimentEntry {
    disposition: Disposition,
    updated_at: DateTime<Utc>,
    /// Write order; breaks `updated_at` ties.
    seq: u64,
}

/// In-process store. Each table sits behind its own lock; no method holds
/// more than one lock at a time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    legislators: RwLock<BTreeMap<LegislatorId, Legislator>>,
    bills: RwLock<HashMap<BillId, Bill>>,
    votes: RwLock<BTreeMap<(LegislatorId, BillId), VoteOutcome>>,
    sentiments: RwLock<HashMap<(UserId, BillId), SentimentEntry>>,
    scores: RwLock<HashMap<LegislatorId, RepresentationScore>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Ingestion-side writers. The score engine never calls these.

    pub async fn insert_legislator(&self, legislator: Legislator) {
        self.legislators
            .write()
            .await
            .insert(legislator.id.clone(), legislator);
    }

    pub async fn insert_bill(&self, bill: Bill) {
        self.bills.write().await.insert(bill.id.clone(), bill);
    }

    /// Record a vote; a second vote for the same (legislator, bill) replaces the first.
    pub async fn record_vote(
        &self,
        legislator_id: &LegislatorId,
        bill_id: &BillId,
        outcome: VoteOutcome,
    ) {
        self.votes
            .write()
            .await
            .insert((legislator_id.clone(), bill_id.clone()), outcome);
    }

    pub async fn score_row_count(&self) -> usize {
        self.scores.read().await.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_bill(&self, bill_id: &BillId) -> Result<Option<Bill>> {
        Ok(self.bills.read().await.get(bill_id).cloned())
    }

    async fn get_legislator(&self, legislator_id: &LegislatorId) -> Result<Option<Legislator>> {
        Ok(self.legislators.read().await.get(legislator_id).cloned())
    }

    async fn list_active_legislators(&self) -> Result<Vec<LegislatorId>> {
        Ok(self
            .legislators
            .read()
            .await
            .values()
            .filter(|l| l.active)
            .map(|l| l.id.clone())
            .collect())
    }

    async fn list_legislators(&self, filter: &LegislatorFilter) -> Result<Vec<LegislatorSummary>> {
        let mut matching: Vec<Legislator> = self
            .legislators
            .read()
            .await
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            (&a.last_name, &a.first_name, &a.id).cmp(&(&b.last_name, &b.first_name, &b.id))
        });

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let scores = self.scores.read().await;
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .map(|legislator| {
                let published = scores.get(&legislator.id);
                LegislatorSummary {
                    score: published.map(|s| s.score),
                    bills_analyzed: published.map(|s| s.bills_analyzed),
                    legislator,
                }
            })
            .collect())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn list_votes_by_legislator(
        &self,
        legislator_id: &LegislatorId,
    ) -> Result<Vec<VoteRecord>> {
        Ok(self
            .votes
            .read()
            .await
            .iter()
            .filter(|((legislator, _), _)| legislator == legislator_id)
            .map(|((_, bill), outcome)| VoteRecord {
                bill_id: bill.clone(),
                outcome: *outcome,
            })
            .collect())
    }
}

#[async_trait]
impl SentimentStore for MemoryStore {
    async fn sentiment_tally_for_bills(&self, bill_ids: &[BillId]) -> Result<Vec<TallyRow>> {
        let wanted: HashSet<&BillId> = bill_ids.iter().collect();
        let mut counts: HashMap<(BillId, Disposition), u64> = HashMap::new();

        for ((_, bill), entry) in self.sentiments.read().await.iter() {
            if wanted.contains(bill) {
                *counts.entry((bill.clone(), entry.disposition)).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|((bill_id, disposition), count)| TallyRow {
                bill_id,
                disposition,
                count,
            })
            .collect())
    }

    async fn upsert_sentiment(
        &self,
        user_id: &UserId,
        bill_id: &BillId,
        disposition: Disposition,
    ) -> Result<()> {
        let entry = SentimentEntry {
            disposition,
            updated_at: Utc::now(),
            seq: self.writes.fetch_add(1, Ordering::Relaxed),
        };
        self.sentiments
            .write()
            .await
            .insert((user_id.clone(), bill_id.clone()), entry);
        Ok(())
    }

    async fn delete_sentiment(&self, user_id: &UserId, bill_id: &BillId) -> Result<bool> {
        Ok(self
            .sentiments
            .write()
            .await
            .remove(&(user_id.clone(), bill_id.clone()))
            .is_some())
    }

    async fn get_sentiment(
        &self,
        user_id: &UserId,
        bill_id: &BillId,
    ) -> Result<Option<Disposition>> {
        Ok(self
            .sentiments
            .read()
            .await
            .get(&(user_id.clone(), bill_id.clone()))
            .map(|entry| entry.disposition))
    }

    async fn list_sentiments_by_user(&self, user_id: &UserId) -> Result<Vec<UserSentiment>> {
        let mut entries: Vec<(BillId, SentimentEntry)> = self
            .sentiments
            .read()
            .await
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, bill), entry)| (bill.clone(), *entry))
            .collect();
        entries.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));

        // Inner join: stances on bills missing from the catalog are dropped.
        let bills = self.bills.read().await;
        Ok(entries
            .into_iter()
            .filter_map(|(bill_id, entry)| {
                let bill = bills.get(&bill_id)?;
                Some(UserSentiment {
                    bill_id,
                    bill_type: bill.bill_type.clone(),
                    bill_number: bill.bill_number.clone(),
                    title: bill.title.clone(),
                    status: bill.status,
                    disposition: entry.disposition,
                    updated_at: entry.updated_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn upsert_representation_score(
        &self,
        legislator_id: &LegislatorId,
        score: f64,
        bills_analyzed: u32,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.scores.write().await.insert(
            legislator_id.clone(),
            RepresentationScore {
                legislator_id: legislator_id.clone(),
                score,
                bills_analyzed,
                last_calculated: computed_at,
            },
        );
        Ok(())
    }

    async fn get_representation_score(
        &self,
        legislator_id: &LegislatorId,
    ) -> Result<Option<RepresentationScore>> {
        Ok(self.scores.read().await.get(legislator_id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<String> {
        Ok("memory".to_string())
    }
}
