//! Periodic full refresh of published scores.
//!
//! Each cycle enumerates active legislators and runs compute → publish for
//! each one with bounded concurrency. A failure for one legislator is logged
//! and recorded in the report; the rest of the cycle continues.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use repscore_core::config::RefreshConfig;
use repscore_core::{CatalogStore, LegislatorId, Store};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::score::refresh_legislator;

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub updated: usize,
    /// One entry per failed legislator: `"<legislator_id>: <error>"`.
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

/// Run a single refresh cycle over every active legislator.
///
/// Only a failure to list legislators fails the cycle as a whole.
pub async fn run_refresh_cycle(store: &dyn Store, concurrency: usize) -> Result<RefreshReport> {
    let start = Instant::now();
    let legislators = store.list_active_legislators().await?;
    let total = legislators.len();

    let results: Vec<(LegislatorId, repscore_core::Result<_>)> = stream::iter(legislators)
        .map(|legislator_id| async move {
            let result = refresh_legislator(store, &legislator_id).await;
            (legislator_id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = RefreshReport::default();
    for (legislator_id, result) in results {
        match result {
            Ok(_) => report.updated += 1,
            Err(e) => {
                tracing::warn!(legislator = %legislator_id, error = %e, "Score refresh failed");
                report.errors.push(format!("{legislator_id}: {e}"));
            }
        }
    }
    report.errors.sort();
    report.elapsed_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        total,
        updated = report.updated,
        failed = report.errors.len(),
        elapsed_ms = report.elapsed_ms,
        "Refresh cycle complete"
    );

    Ok(report)
}

/// Longest accepted gap between cycles.
pub const MAX_REFRESH_PERIOD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Time between cycles, clamped to `[1 minute, MAX_REFRESH_PERIOD]`.
pub fn refresh_period(config: &RefreshConfig) -> Duration {
    Duration::from_secs(config.interval_minutes.max(1).saturating_mul(60)).min(MAX_REFRESH_PERIOD)
}

/// Background loop: one cycle per `interval_minutes`, until shutdown.
/// Exits immediately if refresh is disabled.
pub async fn run_refresh_loop(
    store: Arc<dyn Store>,
    config: RefreshConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    if !config.enabled {
        tracing::info!("Refresh loop disabled via config");
        return;
    }

    let mut ticker = interval(refresh_period(&config));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_min = config.interval_minutes,
        concurrency = config.concurrency,
        "Refresh loop started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_refresh_cycle(store.as_ref(), config.concurrency).await {
                    tracing::error!(error = %e, "Refresh cycle failed");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Refresh loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use repscore_core::{
        Bill, BillId, CatalogStore, Chamber, Disposition, Legislator, LegislatorFilter,
        LegislatorSummary, MemoryStore, RepresentationScore, RepscoreError, ScoreStore,
        SentimentStore, TallyRow, UserId, UserSentiment, VoteOutcome, VoteRecord, VoteStore,
    };

    /// Delegates to a `MemoryStore` but fails vote reads for one legislator.
    struct FlakyStore {
        inner: MemoryStore,
        broken: LegislatorId,
        fail_listing: bool,
    }

    #[async_trait]
    impl CatalogStore for FlakyStore {
        async fn get_bill(&self, bill_id: &BillId) -> repscore_core::Result<Option<Bill>> {
            self.inner.get_bill(bill_id).await
        }

        async fn get_legislator(
            &self,
            legislator_id: &LegislatorId,
        ) -> repscore_core::Result<Option<Legislator>> {
            self.inner.get_legislator(legislator_id).await
        }

        async fn list_active_legislators(&self) -> repscore_core::Result<Vec<LegislatorId>> {
            if self.fail_listing {
                return Err(RepscoreError::Other("connection reset".into()));
            }
            self.inner.list_active_legislators().await
        }

        async fn list_legislators(
            &self,
            filter: &LegislatorFilter,
        ) -> repscore_core::Result<Vec<LegislatorSummary>> {
            self.inner.list_legislators(filter).await
        }
    }

    #[async_trait]
    impl VoteStore for FlakyStore {
        async fn list_votes_by_legislator(
            &self,
            legislator_id: &LegislatorId,
        ) -> repscore_core::Result<Vec<VoteRecord>> {
            if *legislator_id == self.broken {
                return Err(RepscoreError::Other("read timeout".into()));
            }
            self.inner.list_votes_by_legislator(legislator_id).await
        }
    }

    #[async_trait]
    impl SentimentStore for FlakyStore {
        async fn sentiment_tally_for_bills(
            &self,
            bill_ids: &[BillId],
        ) -> repscore_core::Result<Vec<TallyRow>> {
            self.inner.sentiment_tally_for_bills(bill_ids).await
        }

        async fn upsert_sentiment(
            &self,
            user_id: &UserId,
            bill_id: &BillId,
            disposition: Disposition,
        ) -> repscore_core::Result<()> {
            self.inner.upsert_sentiment(user_id, bill_id, disposition).await
        }

        async fn delete_sentiment(
            &self,
            user_id: &UserId,
            bill_id: &BillId,
        ) -> repscore_core::Result<bool> {
            self.inner.delete_sentiment(user_id, bill_id).await
        }

        async fn get_sentiment(
            &self,
            user_id: &UserId,
            bill_id: &BillId,
        ) -> repscore_core::Result<Option<Disposition>> {
            self.inner.get_sentiment(user_id, bill_id).await
        }

        async fn list_sentiments_by_user(
            &self,
            user_id: &UserId,
        ) -> repscore_core::Result<Vec<UserSentiment>> {
            self.inner.list_sentiments_by_user(user_id).await
        }
    }

    #[async_trait]
    impl ScoreStore for FlakyStore {
        async fn upsert_representation_score(
            &self,
            legislator_id: &LegislatorId,
            score: f64,
            bills_analyzed: u32,
            computed_at: DateTime<Utc>,
        ) -> repscore_core::Result<()> {
            self.inner
                .upsert_representation_score(legislator_id, score, bills_analyzed, computed_at)
                .await
        }

        async fn get_representation_score(
            &self,
            legislator_id: &LegislatorId,
        ) -> repscore_core::Result<Option<RepresentationScore>> {
            self.inner.get_representation_score(legislator_id).await
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn health_check(&self) -> repscore_core::Result<String> {
            Ok("flaky".to_string())
        }
    }

    fn legislator(id: &str, active: bool) -> Legislator {
        Legislator {
            id: LegislatorId::from(id),
            first_name: "Rep".to_string(),
            last_name: id.to_string(),
            chamber: Chamber::Senate,
            party: None,
            jurisdiction: "UT".to_string(),
            active,
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, active) in [("L1", true), ("L2", true), ("L3", true), ("L4", false)] {
            store.insert_legislator(legislator(id, active)).await;
        }
        let bill = BillId::from("HB1");
        for id in ["L1", "L2", "L3", "L4"] {
            store
                .record_vote(&LegislatorId::from(id), &bill, VoteOutcome::Yea)
                .await;
        }
        for i in 0..6 {
            store
                .upsert_sentiment(&UserId::new(format!("u{i}")), &bill, Disposition::Support)
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_cycle_refreshes_active_legislators_only() {
        let store = seeded_store().await;

        let report = run_refresh_cycle(&store, 2).await.unwrap();

        assert_eq!(report.updated, 3);
        assert!(report.errors.is_empty());
        assert_eq!(store.score_row_count().await, 3);
        assert!(store
            .get_representation_score(&LegislatorId::from("L4"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cycle_isolates_failures() {
        let store = FlakyStore {
            inner: seeded_store().await,
            broken: LegislatorId::from("L2"),
            fail_listing: false,
        };

        let report = run_refresh_cycle(&store, 4).await.unwrap();

        assert_eq!(report.updated, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("L2: "), "got {:?}", report.errors);
        assert!(report.errors[0].contains("read timeout"));

        for id in ["L1", "L3"] {
            let row = store
                .get_representation_score(&LegislatorId::from(id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(row.score, 100.0);
        }
        assert!(store
            .get_representation_score(&LegislatorId::from("L2"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cycle_fails_when_listing_fails() {
        let store = FlakyStore {
            inner: seeded_store().await,
            broken: LegislatorId::from("none"),
            fail_listing: true,
        };
        assert!(run_refresh_cycle(&store, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_progresses() {
        let store = seeded_store().await;
        let report = run_refresh_cycle(&store, 0).await.unwrap();
        assert_eq!(report.updated, 3);
    }

    #[test]
    fn test_refresh_period_is_clamped() {
        let huge = RefreshConfig {
            interval_minutes: u64::MAX / 30,
            ..RefreshConfig::default()
        };
        assert_eq!(refresh_period(&huge), MAX_REFRESH_PERIOD);

        let zero = RefreshConfig {
            interval_minutes: 0,
            ..RefreshConfig::default()
        };
        assert_eq!(refresh_period(&zero), Duration::from_secs(60));
        assert_eq!(
            refresh_period(&RefreshConfig::default()),
            Duration::from_secs(3600)
        );
    }

    #[tokio::test]
    async fn test_disabled_loop_returns_immediately() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (_tx, rx) = broadcast::channel(1);
        let config = RefreshConfig {
            enabled: false,
            ..RefreshConfig::default()
        };
        tokio::time::timeout(Duration::from_secs(1), run_refresh_loop(store, config, rx))
            .await
            .expect("disabled loop should exit at once");
    }

    #[tokio::test]
    async fn test_loop_runs_first_cycle_then_stops_on_shutdown() {
        let memory = Arc::new(seeded_store().await);
        let store: Arc<dyn Store> = memory.clone();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(run_refresh_loop(store, RefreshConfig::default(), rx));

        // The first tick fires immediately.
        for _ in 0..50 {
            if memory.score_row_count().await == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(memory.score_row_count().await, 3);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop after shutdown")
            .unwrap();
    }
}
