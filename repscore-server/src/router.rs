use crate::subsystems::rate_limit::RateLimiter;
use crate::subsystems::{refresh, roster, score, sentiment};
use repscore_core::ipc::{ScoreRequest, ScoreResponse};
use repscore_core::{
    CatalogStore, LegislatorId, RepscoreConfig, RepscoreError, Result, ScoreOutcome, ScoreStore,
    Store,
};
use serde::Serialize;
use std::sync::Arc;

/// Everything a request handler needs. Shared by the IPC and HTTP surfaces.
pub struct ServiceState {
    pub store: Arc<dyn Store>,
    pub config: RepscoreConfig,
    pub limiter: RateLimiter,
}

impl ServiceState {
    pub fn new(store: Arc<dyn Store>, config: RepscoreConfig) -> Self {
        let limiter = RateLimiter::from_config(&config.sentiment);
        Self {
            store,
            config,
            limiter,
        }
    }
}

pub async fn handle_request(request: ScoreRequest, state: &ServiceState) -> ScoreResponse {
    let store = state.store.as_ref();

    match request {
        ScoreRequest::Ping => ScoreResponse::pong(),
        ScoreRequest::Health => match store.health_check().await {
            Ok(backend) => ScoreResponse::ok(serde_json::json!({
                "store": backend,
                "status": "healthy"
            })),
            Err(e) => ScoreResponse::from_error(&e),
        },
        ScoreRequest::ComputeScore { legislator_id } => {
            respond(
                score::compute_score(store, &legislator_id)
                    .await
                    .map(|outcome| ComputedScore::new(legislator_id, outcome)),
            )
        }
        ScoreRequest::GetScore { legislator_id } => {
            respond(match store.get_representation_score(&legislator_id).await {
                Ok(Some(row)) => Ok(row),
                Ok(None) => Err(RepscoreError::NotFound(format!(
                    "no score published for legislator {legislator_id}"
                ))),
                Err(e) => Err(e),
            })
        }
        ScoreRequest::GetLegislator { legislator_id } => {
            respond(legislator_with_score(store, &legislator_id).await)
        }
        ScoreRequest::ListLegislators { filter } => {
            respond(roster::list_legislators(store, &filter).await)
        }
        ScoreRequest::RefreshLegislator { legislator_id } => {
            respond(refresh_known_legislator(store, &legislator_id).await)
        }
        ScoreRequest::RefreshAll => {
            match refresh::run_refresh_cycle(store, state.config.refresh.concurrency).await {
                Ok(report) => respond(Ok(report)),
                Err(e) => match e.downcast_ref::<RepscoreError>() {
                    Some(inner) => ScoreResponse::from_error(inner),
                    None => ScoreResponse::err(e.to_string()),
                },
            }
        }
        ScoreRequest::BillSentiment { bill_id, user_id } => {
            respond(sentiment::bill_sentiment(store, &bill_id, user_id.as_ref()).await)
        }
        ScoreRequest::UserSentiments { user_id } => {
            respond(sentiment::user_sentiments(store, &user_id).await)
        }
        ScoreRequest::SubmitSentiment {
            user_id,
            bill_id,
            disposition,
        } => respond(
            sentiment::submit_sentiment(store, &state.limiter, &user_id, &bill_id, disposition)
                .await
                .map(|_| {
                    serde_json::json!({
                        "user_id": user_id,
                        "bill_id": bill_id,
                        "disposition": disposition,
                    })
                }),
        ),
        ScoreRequest::RemoveSentiment { user_id, bill_id } => respond(
            sentiment::remove_sentiment(store, &user_id, &bill_id)
                .await
                .map(|removed| serde_json::json!({ "removed": removed })),
        ),
    }
}

/// Freshly computed (unpublished) score.
#[derive(Debug, Serialize)]
struct ComputedScore {
    legislator_id: LegislatorId,
    score: f64,
    bills_analyzed: u32,
}

impl ComputedScore {
    fn new(legislator_id: LegislatorId, outcome: ScoreOutcome) -> Self {
        Self {
            legislator_id,
            score: outcome.score,
            bills_analyzed: outcome.bills_analyzed,
        }
    }
}

async fn legislator_with_score(
    store: &dyn Store,
    legislator_id: &LegislatorId,
) -> Result<serde_json::Value> {
    let legislator = store
        .get_legislator(legislator_id)
        .await?
        .ok_or_else(|| RepscoreError::NotFound(format!("legislator {legislator_id}")))?;
    let published = store.get_representation_score(legislator_id).await?;
    let display_name = legislator.display_name();

    Ok(serde_json::json!({
        "legislator": legislator,
        "display_name": display_name,
        "score": published,
    }))
}

/// Refresh on demand, but only for legislators the catalog knows about, so a
/// typo never materializes a score row.
async fn refresh_known_legislator(
    store: &dyn Store,
    legislator_id: &LegislatorId,
) -> Result<repscore_core::RepresentationScore> {
    if store.get_legislator(legislator_id).await?.is_none() {
        return Err(RepscoreError::NotFound(format!("legislator {legislator_id}")));
    }
    let published = score::refresh_legislator(store, legislator_id).await?;
    tracing::info!(
        legislator = %legislator_id,
        score = published.score,
        bills_analyzed = published.bills_analyzed,
        "Score refreshed on demand"
    );
    Ok(published)
}

fn respond<T: Serialize>(result: Result<T>) -> ScoreResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(data) => ScoreResponse::ok(data),
            Err(e) => ScoreResponse::err(format!("Serialization error: {e}")),
        },
        Err(e) => ScoreResponse::from_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repscore_core::{
        Bill, BillId, BillStatus, Chamber, Disposition, Legislator, LegislatorFilter, MemoryStore,
        UserId, VoteOutcome,
    };

    const CONFIG: &str = r#"
        [service]
        socket_path = "/tmp/repscore-router-test.sock"
        log_level = "info"

        [database]
        url = "postgresql://localhost/unused"
        max_connections = 1
    "#;

    async fn seeded_state() -> ServiceState {
        let store = MemoryStore::new();
        store
            .insert_legislator(Legislator {
                id: LegislatorId::from("L1"),
                first_name: "Ada".to_string(),
                last_name: "Park".to_string(),
                chamber: Chamber::House,
                party: Some("I".to_string()),
                jurisdiction: "UT".to_string(),
                active: true,
            })
            .await;
        store
            .insert_bill(Bill {
                id: BillId::from("HB7"),
                jurisdiction: "UT".to_string(),
                bill_type: "HB".to_string(),
                bill_number: "7".to_string(),
                title: "Water Rights".to_string(),
                status: BillStatus::Passed,
                session_year: 2025,
            })
            .await;
        store
            .record_vote(&LegislatorId::from("L1"), &BillId::from("HB7"), VoteOutcome::Nay)
            .await;

        let config = RepscoreConfig::from_toml_str(CONFIG).unwrap();
        ServiceState::new(Arc::new(store), config)
    }

    async fn oppose(state: &ServiceState, count: usize) {
        for i in 0..count {
            let resp = handle_request(
                ScoreRequest::SubmitSentiment {
                    user_id: UserId::new(format!("u{i}")),
                    bill_id: BillId::from("HB7"),
                    disposition: Disposition::Oppose,
                },
                state,
            )
            .await;
            assert!(resp.is_ok(), "submit failed: {:?}", resp.error);
        }
    }

    // ========================================================================
    // TEST 1: ping answers pong
    // ========================================================================
    #[tokio::test]
    async fn test_ping() {
        let state = seeded_state().await;
        let resp = handle_request(ScoreRequest::Ping, &state).await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["pong"], true);
    }

    // ========================================================================
    // TEST 2: health reports the backend
    // ========================================================================
    #[tokio::test]
    async fn test_health_reports_memory_backend() {
        let state = seeded_state().await;
        let resp = handle_request(ScoreRequest::Health, &state).await;
        let data = resp.data.unwrap();
        assert_eq!(data["store"], "memory");
        assert_eq!(data["status"], "healthy");
    }

    // ========================================================================
    // TEST 3: get_score before any refresh is not_found
    // ========================================================================
    #[tokio::test]
    async fn test_get_score_missing() {
        let state = seeded_state().await;
        let resp = handle_request(
            ScoreRequest::GetScore {
                legislator_id: LegislatorId::from("L1"),
            },
            &state,
        )
        .await;
        assert!(!resp.is_ok());
        assert_eq!(resp.error_kind.as_deref(), Some("not_found"));
    }

    // ========================================================================
    // TEST 4: compute does not publish; refresh does
    // ========================================================================
    #[tokio::test]
    async fn test_compute_then_refresh() {
        let state = seeded_state().await;
        oppose(&state, 5).await;
        let id = LegislatorId::from("L1");

        let resp = handle_request(
            ScoreRequest::ComputeScore {
                legislator_id: id.clone(),
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["score"], 100.0);
        assert_eq!(data["bills_analyzed"], 1);
        assert!(state.store.get_representation_score(&id).await.unwrap().is_none());

        let resp = handle_request(
            ScoreRequest::RefreshLegislator {
                legislator_id: id.clone(),
            },
            &state,
        )
        .await;
        assert!(resp.is_ok());

        let resp = handle_request(ScoreRequest::GetScore { legislator_id: id }, &state).await;
        let data = resp.data.unwrap();
        assert_eq!(data["score"], 100.0);
        assert!(data["last_calculated"].is_string());
    }

    // ========================================================================
    // TEST 5: refreshing an unknown legislator is rejected
    // ========================================================================
    #[tokio::test]
    async fn test_refresh_unknown_legislator() {
        let state = seeded_state().await;
        let resp = handle_request(
            ScoreRequest::RefreshLegislator {
                legislator_id: LegislatorId::from("ghost"),
            },
            &state,
        )
        .await;
        assert_eq!(resp.error_kind.as_deref(), Some("not_found"));
    }

    // ========================================================================
    // TEST 6: refresh_all reports updated count
    // ========================================================================
    #[tokio::test]
    async fn test_refresh_all() {
        let state = seeded_state().await;
        let resp = handle_request(ScoreRequest::RefreshAll, &state).await;
        let data = resp.data.unwrap();
        assert_eq!(data["updated"], 1);
        assert_eq!(data["errors"].as_array().unwrap().len(), 0);
        assert!(data["elapsed_ms"].is_number());
    }

    // ========================================================================
    // TEST 7: legislator profile embeds the published score
    // ========================================================================
    #[tokio::test]
    async fn test_get_legislator_with_and_without_score() {
        let state = seeded_state().await;
        let id = LegislatorId::from("L1");

        let resp = handle_request(
            ScoreRequest::GetLegislator {
                legislator_id: id.clone(),
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["display_name"], "Ada Park");
        assert!(data["score"].is_null());

        handle_request(ScoreRequest::RefreshAll, &state).await;
        let resp = handle_request(ScoreRequest::GetLegislator { legislator_id: id }, &state).await;
        assert_eq!(resp.data.unwrap()["score"]["bills_analyzed"], 0);
    }

    // ========================================================================
    // TEST 8: sentiment submit / read / remove
    // ========================================================================
    #[tokio::test]
    async fn test_sentiment_lifecycle() {
        let state = seeded_state().await;
        oppose(&state, 3).await;

        let resp = handle_request(
            ScoreRequest::BillSentiment {
                bill_id: BillId::from("HB7"),
                user_id: Some(UserId::from("u1")),
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["oppose"], 3);
        assert_eq!(data["support"], 0);
        assert_eq!(data["status"], "passed");
        assert_eq!(data["user_sentiment"], "oppose");

        let resp = handle_request(
            ScoreRequest::RemoveSentiment {
                user_id: UserId::from("u0"),
                bill_id: BillId::from("HB7"),
            },
            &state,
        )
        .await;
        assert_eq!(resp.data.unwrap()["removed"], true);

        let resp = handle_request(
            ScoreRequest::RemoveSentiment {
                user_id: UserId::from("u0"),
                bill_id: BillId::from("HB7"),
            },
            &state,
        )
        .await;
        assert_eq!(resp.data.unwrap()["removed"], false);
    }

    // ========================================================================
    // TEST 9: submitting to an unknown bill carries not_found
    // ========================================================================
    #[tokio::test]
    async fn test_submit_unknown_bill() {
        let state = seeded_state().await;
        let resp = handle_request(
            ScoreRequest::SubmitSentiment {
                user_id: UserId::from("u1"),
                bill_id: BillId::from("SB999"),
                disposition: Disposition::Support,
            },
            &state,
        )
        .await;
        assert_eq!(resp.status, "error");
        assert_eq!(resp.error_kind.as_deref(), Some("not_found"));
    }

    // ========================================================================
    // TEST 10: list_legislators joins the published score
    // ========================================================================
    #[tokio::test]
    async fn test_list_legislators() {
        let state = seeded_state().await;
        handle_request(ScoreRequest::RefreshAll, &state).await;

        let resp = handle_request(
            ScoreRequest::ListLegislators {
                filter: LegislatorFilter {
                    search: Some("par".to_string()),
                    ..LegislatorFilter::default()
                },
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["page"], 0);
        assert_eq!(data["legislators"][0]["id"], "L1");
        assert_eq!(data["legislators"][0]["jurisdiction"], "UT");
        assert_eq!(data["legislators"][0]["score"], 0.0);

        let resp = handle_request(
            ScoreRequest::ListLegislators {
                filter: LegislatorFilter {
                    limit: 0,
                    ..LegislatorFilter::default()
                },
            },
            &state,
        )
        .await;
        assert_eq!(resp.error_kind.as_deref(), Some("invalid_input"));
    }

    // ========================================================================
    // TEST 11: user_sentiments returns the caller's history
    // ========================================================================
    #[tokio::test]
    async fn test_user_sentiments() {
        let state = seeded_state().await;
        oppose(&state, 2).await;

        let resp = handle_request(
            ScoreRequest::UserSentiments {
                user_id: UserId::from("u1"),
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["user_id"], "u1");
        let rows = data["sentiments"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["bill_id"], "HB7");
        assert_eq!(rows[0]["title"], "Water Rights");
        assert_eq!(rows[0]["disposition"], "oppose");
    }
}
