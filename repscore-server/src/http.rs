//! Repscore HTTP REST API
//!
//! Axum server exposing published scores, manual refresh and constituent
//! sentiment. Runs alongside the Unix socket IPC server (port 8787 by default).
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, serde_json::Value)`. Inner functions build an IPC
//! request and go through the same router as the socket, so both surfaces
//! share validation and error kinds.
//!
//! Endpoints:
//! - GET    /health                         : store health
//! - GET    /version                        : server version info
//! - GET    /legislators                    : roster page (chamber, state, search, page, limit)
//! - GET    /legislators/:id                : legislator plus published score
//! - GET    /legislators/:id/score          : published score
//! - POST   /legislators/:id/score/refresh  : recompute and publish one score
//! - POST   /refresh                        : full refresh cycle (bearer secret)
//! - GET    /bills/:id/sentiment[?user_id=] : support/oppose totals, plus own stance
//! - PUT    /bills/:id/sentiment            : submit a user's stance
//! - DELETE /bills/:id/sentiment?user_id=   : withdraw a user's stance
//! - GET    /users/:id/sentiments           : a user's stances, newest first

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use repscore_core::ipc::{ScoreRequest, ScoreResponse};
use repscore_core::{
    BillId, Chamber, Disposition, LegislatorFilter, LegislatorId, Store, UserId,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::router::{handle_request, ServiceState};

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/legislators", get(list_legislators_handler))
        .route("/legislators/:id", get(legislator_handler))
        .route("/legislators/:id/score", get(score_handler))
        .route("/legislators/:id/score/refresh", post(refresh_legislator_handler))
        .route("/refresh", post(refresh_all_handler))
        .route(
            "/bills/:id/sentiment",
            get(bill_sentiment_handler)
                .put(submit_sentiment_handler)
                .delete(remove_sentiment_handler),
        )
        .route("/users/:id/sentiments", get(user_sentiments_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<ServiceState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Repscore HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct SentimentBody {
    pub user_id: Option<String>,
    pub disposition: Option<String>,
}

/// `?user_id=` on the bill sentiment routes.
#[derive(Debug, Deserialize, Default)]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RosterQuery {
    pub chamber: Option<String>,
    /// State code, e.g. `UT`.
    pub state: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check: asks the store and returns (status_code, json_body).
pub async fn health_inner(state: &ServiceState) -> (StatusCode, serde_json::Value) {
    match state.store.health_check().await {
        Ok(backend) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": backend,
                "socket": state.config.service.socket_path,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "repscore/1",
    })
}

pub async fn legislator_inner(state: &ServiceState, id: String) -> (StatusCode, serde_json::Value) {
    dispatch(
        state,
        ScoreRequest::GetLegislator {
            legislator_id: LegislatorId::new(id),
        },
    )
    .await
}

/// Inner roster listing: query strings become a `LegislatorFilter`.
pub async fn list_legislators_inner(
    state: &ServiceState,
    query: RosterQuery,
) -> (StatusCode, serde_json::Value) {
    let chamber = match query.chamber.as_deref().map(str::parse::<Chamber>) {
        Some(Ok(c)) => Some(c),
        Some(Err(_)) => return invalid_input("chamber must be \"house\" or \"senate\""),
        None => None,
    };
    let defaults = LegislatorFilter::default();
    let filter = LegislatorFilter {
        chamber,
        jurisdiction: query.state.filter(|s| !s.trim().is_empty()),
        search: query.search,
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };

    dispatch(state, ScoreRequest::ListLegislators { filter }).await
}

pub async fn score_inner(state: &ServiceState, id: String) -> (StatusCode, serde_json::Value) {
    dispatch(
        state,
        ScoreRequest::GetScore {
            legislator_id: LegislatorId::new(id),
        },
    )
    .await
}

pub async fn refresh_legislator_inner(
    state: &ServiceState,
    id: String,
) -> (StatusCode, serde_json::Value) {
    dispatch(
        state,
        ScoreRequest::RefreshLegislator {
            legislator_id: LegislatorId::new(id),
        },
    )
    .await
}

/// Inner full refresh: checks the bearer secret, then runs one cycle.
pub async fn refresh_all_inner(
    state: &ServiceState,
    authorization: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    if !bearer_matches(state.config.http.cron_secret.as_deref(), authorization) {
        tracing::warn!("Rejected refresh request with missing or invalid secret");
        return error_body(StatusCode::UNAUTHORIZED, "Unauthorized", Some("unauthorized"));
    }
    dispatch(state, ScoreRequest::RefreshAll).await
}

pub async fn bill_sentiment_inner(
    state: &ServiceState,
    bill_id: String,
    query: UserIdQuery,
) -> (StatusCode, serde_json::Value) {
    dispatch(
        state,
        ScoreRequest::BillSentiment {
            bill_id: BillId::new(bill_id),
            user_id: query.user_id.map(UserId::new),
        },
    )
    .await
}

pub async fn user_sentiments_inner(
    state: &ServiceState,
    user_id: String,
) -> (StatusCode, serde_json::Value) {
    dispatch(
        state,
        ScoreRequest::UserSentiments {
            user_id: UserId::new(user_id),
        },
    )
    .await
}

/// Inner submit: validates the body before it reaches the router.
pub async fn submit_sentiment_inner(
    state: &ServiceState,
    bill_id: String,
    body: SentimentBody,
) -> (StatusCode, serde_json::Value) {
    let user_id = match body.user_id {
        Some(u) => u,
        None => return invalid_input("user_id field is required"),
    };
    let disposition = match body.disposition.as_deref().map(str::parse::<Disposition>) {
        Some(Ok(d)) => d,
        Some(Err(_)) => return invalid_input("disposition must be \"support\" or \"oppose\""),
        None => return invalid_input("disposition field is required"),
    };

    dispatch(
        state,
        ScoreRequest::SubmitSentiment {
            user_id: UserId::new(user_id),
            bill_id: BillId::new(bill_id),
            disposition,
        },
    )
    .await
}

pub async fn remove_sentiment_inner(
    state: &ServiceState,
    bill_id: String,
    query: UserIdQuery,
) -> (StatusCode, serde_json::Value) {
    let user_id = match query.user_id {
        Some(u) => u,
        None => return invalid_input("user_id query parameter is required"),
    };

    dispatch(
        state,
        ScoreRequest::RemoveSentiment {
            user_id: UserId::new(user_id),
            bill_id: BillId::new(bill_id),
        },
    )
    .await
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_legislators_handler(
    State(state): State<Arc<ServiceState>>,
    Query(query): Query<RosterQuery>,
) -> impl IntoResponse {
    let (status, body) = list_legislators_inner(&state, query).await;
    (status, Json(body))
}

pub async fn legislator_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = legislator_inner(&state, id).await;
    (status, Json(body))
}

pub async fn score_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = score_inner(&state, id).await;
    (status, Json(body))
}

pub async fn refresh_legislator_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = refresh_legislator_inner(&state, id).await;
    (status, Json(body))
}

pub async fn refresh_all_handler(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let (status, body) = refresh_all_inner(&state, authorization).await;
    (status, Json(body))
}

pub async fn bill_sentiment_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    Query(query): Query<UserIdQuery>,
) -> impl IntoResponse {
    let (status, body) = bill_sentiment_inner(&state, id, query).await;
    (status, Json(body))
}

pub async fn user_sentiments_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = user_sentiments_inner(&state, id).await;
    (status, Json(body))
}

pub async fn submit_sentiment_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    Json(body): Json<SentimentBody>,
) -> impl IntoResponse {
    let (status, body) = submit_sentiment_inner(&state, id, body).await;
    (status, Json(body))
}

pub async fn remove_sentiment_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    Query(query): Query<UserIdQuery>,
) -> impl IntoResponse {
    let (status, body) = remove_sentiment_inner(&state, id, query).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

async fn dispatch(state: &ServiceState, request: ScoreRequest) -> (StatusCode, serde_json::Value) {
    response_to_http(handle_request(request, state).await)
}

/// Convert an IPC `ScoreResponse` into an HTTP status and body.
pub fn response_to_http(response: ScoreResponse) -> (StatusCode, serde_json::Value) {
    if response.is_ok() {
        return (
            StatusCode::OK,
            response.data.unwrap_or(serde_json::json!({})),
        );
    }
    let kind = response.error_kind.as_deref();
    let message = response
        .error
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());
    error_body(status_for_kind(kind), message, kind)
}

/// HTTP status for a `RepscoreError::kind()` tag.
pub fn status_for_kind(kind: Option<&str>) -> StatusCode {
    match kind {
        Some("invalid_input") => StatusCode::BAD_REQUEST,
        Some("unauthorized") => StatusCode::UNAUTHORIZED,
        Some("not_found") => StatusCode::NOT_FOUND,
        Some("rate_limited") => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `true` only when a secret is configured and the header carries exactly it.
pub fn bearer_matches(secret: Option<&str>, authorization: Option<&str>) -> bool {
    match (secret, authorization.and_then(|h| h.strip_prefix("Bearer "))) {
        (Some(secret), Some(token)) => !secret.is_empty() && token == secret,
        _ => false,
    }
}

fn invalid_input(message: &str) -> (StatusCode, serde_json::Value) {
    error_body(StatusCode::BAD_REQUEST, message, Some("invalid_input"))
}

fn error_body(
    status: StatusCode,
    message: impl Into<String>,
    kind: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    (
        status,
        serde_json::json!({
            "error": message.into(),
            "kind": kind,
            "status": "error",
        }),
    )
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use repscore_core::{Bill, BillStatus, MemoryStore, RepscoreConfig, RepscoreError};

    fn make_state(cron_secret: Option<&str>) -> ServiceState {
        let mut config = RepscoreConfig::from_toml_str(
            r#"
            [service]
            socket_path = "/tmp/repscore.sock"
            log_level = "info"

            [database]
            url = "postgresql://localhost/unused"
            max_connections = 1
            "#,
        )
        .unwrap();
        config.http.cron_secret = cron_secret.map(str::to_string);
        ServiceState::new(Arc::new(MemoryStore::new()), config)
    }

    async fn state_with_bill() -> ServiceState {
        let store = MemoryStore::new();
        store
            .insert_bill(Bill {
                id: BillId::from("SB12"),
                jurisdiction: "UT".to_string(),
                bill_type: "SB".to_string(),
                bill_number: "12".to_string(),
                title: "Transit Funding".to_string(),
                status: BillStatus::InCommittee,
                session_year: 2025,
            })
            .await;
        let base = make_state(None);
        ServiceState::new(Arc::new(store), base.config)
    }

    // ========================================================================
    // TEST 1: version_inner is pure and returns correct fields
    // ========================================================================
    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "repscore/1");
    }

    // ========================================================================
    // TEST 2: response_to_http: ok response extracts data
    // ========================================================================
    #[test]
    fn test_response_to_http_ok() {
        let (status, body) = response_to_http(ScoreResponse::ok(serde_json::json!({"updated": 3})));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 3);
    }

    // ========================================================================
    // TEST 3: response_to_http: error kinds map to status codes
    // ========================================================================
    #[test]
    fn test_response_to_http_maps_kinds() {
        let cases = [
            (RepscoreError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (RepscoreError::Unauthorized, StatusCode::UNAUTHORIZED),
            (RepscoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                RepscoreError::RateLimited { retry_after_secs: 5 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (RepscoreError::Other("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, body) = response_to_http(ScoreResponse::from_error(&err));
            assert_eq!(status, expected, "for {err:?}");
            assert_eq!(body["status"], "error");
            assert_eq!(body["kind"], err.kind());
        }
    }

    // ========================================================================
    // TEST 4: response_to_http: error without a kind or message
    // ========================================================================
    #[test]
    fn test_response_to_http_error_no_message() {
        let mut resp = ScoreResponse::err("x");
        resp.error = None;
        let (status, body) = response_to_http(resp);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "unknown error");
        assert!(body["kind"].is_null());
    }

    // ========================================================================
    // TEST 5: bearer_matches
    // ========================================================================
    #[test]
    fn test_bearer_matches() {
        assert!(bearer_matches(Some("s3cret"), Some("Bearer s3cret")));
        assert!(!bearer_matches(Some("s3cret"), Some("Bearer wrong")));
        assert!(!bearer_matches(Some("s3cret"), Some("s3cret")));
        assert!(!bearer_matches(Some("s3cret"), None));
        assert!(!bearer_matches(None, Some("Bearer anything")));
        assert!(!bearer_matches(Some(""), Some("Bearer ")));
    }

    // ========================================================================
    // TEST 6: health_inner against the memory store
    // ========================================================================
    #[tokio::test]
    async fn test_health_inner_ok() {
        let state = make_state(None);
        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["socket"], "/tmp/repscore.sock");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    // ========================================================================
    // TEST 7: refresh_all_inner: no secret configured rejects everything
    // ========================================================================
    #[tokio::test]
    async fn test_refresh_all_without_configured_secret() {
        let state = make_state(None);
        let (status, _) = refresh_all_inner(&state, Some("Bearer guess")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // ========================================================================
    // TEST 8: refresh_all_inner: correct secret runs the cycle
    // ========================================================================
    #[tokio::test]
    async fn test_refresh_all_with_secret() {
        let state = make_state(Some("cron-token"));

        let (status, body) = refresh_all_inner(&state, Some("Bearer cron-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 0);
        assert!(body["errors"].is_array());

        let (status, _) = refresh_all_inner(&state, Some("Bearer nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // ========================================================================
    // TEST 9: submit_sentiment_inner: body validation
    // ========================================================================
    #[tokio::test]
    async fn test_submit_sentiment_inner_validation() {
        let state = state_with_bill().await;

        let (status, _) = submit_sentiment_inner(
            &state,
            "SB12".to_string(),
            SentimentBody {
                user_id: None,
                disposition: Some("support".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = submit_sentiment_inner(
            &state,
            "SB12".to_string(),
            SentimentBody {
                user_id: Some("u1".to_string()),
                disposition: Some("maybe".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (status, _) = submit_sentiment_inner(
            &state,
            "SB12".to_string(),
            SentimentBody {
                user_id: Some("  ".to_string()),
                disposition: Some("oppose".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // TEST 10: submit then read then remove
    // ========================================================================
    #[tokio::test]
    async fn test_sentiment_inner_lifecycle() {
        let state = state_with_bill().await;

        let (status, body) = submit_sentiment_inner(
            &state,
            "SB12".to_string(),
            SentimentBody {
                user_id: Some("u1".to_string()),
                disposition: Some("support".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body:?}");

        let (status, body) =
            bill_sentiment_inner(&state, "SB12".to_string(), UserIdQuery::default()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["support"], 1);
        assert_eq!(body["status"], "in_committee");
        assert!(body["user_sentiment"].is_null());

        let (_, body) = bill_sentiment_inner(
            &state,
            "SB12".to_string(),
            UserIdQuery {
                user_id: Some("u1".to_string()),
            },
        )
        .await;
        assert_eq!(body["user_sentiment"], "support");

        let (status, body) = remove_sentiment_inner(
            &state,
            "SB12".to_string(),
            UserIdQuery {
                user_id: Some("u1".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], true);

        let (status, _) =
            remove_sentiment_inner(&state, "SB12".to_string(), UserIdQuery::default())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // TEST 11: unknown legislator / score → 404
    // ========================================================================
    #[tokio::test]
    async fn test_unknown_legislator_is_404() {
        let state = make_state(None);
        let (status, _) = legislator_inner(&state, "ghost".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = score_inner(&state, "ghost".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = refresh_legislator_inner(&state, "ghost".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // TEST 12: list_legislators_inner: query validation
    // ========================================================================
    #[tokio::test]
    async fn test_list_legislators_inner_validation() {
        let state = make_state(None);

        let (status, body) = list_legislators_inner(&state, RosterQuery::default()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], 20);
        assert_eq!(body["legislators"], serde_json::json!([]));

        let (status, body) = list_legislators_inner(
            &state,
            RosterQuery {
                chamber: Some("assembly".to_string()),
                ..RosterQuery::default()
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (status, _) = list_legislators_inner(
            &state,
            RosterQuery {
                limit: Some(1000),
                ..RosterQuery::default()
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
