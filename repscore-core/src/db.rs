use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

/// Tables the score engine reads and writes. Ingestion owns `legislators`,
/// `bills` and `bill_votes`; they are declared here so a fresh database is usable.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS legislators (
    id          TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    party       TEXT,
    chamber     TEXT NOT NULL,
    state_id    TEXT NOT NULL DEFAULT '',
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS bills (
    id            TEXT PRIMARY KEY,
    bill_type     TEXT NOT NULL,
    bill_number   TEXT NOT NULL,
    title         TEXT NOT NULL,
    status        TEXT NOT NULL,
    state_id      TEXT NOT NULL,
    session_year  INTEGER NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS bill_votes (
    id             UUID PRIMARY KEY,
    bill_id        TEXT NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
    legislator_id  TEXT NOT NULL REFERENCES legislators(id) ON DELETE CASCADE,
    vote           TEXT NOT NULL,
    vote_date      TIMESTAMPTZ,
    UNIQUE (bill_id, legislator_id)
);
CREATE INDEX IF NOT EXISTS bill_votes_legislator_idx ON bill_votes(legislator_id);

CREATE TABLE IF NOT EXISTS user_bill_sentiments (
    id          UUID PRIMARY KEY,
    user_id     TEXT NOT NULL,
    bill_id     TEXT NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
    sentiment   TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, bill_id)
);
CREATE INDEX IF NOT EXISTS sentiments_bill_idx ON user_bill_sentiments(bill_id);

CREATE TABLE IF NOT EXISTS representation_scores (
    id               UUID PRIMARY KEY,
    legislator_id    TEXT NOT NULL UNIQUE REFERENCES legislators(id) ON DELETE CASCADE,
    score            NUMERIC(5, 2) NOT NULL,
    bills_analyzed   INTEGER NOT NULL DEFAULT 0,
    last_calculated  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Connect with exponential backoff; gives up after `connect_retries` retries.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let strategy = ExponentialBackoff::from_millis(200)
        .map(jitter)
        .take(config.connect_retries);

    Retry::spawn(strategy, || async {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Database connect attempt failed"))
    })
    .await
}

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
