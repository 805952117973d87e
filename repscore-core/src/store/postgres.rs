use super::{CatalogStore, ScoreStore, SentimentStore, Store, VoteStore};
use crate::error::{RepscoreError, Result};
use crate::models::{
    Bill, BillId, Chamber, Disposition, Legislator, LegislatorFilter, LegislatorId,
    LegislatorSummary, RepresentationScore, TallyRow, UserId, UserSentiment, VoteRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_bill(&self, bill_id: &BillId) -> Result<Option<Bill>> {
        let row = sqlx::query_as::<_, (String, String, String, String, String, String, i32)>(
            r#"
            SELECT id, state_id, bill_type, bill_number, title, status, session_year
            FROM bills
            WHERE id = $1
            "#,
        )
        .bind(bill_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(
            |(id, jurisdiction, bill_type, bill_number, title, status, session_year)| -> Result<Bill> {
                Ok(Bill {
                    id: BillId::from(id),
                    jurisdiction,
                    bill_type,
                    bill_number,
                    title,
                    status: status.parse()?,
                    session_year,
                })
            },
        )
        .transpose()
    }

    async fn get_legislator(&self, legislator_id: &LegislatorId) -> Result<Option<Legislator>> {
        let row = sqlx::query_as::<_, LegislatorRow>(
            r#"
            SELECT id, first_name, last_name, chamber, party, state_id, is_active
            FROM legislators
            WHERE id = $1
            "#,
        )
        .bind(legislator_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(legislator_from_row).transpose()
    }

    async fn list_active_legislators(&self) -> Result<Vec<LegislatorId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM legislators WHERE is_active = TRUE ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(LegislatorId::from).collect())
    }

    async fn list_legislators(&self, filter: &LegislatorFilter) -> Result<Vec<LegislatorSummary>> {
        // Ingestion writes either the word or the letter code.
        let chamber_codes: Option<Vec<String>> = filter.chamber.map(|c| match c {
            Chamber::House => vec!["house".to_string(), "H".to_string()],
            Chamber::Senate => vec!["senate".to_string(), "S".to_string()],
        });
        let pattern = filter.search_term().map(|term| format!("%{}%", escape_like(term)));
        let offset = i64::try_from(filter.offset())
            .map_err(|_| RepscoreError::InvalidInput("page out of range".to_string()))?;

        let rows = sqlx::query_as::<_, RosterRow>(
            r#"
            SELECT l.id, l.first_name, l.last_name, l.chamber, l.party, l.state_id, l.is_active,
                   s.score::float8, s.bills_analyzed
            FROM legislators l
            LEFT JOIN representation_scores s ON s.legislator_id = l.id
            WHERE l.is_active = TRUE
              AND ($1::text[] IS NULL OR l.chamber = ANY($1))
              AND ($2::text IS NULL OR l.state_id = $2)
              AND ($3::text IS NULL OR l.first_name ILIKE $3 OR l.last_name ILIKE $3)
            ORDER BY l.last_name, l.first_name, l.id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(chamber_codes)
        .bind(filter.jurisdiction.as_deref())
        .bind(pattern)
        .bind(i64::from(filter.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(id, first_name, last_name, chamber, party, jurisdiction, active, score, bills)|
                 -> Result<LegislatorSummary> {
                    let legislator = legislator_from_row((
                        id,
                        first_name,
                        last_name,
                        chamber,
                        party,
                        jurisdiction,
                        active,
                    ))?;
                    let bills_analyzed = bills
                        .map(|n| {
                            u32::try_from(n).map_err(|_| {
                                RepscoreError::Malformed(format!("negative bills_analyzed: {n}"))
                            })
                        })
                        .transpose()?;
                    Ok(LegislatorSummary {
                        legislator,
                        score,
                        bills_analyzed,
                    })
                },
            )
            .collect()
    }
}

type LegislatorRow = (String, String, String, String, Option<String>, String, bool);

type RosterRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    bool,
    Option<f64>,
    Option<i32>,
);

fn legislator_from_row(row: LegislatorRow) -> Result<Legislator> {
    let (id, first_name, last_name, chamber, party, jurisdiction, active) = row;
    Ok(Legislator {
        id: LegislatorId::from(id),
        first_name,
        last_name,
        chamber: chamber.parse()?,
        party,
        jurisdiction,
        active,
    })
}

/// Escape `ILIKE` wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[async_trait]
impl VoteStore for PgStore {
    async fn list_votes_by_legislator(
        &self,
        legislator_id: &LegislatorId,
    ) -> Result<Vec<VoteRecord>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT bill_id, vote FROM bill_votes WHERE legislator_id = $1",
        )
        .bind(legislator_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(bill_id, vote)| -> Result<VoteRecord> {
                Ok(VoteRecord {
                    bill_id: BillId::from(bill_id),
                    outcome: vote.parse()?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SentimentStore for PgStore {
    async fn sentiment_tally_for_bills(&self, bill_ids: &[BillId]) -> Result<Vec<TallyRow>> {
        if bill_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = bill_ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, (String, String, i64)>(
            r#"
            SELECT bill_id, sentiment, COUNT(*)::bigint AS total
            FROM user_bill_sentiments
            WHERE bill_id = ANY($1)
            GROUP BY bill_id, sentiment
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(bill_id, sentiment, total)| -> Result<TallyRow> {
                Ok(TallyRow {
                    bill_id: BillId::from(bill_id),
                    disposition: sentiment.parse()?,
                    count: u64::try_from(total).map_err(|_| {
                        RepscoreError::Malformed(format!("negative sentiment count: {total}"))
                    })?,
                })
            })
            .collect()
    }

    async fn upsert_sentiment(
        &self,
        user_id: &UserId,
        bill_id: &BillId,
        disposition: Disposition,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_bill_sentiments (id, user_id, bill_id, sentiment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (user_id, bill_id) DO UPDATE SET
              sentiment = EXCLUDED.sentiment,
              updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_str())
        .bind(bill_id.as_str())
        .bind(disposition.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_sentiment(&self, user_id: &UserId, bill_id: &BillId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM user_bill_sentiments WHERE user_id = $1 AND bill_id = $2")
                .bind(user_id.as_str())
                .bind(bill_id.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_sentiment(
        &self,
        user_id: &UserId,
        bill_id: &BillId,
    ) -> Result<Option<Disposition>> {
        let sentiment: Option<String> = sqlx::query_scalar(
            "SELECT sentiment FROM user_bill_sentiments WHERE user_id = $1 AND bill_id = $2",
        )
        .bind(user_id.as_str())
        .bind(bill_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        sentiment.map(|s| s.parse()).transpose()
    }

    async fn list_sentiments_by_user(&self, user_id: &UserId) -> Result<Vec<UserSentiment>> {
        let rows = sqlx::query_as::<
            _,
            (String, String, String, String, String, String, DateTime<Utc>),
        >(
            r#"
            SELECT s.bill_id, b.bill_type, b.bill_number, b.title, b.status, s.sentiment, s.updated_at
            FROM user_bill_sentiments s
            JOIN bills b ON b.id = s.bill_id
            WHERE s.user_id = $1
            ORDER BY s.updated_at DESC, s.bill_id
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(bill_id, bill_type, bill_number, title, status, sentiment, updated_at)|
                 -> Result<UserSentiment> {
                    Ok(UserSentiment {
                        bill_id: BillId::from(bill_id),
                        bill_type,
                        bill_number,
                        title,
                        status: status.parse()?,
                        disposition: sentiment.parse()?,
                        updated_at,
                    })
                },
            )
            .collect()
    }
}

#[async_trait]
impl ScoreStore for PgStore {
    async fn upsert_representation_score(
        &self,
        legislator_id: &LegislatorId,
        score: f64,
        bills_analyzed: u32,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        let bills_analyzed = i32::try_from(bills_analyzed).map_err(|_| {
            RepscoreError::InvalidInput(format!("bills_analyzed out of range: {bills_analyzed}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO representation_scores (id, legislator_id, score, bills_analyzed, last_calculated)
            VALUES ($1, $2, $3::numeric(5, 2), $4, $5)
            ON CONFLICT (legislator_id) DO UPDATE SET
              score = EXCLUDED.score,
              bills_analyzed = EXCLUDED.bills_analyzed,
              last_calculated = EXCLUDED.last_calculated
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(legislator_id.as_str())
        .bind(score)
        .bind(bills_analyzed)
        .bind(computed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_representation_score(
        &self,
        legislator_id: &LegislatorId,
    ) -> Result<Option<RepresentationScore>> {
        let row = sqlx::query_as::<_, (String, f64, i32, DateTime<Utc>)>(
            r#"
            SELECT legislator_id, score::float8, bills_analyzed, last_calculated
            FROM representation_scores
            WHERE legislator_id = $1
            "#,
        )
        .bind(legislator_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, score, bills_analyzed, last_calculated)| -> Result<RepresentationScore> {
            Ok(RepresentationScore {
                legislator_id: LegislatorId::from(id),
                score,
                bills_analyzed: u32::try_from(bills_analyzed).map_err(|_| {
                    RepscoreError::Malformed(format!("negative bills_analyzed: {bills_analyzed}"))
                })?,
                last_calculated,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<String> {
        let version = crate::db::health_check(&self.pool).await?;
        Ok(format!("postgres: {version}"))
    }
}
