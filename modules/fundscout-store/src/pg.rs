// Postgres persistence for canonical and candidate records.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use fundscout_common::{CandidateRecord, CanonicalRecord, Evidence, ValidationStatus};

use crate::{InsertOutcome, RecordStore};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Migrations failed")?;
        Ok(())
    }
}

// --- Row types ---

#[derive(Debug, sqlx::FromRow)]
struct CanonicalRow {
    id: Uuid,
    name: String,
    canonical_name: String,
    description: Option<String>,
    website: Option<String>,
    funding_amount: Option<String>,
    funding_amount_usd: Option<i64>,
    funding_round: Option<String>,
    announced_at: NaiveDate,
    founders: serde_json::Value,
    industry: Option<String>,
    tags: serde_json::Value,
    confidence: f64,
    source_name: String,
    source_url: String,
    enrichment_complete: bool,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl From<CanonicalRow> for CanonicalRecord {
    fn from(r: CanonicalRow) -> Self {
        CanonicalRecord {
            id: r.id,
            name: r.name,
            canonical_name: r.canonical_name,
            description: r.description,
            website: r.website,
            funding_amount: r.funding_amount,
            funding_amount_usd: r.funding_amount_usd,
            funding_round: r.funding_round,
            announced_at: r.announced_at,
            founders: string_list(r.founders),
            industry: r.industry,
            tags: string_list(r.tags),
            confidence: r.confidence,
            source_name: r.source_name,
            source_url: r.source_url,
            enrichment_complete: r.enrichment_complete,
            created_at: r.created_at,
            last_seen_at: r.last_seen_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    name: String,
    canonical_name: String,
    description: Option<String>,
    website: Option<String>,
    funding_amount: Option<String>,
    funding_amount_usd: Option<i64>,
    funding_round: Option<String>,
    announced_at: NaiveDate,
    founders: serde_json::Value,
    industry: Option<String>,
    tags: serde_json::Value,
    evidence: serde_json::Value,
    aggregate_confidence: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateRecord {
    fn from(r: CandidateRow) -> Self {
        let evidence: Vec<Evidence> = serde_json::from_value(r.evidence).unwrap_or_default();
        CandidateRecord {
            id: r.id,
            name: r.name,
            canonical_name: r.canonical_name,
            description: r.description,
            website: r.website,
            funding_amount: r.funding_amount,
            funding_amount_usd: r.funding_amount_usd,
            funding_round: r.funding_round,
            announced_at: r.announced_at,
            founders: string_list(r.founders),
            industry: r.industry,
            tags: string_list(r.tags),
            evidence,
            aggregate_confidence: r.aggregate_confidence,
            status: ValidationStatus::from_str_loose(&r.status),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn json_list(items: &[String]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_else(|_| serde_json::json!([]))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_canonical_by_name_or_url(
        &self,
        name: &str,
        source_url: &str,
    ) -> Result<Option<CanonicalRecord>> {
        let row = sqlx::query_as::<_, CanonicalRow>(
            r#"
            SELECT * FROM canonical_records
            WHERE name = $1 OR source_url = $2
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_canonical(&self, record: &CanonicalRecord) -> Result<InsertOutcome> {
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO canonical_records
                (id, name, canonical_name, description, website,
                 funding_amount, funding_amount_usd, funding_round, announced_at,
                 founders, industry, tags, confidence,
                 source_name, source_url, enrichment_complete, created_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING id
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.canonical_name)
        .bind(&record.description)
        .bind(&record.website)
        .bind(&record.funding_amount)
        .bind(record.funding_amount_usd)
        .bind(&record.funding_round)
        .bind(record.announced_at)
        .bind(json_list(&record.founders))
        .bind(&record.industry)
        .bind(json_list(&record.tags))
        .bind(record.confidence)
        .bind(&record.source_name)
        .bind(&record.source_url)
        .bind(record.enrichment_complete)
        .bind(record.created_at)
        .bind(record.last_seen_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(InsertOutcome::Inserted(id)),
            Err(e) if is_unique_violation(&e) => {
                warn!(name = record.name.as_str(), "Canonical insert lost a duplicate race");
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_canonical(&self, id: Uuid) -> Result<Option<CanonicalRecord>> {
        let row = sqlx::query_as::<_, CanonicalRow>(
            "SELECT * FROM canonical_records WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_canonical_enrichment(
        &self,
        id: Uuid,
        website: Option<String>,
        founders: Vec<String>,
        enrichment_complete: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE canonical_records
            SET website = COALESCE($2, website),
                founders = CASE WHEN jsonb_array_length($3) > 0 THEN $3 ELSE founders END,
                enrichment_complete = $4,
                last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(website)
        .bind(json_list(&founders))
        .bind(enrichment_complete)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_revalidation_due(&self, now: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let rows = sqlx::query_as::<_, CanonicalRow>(
            r#"
            SELECT * FROM canonical_records
            WHERE last_seen_at < $1 - INTERVAL '90 days'
              AND confidence < 0.7
            ORDER BY last_seen_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO candidate_records
                (id, name, canonical_name, description, website,
                 funding_amount, funding_amount_usd, funding_round, announced_at,
                 founders, industry, tags, evidence,
                 aggregate_confidence, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.canonical_name)
        .bind(&record.description)
        .bind(&record.website)
        .bind(&record.funding_amount)
        .bind(record.funding_amount_usd)
        .bind(&record.funding_round)
        .bind(record.announced_at)
        .bind(json_list(&record.founders))
        .bind(&record.industry)
        .bind(json_list(&record.tags))
        .bind(serde_json::to_value(&record.evidence)?)
        .bind(record.aggregate_confidence)
        .bind(record.status.to_string())
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_pending(&self) -> Result<Vec<CandidateRecord>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT * FROM candidate_records
            WHERE status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_candidate(&self, record: &CandidateRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE candidate_records
            SET evidence = $2,
                aggregate_confidence = $3,
                status = $4,
                funding_amount = $5,
                funding_amount_usd = $6,
                website = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(serde_json::to_value(&record.evidence)?)
        .bind(record.aggregate_confidence)
        .bind(record.status.to_string())
        .bind(&record.funding_amount)
        .bind(record.funding_amount_usd)
        .bind(&record.website)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM candidate_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
