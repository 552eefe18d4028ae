//! Persistence for canonical and candidate records.
//!
//! `RecordStore` is the single seam between the pipeline and storage. The
//! Postgres implementation backs production; an in-memory implementation
//! (behind the `test-support` feature) backs deterministic pipeline tests —
//! no network, no database, no Docker.

mod pg;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use pg::PgStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use fundscout_common::{CandidateRecord, CanonicalRecord};

/// Outcome of a canonical insert. Duplicate-key races at the uniqueness
/// constraints on (name) and (source_url) surface as `Duplicate`, never as a
/// batch-aborting error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Uuid),
    Duplicate,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Canonical records ---

    /// Exact-match lookup by name or source URL, the intake dedup gate.
    async fn find_canonical_by_name_or_url(
        &self,
        name: &str,
        source_url: &str,
    ) -> Result<Option<CanonicalRecord>>;

    async fn insert_canonical(&self, record: &CanonicalRecord) -> Result<InsertOutcome>;

    async fn get_canonical(&self, id: Uuid) -> Result<Option<CanonicalRecord>>;

    /// Persist enrichment results. Only touches the enrichment-owned fields.
    async fn update_canonical_enrichment(
        &self,
        id: Uuid,
        website: Option<String>,
        founders: Vec<String>,
        enrichment_complete: bool,
    ) -> Result<()>;

    /// Canonical records unrevisited for 90+ days with confidence below 0.7,
    /// due for re-acquisition rather than indefinite trust.
    async fn list_revalidation_due(&self, now: DateTime<Utc>) -> Result<Vec<CanonicalRecord>>;

    // --- Candidate records (pending pool) ---

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<Uuid>;

    /// Snapshot of the full pending pool for a single-threaded sweep.
    async fn list_pending(&self) -> Result<Vec<CandidateRecord>>;

    /// Write back a candidate mutated by the confidence engine (evidence
    /// merge, score recompute, status transition).
    async fn update_candidate(&self, record: &CandidateRecord) -> Result<()>;

    /// Remove a candidate after promotion.
    async fn delete_candidate(&self, id: Uuid) -> Result<()>;
}
