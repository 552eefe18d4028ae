//! Confidence engine: single-threaded sweep over the pending pool that merges
//! same-entity candidates, rescores everything, promotes records past the
//! threshold and expires stale ones.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use fundscout_common::{
    bare_domain, extract_domain, name_similarity, CandidateRecord, CanonicalRecord,
    ValidationStatus,
};
use fundscout_store::{InsertOutcome, RecordStore};

/// Candidates at or above this score become canonical records.
pub const PROMOTION_THRESHOLD: f64 = 0.85;

/// Fuzzy-name similarity floor for treating two candidates as one entity.
const NAME_MATCH_THRESHOLD: f64 = 0.85;

/// Relative variance within which two funding amounts corroborate each other.
const FUNDING_VARIANCE: f64 = 0.5;

/// Penalty applied when a later-dated report carries a smaller amount than an
/// earlier one, which usually means one of the two is a different round.
const DATE_INCONGRUITY_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSignal {
    ExactName,
    WebsiteMatch,
    DomainMatch,
    FundingConsistent,
    DateIncongruity,
}

/// Pairwise comparison. Identity is established by name or web presence;
/// funding and date signals only adjust confidence on an established match.
pub fn match_pair(a: &CandidateRecord, b: &CandidateRecord) -> Vec<MatchSignal> {
    let mut signals = Vec::new();

    if name_similarity(&a.name, &b.name) >= NAME_MATCH_THRESHOLD {
        signals.push(MatchSignal::ExactName);
    }

    let domain_of =
        |w: &Option<String>| w.as_deref().map(extract_domain).filter(|d| !d.is_empty());
    if let (Some(da), Some(db)) = (domain_of(&a.website), domain_of(&b.website)) {
        if da == db {
            signals.push(MatchSignal::WebsiteMatch);
        } else if bare_domain(&da) == bare_domain(&db) {
            signals.push(MatchSignal::DomainMatch);
        }
    }

    if !signals.is_empty() {
        if let (Some(fa), Some(fb)) = (a.funding_amount_usd, b.funding_amount_usd) {
            let larger = fa.max(fb) as f64;
            if larger > 0.0 && ((fa - fb).abs() as f64) / larger <= FUNDING_VARIANCE {
                signals.push(MatchSignal::FundingConsistent);
            }
            let (earlier, later) = if a.announced_at <= b.announced_at { (a, b) } else { (b, a) };
            if let (Some(fe), Some(fl)) = (earlier.funding_amount_usd, later.funding_amount_usd) {
                if fe > fl {
                    signals.push(MatchSignal::DateIncongruity);
                }
            }
        }
    }

    signals
}

pub fn is_same_entity(signals: &[MatchSignal]) -> bool {
    signals.iter().any(|s| {
        matches!(
            s,
            MatchSignal::ExactName | MatchSignal::WebsiteMatch | MatchSignal::DomainMatch
        )
    })
}

/// Evidence-weighted score in [0,1]. Starts from a flat base, adds a boost per
/// evidence item tiered on its source confidence, rewards source diversity,
/// then decays with candidate age.
pub fn score_candidate(candidate: &CandidateRecord, now: chrono::DateTime<chrono::Utc>) -> f64 {
    let mut score = 0.3;

    for ev in &candidate.evidence {
        score += match ev.confidence {
            c if c >= 0.95 => 0.25,
            c if c >= 0.90 => 0.20,
            c if c >= 0.85 => 0.15,
            c if c >= 0.80 => 0.10,
            c if c >= 0.75 => 0.05,
            _ => 0.0,
        };
    }

    let diversity = (candidate.distinct_sources() as f64 * 0.05).min(0.2);
    score += diversity;

    let age_days = (now - candidate.created_at).num_days();
    if age_days > 365 {
        score -= 0.2;
    } else if age_days > 90 {
        score -= 0.1;
    }

    score.clamp(0.0, 1.0)
}

#[derive(Debug, Default, Clone)]
pub struct SweepStats {
    pub examined: usize,
    pub merged: usize,
    pub promoted: usize,
    pub rejected: usize,
    pub flagged_for_revalidation: usize,
    /// Canonical ids produced this sweep, for enrichment enqueueing.
    pub promoted_ids: Vec<Uuid>,
}

impl std::fmt::Display for SweepStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "examined {} candidates: {} merged, {} promoted, {} rejected, {} flagged for revalidation",
            self.examined, self.merged, self.promoted, self.rejected, self.flagged_for_revalidation
        )
    }
}

pub struct ConfidenceEngine {
    store: Arc<dyn RecordStore>,
}

impl ConfidenceEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// One full pass: merge, rescore, promote, expire, flag revalidation.
    pub async fn sweep(&self) -> Result<SweepStats> {
        let now = Utc::now();
        let mut pending = self.store.list_pending().await?;
        let mut stats = SweepStats { examined: pending.len(), ..Default::default() };

        // Merge pass. Oldest-first so the earliest observation absorbs the
        // rest and keeps its id and created_at for age decay.
        pending.sort_by_key(|c| c.created_at);
        let mut merged_away: Vec<CandidateRecord> = Vec::new();
        let mut penalties: Vec<Uuid> = Vec::new();
        let mut i = 0;
        while i < pending.len() {
            let mut j = i + 1;
            while j < pending.len() {
                let signals = match_pair(&pending[i], &pending[j]);
                if is_same_entity(&signals) {
                    let younger = pending.remove(j);
                    let older = &mut pending[i];
                    absorb(older, younger.clone());
                    merged_away.push(younger);
                    if signals.contains(&MatchSignal::DateIncongruity) {
                        penalties.push(older.id);
                        warn!(
                            name = older.name.as_str(),
                            "Amount decreased across later report, possible round confusion"
                        );
                    }
                    stats.merged += 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        // Merged-away candidates stay on disk as Rejected tombstones so a
        // re-observation of the same URL does not resurrect them.
        for mut gone in merged_away {
            gone.status = ValidationStatus::Rejected;
            gone.updated_at = now;
            self.store.update_candidate(&gone).await?;
        }

        for candidate in &mut pending {
            let mut score = score_candidate(candidate, now);
            if penalties.contains(&candidate.id) {
                score = (score - DATE_INCONGRUITY_PENALTY).max(0.0);
            }
            candidate.aggregate_confidence = score;
            candidate.updated_at = now;

            if candidate.aggregate_confidence >= PROMOTION_THRESHOLD {
                let canonical = CanonicalRecord::from_candidate(candidate);
                match self.store.insert_canonical(&canonical).await? {
                    InsertOutcome::Inserted(id) => {
                        info!(
                            name = candidate.name.as_str(),
                            confidence = candidate.aggregate_confidence,
                            "Promoted candidate to canonical record"
                        );
                        stats.promoted_ids.push(id);
                    }
                    InsertOutcome::Duplicate => {
                        warn!(name = candidate.name.as_str(), "Promotion raced an existing record");
                    }
                }
                self.store.delete_candidate(candidate.id).await?;
                stats.promoted += 1;
                continue;
            }

            let age_days = (now - candidate.created_at).num_days();
            if age_days > 365 && candidate.aggregate_confidence < 0.5 {
                candidate.status = ValidationStatus::Rejected;
                self.store.update_candidate(candidate).await?;
                stats.rejected += 1;
                continue;
            }

            self.store.update_candidate(candidate).await?;
        }

        let due = self.store.list_revalidation_due(now).await?;
        stats.flagged_for_revalidation = due.len();
        for record in &due {
            info!(
                name = record.name.as_str(),
                confidence = record.confidence,
                "Canonical record due for revalidation"
            );
        }

        info!(%stats, "Confidence sweep complete");
        Ok(stats)
    }
}

/// Fold the younger candidate into the older one: evidence appends, missing
/// fields backfill, existing fields win.
fn absorb(older: &mut CandidateRecord, younger: CandidateRecord) {
    older.evidence.extend(younger.evidence);
    if older.website.is_none() {
        older.website = younger.website;
    }
    if older.description.is_none() {
        older.description = younger.description;
    }
    if older.funding_amount.is_none() {
        older.funding_amount = younger.funding_amount;
        older.funding_amount_usd = younger.funding_amount_usd;
    }
    if older.funding_round.is_none() {
        older.funding_round = younger.funding_round;
    }
    if older.industry.is_none() {
        older.industry = younger.industry;
    }
    if older.founders.is_empty() {
        older.founders = younger.founders;
    }
    for tag in younger.tags {
        if !older.tags.contains(&tag) {
            older.tags.push(tag);
        }
    }
}
