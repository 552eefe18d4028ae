//! Top-level pipeline: run every collector, extract each harvested item,
//! push the results through intake, then sweep the pending pool and hand
//! promoted records to the enrichment queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use fundscout_extract::{CompanyExtractor, Extraction};
use fundscout_store::RecordStore;

use crate::collectors::Collector;
use crate::engine::ConfidenceEngine;
use crate::enrich::EnrichmentQueue;
use crate::intake::{IntakeFilter, IntakeOutcome};

#[derive(Debug, Default, Clone)]
pub struct SourceStats {
    pub processed: u32,
    pub errors: u32,
    pub extracted: u32,
    pub promoted: u32,
    pub queued: u32,
    pub duplicates: u32,
    pub rejected: u32,
}

#[derive(Debug, Default, Clone)]
pub struct ScoutStats {
    pub per_source: BTreeMap<String, SourceStats>,
    pub sweep_merged: usize,
    pub sweep_promoted: usize,
    pub sweep_rejected: usize,
}

impl ScoutStats {
    fn totals(&self) -> SourceStats {
        let mut t = SourceStats::default();
        for s in self.per_source.values() {
            t.processed += s.processed;
            t.errors += s.errors;
            t.extracted += s.extracted;
            t.promoted += s.promoted;
            t.queued += s.queued;
            t.duplicates += s.duplicates;
            t.rejected += s.rejected;
        }
        t
    }
}

impl std::fmt::Display for ScoutStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.totals();
        writeln!(
            f,
            "processed {} items ({} errors): {} extracted, {} promoted, {} queued, {} duplicate, {} rejected",
            t.processed, t.errors, t.extracted, t.promoted, t.queued, t.duplicates, t.rejected
        )?;
        for (name, s) in &self.per_source {
            writeln!(
                f,
                "  {name}: {} items, {} errors, {} extracted",
                s.processed, s.errors, s.extracted
            )?;
        }
        write!(
            f,
            "sweep: {} merged, {} promoted, {} rejected",
            self.sweep_merged, self.sweep_promoted, self.sweep_rejected
        )
    }
}

pub struct Scout {
    collectors: Vec<Box<dyn Collector>>,
    extractor: Arc<dyn CompanyExtractor>,
    intake: IntakeFilter,
    engine: ConfidenceEngine,
    enrichment: EnrichmentQueue,
}

impl Scout {
    pub fn new(
        collectors: Vec<Box<dyn Collector>>,
        extractor: Arc<dyn CompanyExtractor>,
        store: Arc<dyn RecordStore>,
        enrichment: EnrichmentQueue,
    ) -> Self {
        Self {
            collectors,
            extractor,
            intake: IntakeFilter::new(store.clone()),
            engine: ConfidenceEngine::new(store),
            enrichment,
        }
    }

    /// One full collection cycle. Collectors run sequentially; a failing
    /// collector is logged and skipped, never fatal to the cycle.
    pub async fn run(&self) -> Result<ScoutStats> {
        let mut stats = ScoutStats::default();

        for collector in &self.collectors {
            let source = collector.source().clone();
            info!(source = source.name.as_str(), kind = %source.kind, "Collecting");

            let batch = match collector.scrape().await {
                Ok(batch) => batch,
                Err(err) => {
                    error!(source = source.name.as_str(), error = %err, "Collector failed");
                    stats.per_source.entry(source.name.clone()).or_default().errors += 1;
                    continue;
                }
            };

            let entry = stats.per_source.entry(source.name.clone()).or_default();
            entry.processed += batch.processed;
            entry.errors += batch.errors;

            for item in &batch.items {
                let hint = item.published_at.map(|ts| ts.date_naive());
                let company = match self.extractor.extract(&item.text, hint).await {
                    Extraction::Valid(company) => company,
                    // Not a funding event; expected for most items, not an error.
                    Extraction::Invalid { .. } => continue,
                };
                entry.extracted += 1;

                match self.intake.process(&company, &source, &item.source_url).await {
                    Ok(IntakeOutcome::Promoted(id)) => {
                        entry.promoted += 1;
                        self.enrichment.enqueue(id);
                    }
                    Ok(IntakeOutcome::Queued(_)) => entry.queued += 1,
                    Ok(IntakeOutcome::Duplicate) => entry.duplicates += 1,
                    Ok(IntakeOutcome::Rejected(reason)) => {
                        entry.rejected += 1;
                        info!(
                            name = company.name.as_str(),
                            reason = %reason,
                            "Intake rejected extraction"
                        );
                    }
                    Err(err) => {
                        entry.errors += 1;
                        warn!(source = source.name.as_str(), error = %err, "Intake write failed");
                    }
                }
            }
        }

        let sweep = self.engine.sweep().await?;
        stats.sweep_merged = sweep.merged;
        stats.sweep_promoted = sweep.promoted;
        stats.sweep_rejected = sweep.rejected;
        for id in sweep.promoted_ids {
            self.enrichment.enqueue(id);
        }

        info!("Scout cycle complete\n{stats}");
        Ok(stats)
    }

    /// Sweep-only entry point for the standalone subcommand.
    pub async fn sweep(&self) -> Result<ScoutStats> {
        let sweep = self.engine.sweep().await?;
        let mut stats = ScoutStats::default();
        stats.sweep_merged = sweep.merged;
        stats.sweep_promoted = sweep.promoted;
        stats.sweep_rejected = sweep.rejected;
        for id in sweep.promoted_ids {
            self.enrichment.enqueue(id);
        }
        Ok(stats)
    }
}
