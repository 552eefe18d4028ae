use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use fundscout_common::Config;
use fundscout_extract::{CompanyExtractor, ExtractionGateway};
use fundscout_fetch::{HttpFetcher, PageFetcher, SerperNewsSearcher, SerperSearcher, WebSearcher};
use fundscout_scout::collectors::build_collectors;
use fundscout_scout::enrich::EnrichmentQueue;
use fundscout_scout::scout::Scout;
use fundscout_scout::sources::default_sources;
use fundscout_search::{SearchOrchestrator, SearchTier};
use fundscout_store::PgStore;

/// Poll interval while waiting for the enrichment queue to drain.
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "fundscout", about = "Startup funding-event scout")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one full collection cycle: collect, extract, intake, sweep, enrich.
    Run,
    /// Sweep the pending pool only: merge, rescore, promote, expire.
    Sweep,
    /// On-demand search-and-extract query.
    Search {
        query: String,
        #[arg(long, default_value = "free")]
        tier: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    store.migrate().await?;

    let claude = Claude::new(config.anthropic_api_key.as_str(), config.extraction_model.as_str());
    let extractor: Arc<dyn CompanyExtractor> = Arc::new(ExtractionGateway::new(claude));
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new());
    let searcher: Arc<dyn WebSearcher> = Arc::new(SerperSearcher::new(&config.serper_api_key));

    match cli.command {
        Command::Run => {
            let enrichment = EnrichmentQueue::new(
                store.clone(),
                searcher.clone(),
                extractor.clone(),
                Duration::from_secs(config.enrichment_delay_secs),
            );
            let collectors = build_collectors(&default_sources(), fetcher, searcher);
            let scout = Scout::new(collectors, extractor, store, enrichment.clone());

            let stats = scout.run().await?;
            println!("{stats}");

            info!("Waiting for enrichment queue to drain");
            enrichment.idle_wait(IDLE_POLL).await;
        }
        Command::Sweep => {
            let enrichment = EnrichmentQueue::new(
                store.clone(),
                searcher.clone(),
                extractor.clone(),
                Duration::from_secs(config.enrichment_delay_secs),
            );
            let scout = Scout::new(Vec::new(), extractor, store, enrichment.clone());

            let stats = scout.sweep().await?;
            println!("{stats}");

            enrichment.idle_wait(IDLE_POLL).await;
        }
        Command::Search { query, tier, page } => {
            let tier = SearchTier::from_str_loose(&tier);
            let mut searchers: HashMap<String, Arc<dyn WebSearcher>> = HashMap::new();
            searchers.insert("web".to_string(), searcher);
            searchers.insert(
                "news".to_string(),
                Arc::new(SerperNewsSearcher::new(&config.serper_api_key)),
            );

            let orchestrator = SearchOrchestrator::new(searchers, extractor, fetcher);
            let outcome = orchestrator.search(&query, &tier, page).await?;

            println!(
                "page {}/{} ({} companies from {} results, {} failed calls)",
                outcome.page,
                outcome.total_pages,
                outcome.total_companies,
                outcome.results_considered,
                outcome.failed_sources.len()
            );
            for company in &outcome.companies {
                println!(
                    "- {} [{}] {} ({})",
                    company.name,
                    company.funding_round.as_deref().unwrap_or("?"),
                    company.funding_amount.as_deref().unwrap_or("undisclosed"),
                    company.website.as_deref().unwrap_or("no website")
                );
            }
        }
    }

    Ok(())
}
