use anyhow::Result;
use clap::{Parser, Subcommand};
use omnicrawl::config::Settings;
use omnicrawl::crawl::{CrawlEngine, CrawlOutcome};
use omnicrawl::discovery::{visited, DiscoveryEngine};
use omnicrawl::http::HttpFetcher;
use omnicrawl::logging::configure_logging;
use omnicrawl::model::{CandidateArticle, CycleReport, DiscoveredUrl};
use omnicrawl::orchestrator::{Orchestrator, RunTotals};
use omnicrawl::util::truncate_text;
use omnicrawl::TARGET_PIPELINE;
use prettytable::{Cell, Row as PrettyRow, Table};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[clap(name = "omnicrawl", about = "Discover, crawl, enrich and store news articles")]
struct Cli {
    /// YAML settings file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single cycle and print its report
    Run,

    /// Run cycles until Ctrl-C, finishing the cycle in progress
    Watch,

    /// List the URLs the next cycle would crawl, without marking them visited
    Discover {
        /// Number of URLs to show
        #[clap(short, long, default_value = "50")]
        limit: usize,
    },

    /// Run the crawl strategies against one URL and print the result
    Crawl {
        #[clap(required = true)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let settings = Settings::load(cli.config.as_deref())?;
            let orchestrator = Orchestrator::from_settings(&settings).await?;
            let report = orchestrator.run_cycle().await;
            print_report(&report);
        }
        Commands::Watch => {
            let settings = Settings::load(cli.config.as_deref())?;
            let orchestrator = Orchestrator::from_settings(&settings).await?;

            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_err() {
                    error!(target: TARGET_PIPELINE, "Failed to listen for ctrl-c");
                    return;
                }
                info!(target: TARGET_PIPELINE, "Ctrl-C received, stopping after the current cycle");
                let _ = cancel_tx.send(true);
            });

            let totals = orchestrator.run_loop(cancel_rx).await;
            print_totals(&totals);
        }
        Commands::Discover { limit } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let fetcher = HttpFetcher::new(settings.crawler.request_timeout())?;
            let visited = visited::from_settings(&settings.visited, &settings.storage.redis_url)?;
            let discovery = DiscoveryEngine::new(fetcher, settings.enabled_sources(), Arc::from(visited));
            let urls = discovery.preview().await;
            print_discovered(&urls, limit);
        }
        Commands::Crawl { url } => {
            let settings = Settings::load_unchecked(cli.config.as_deref())?;
            let fetcher = HttpFetcher::new(settings.crawler.request_timeout())?;
            let engine = CrawlEngine::with_default_strategies(fetcher);
            match engine.crawl(&url).await {
                CrawlOutcome::Found(candidate) => print_candidate(&candidate),
                CrawlOutcome::NotFound => {
                    println!("No strategy ({}) produced usable content for {}", engine.strategy_names().join(", "), url);
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &CycleReport) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![Cell::new("Metric"), Cell::new("Value")]));
    for (name, value) in [
        ("URLs discovered", report.urls_discovered.to_string()),
        ("Articles crawled", report.articles_crawled.to_string()),
        ("Articles enriched", report.articles_enriched.to_string()),
        ("Articles stored", report.articles_stored.to_string()),
        ("Errors", report.errors.to_string()),
        ("Cycle time", format!("{:.1}s", report.cycle_time_seconds)),
        ("Success rate", format!("{:.1}%", report.success_rate * 100.0)),
    ] {
        table.add_row(PrettyRow::new(vec![Cell::new(name), Cell::new(&value)]));
    }
    table.printstd();
}

fn print_totals(totals: &RunTotals) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![Cell::new("Total"), Cell::new("Value")]));
    for (name, value) in [
        ("Cycles", totals.cycles.to_string()),
        ("Uptime", format!("{}s", totals.uptime().as_secs())),
        ("URLs discovered", totals.urls_discovered.to_string()),
        ("Articles crawled", totals.articles_crawled.to_string()),
        ("Articles enriched", totals.articles_enriched.to_string()),
        ("Articles stored", totals.articles_stored.to_string()),
        ("Errors", totals.errors.to_string()),
        ("Articles per hour", format!("{:.1}", totals.articles_per_hour())),
    ] {
        table.add_row(PrettyRow::new(vec![Cell::new(name), Cell::new(&value)]));
    }
    table.printstd();
}

fn print_discovered(urls: &[DiscoveredUrl], limit: usize) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Priority"),
        Cell::new("Source"),
        Cell::new("URL"),
        Cell::new("Title"),
    ]));
    for url in urls.iter().take(limit) {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&url.priority.to_string()),
            Cell::new(&url.source.to_string()),
            Cell::new(&url.url),
            Cell::new(&url.title.as_deref().map(|t| truncate_text(t, 60)).unwrap_or_default()),
        ]));
    }
    table.printstd();
    println!("{} new URLs ({} shown)", urls.len(), urls.len().min(limit));
}

fn print_candidate(candidate: &CandidateArticle) {
    let mut table = Table::new();
    for (name, value) in [
        ("Strategy", candidate.engine_used.clone()),
        ("Crawl time", format!("{:.2}s", candidate.crawl_time)),
        ("Title", candidate.title.clone()),
        ("Domain", candidate.domain.clone()),
        ("Authors", candidate.authors.join(", ")),
        ("Published", candidate.publish_date.clone().unwrap_or_default()),
        ("Language", candidate.language.clone()),
        ("Images", candidate.images.len().to_string()),
        ("Characters", candidate.content.chars().count().to_string()),
        ("Content", truncate_text(&candidate.content, 300)),
    ] {
        table.add_row(PrettyRow::new(vec![Cell::new(name), Cell::new(&value)]));
    }
    table.printstd();
}
