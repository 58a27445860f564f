use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobfinder::aggregator::Aggregator;
use jobfinder::config::{Config, CONFIG_PATH};
use jobfinder::database::{ListingStore, SqliteStore};
use jobfinder::http_client::{Fetcher, HttpFetcher};
use jobfinder::jobs::{SearchJobs, SearchStatus};
use jobfinder::models::{Platform, SearchRequest};
use jobfinder::scrapers::default_registry;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "jobfinder")]
#[command(about = "Aggregates remote job listings from several job boards", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one search pass across job boards and store new listings
    Search {
        /// Keyword to match (repeatable); defaults to default_keywords from config
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Platform to search (repeatable); defaults to every supported one
        #[arg(short, long = "platform")]
        platforms: Vec<Platform>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        job_type: Option<String>,

        /// Cap on listings taken from each platform
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Show stored listings, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Mark a stored listing as applied to
    MarkApplied {
        id: Uuid,
    },
    /// Fetch a URL through the scraper HTTP client and print or save the body
    Fetch {
        url: String,

        /// Save body to file instead of printing it
        #[arg(long)]
        save: Option<String>,
    },
    /// Write a default data/config.yaml
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig = args.command {
        Config::create_default()?;
        println!("Wrote {}", CONFIG_PATH);
        return Ok(());
    }

    let config = Config::load()?;
    init_logging(&config);

    match args.command {
        Command::Search { keywords, platforms, location, job_type, max_results } => {
            let keywords = if keywords.is_empty() { config.default_keywords.clone() } else { keywords };
            let mut request = SearchRequest::new(keywords)
                .with_max_results(max_results.unwrap_or(config.max_results_per_platform));
            if !platforms.is_empty() {
                request = request.with_platforms(platforms);
            }
            request.location = location;
            request.job_type = job_type;

            run_search(&config, request).await
        }
        Command::List { limit } => {
            let store = open_store(&config)?;
            let listings = store.recent(limit)?;
            if listings.is_empty() {
                println!("No listings stored yet");
            }
            for listing in listings {
                let applied = if listing.applied { " [applied]" } else { "" };
                println!("{} {}{}", listing.id, listing.summary_line(), applied);
            }
            Ok(())
        }
        Command::MarkApplied { id } => {
            let store = open_store(&config)?;
            let listing = store.mark_applied(&id)
                .with_context(|| format!("Failed to mark {} as applied", id))?;
            println!("Marked as applied: {}", listing.summary_line());
            Ok(())
        }
        Command::Fetch { url, save } => fetch_url(&config, &url, save.as_deref()).await,
        Command::InitConfig => Ok(()),
    }
}

fn init_logging(config: &Config) {
    // Use RUST_LOG env var if set, otherwise use config
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
        return;
    }

    let level = match config.tracing_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        other => {
            eprintln!("Invalid tracing level '{}', using 'info'", other);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .init();
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStore::new(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))
}

async fn run_search(config: &Config, request: SearchRequest) -> Result<()> {
    if request.keywords.is_empty() {
        tracing::warn!("No keywords given, every listing will score 0");
    }

    let store = Arc::new(open_store(config)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent, config.request_timeout())?);
    let aggregator = Aggregator::new(default_registry(), fetcher, store, config.request_delay());

    tracing::info!("Registered scrapers: {:?}", aggregator.platforms());

    let jobs = Arc::new(SearchJobs::new(Arc::new(aggregator)));
    let id = jobs.submit(request).await;

    let on_ctrl_c = jobs.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing with what was collected");
            on_ctrl_c.shutdown();
        }
    });

    jobs.wait(id).await;
    let report = match jobs.forget(id).await {
        Some(SearchStatus::Completed(report)) => report,
        Some(SearchStatus::Failed(message)) => anyhow::bail!("Search failed: {}", message),
        other => anyhow::bail!("Search {} did not finish: {:?}", id, other),
    };

    println!("Search results:");
    println!("{}", report);
    for listing in &report.listings {
        println!("  {}", listing.summary_line());
    }

    Ok(())
}

/// Debug helper: fetch a page with the same client identity the scrapers use
async fn fetch_url(config: &Config, url: &str, save_path: Option<&str>) -> Result<()> {
    println!("Testing URL fetch: {}", url);
    println!("User-Agent: {}", config.user_agent);

    let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout())?;
    let response = fetcher.get(url).await?;

    println!("Status: {}", response.status);
    println!("{}", "=".repeat(80));

    if let Some(path) = save_path {
        std::fs::write(path, &response.body)?;
        println!("HTML saved to: {}", path);
    } else {
        println!("{}", response.body);
        println!("{}", "=".repeat(80));
    }

    println!("Total length: {} bytes", response.body.len());

    Ok(())
}
