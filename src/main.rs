//! # Newsreel
//!
//! Command-line front end for the extraction pipeline.
//!
//! ## Usage
//!
//! ```sh
//! newsreel extract https://www.npr.org/2024/03/01/1234/some-story
//! newsreel -j ./json crawl --cap 5
//! newsreel sources
//! ```
//!
//! ## Flow
//!
//! 1. **Settings**: YAML file (optional) overridden by CLI flags
//! 2. **Fetch plan**: direct transport, plus the indirection service as
//!    fallback when a proxy prefix is configured
//! 3. **Work**: single extraction or a crawl batch, with progress logged
//!    from the progress bus
//! 4. **Output**: JSON to stdout, or a dated edition file

use clap::Parser;
use newsreel::config::{ProxySettings, Settings};
use newsreel::crawler::CrawlOrchestrator;
use newsreel::fetch::{DirectTransport, FetchGateway, FetchPlan, ProxyTransport};
use newsreel::models::{CrawlStatus, SourceConfig};
use newsreel::outputs::json;
use newsreel::pipeline::ArticlePipeline;
use newsreel::progress::{ProgressBus, ProgressEvent};
use newsreel::utils::ensure_writable_dir;
use newsreel::SourceRegistry;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsreel starting up");

    let args = Cli::parse();
    debug!(?args.command, ?args.json_output_dir, "Parsed CLI arguments");

    let settings = load_settings(&args)?;

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let registry = SourceRegistry::with_extra(settings.sources.clone());
    let bus = ProgressBus::new();
    bus.subscribe(log_progress);
    let pipeline = ArticlePipeline::new(build_plan(&settings)?, registry.clone(), settings.extract(), bus);

    match &args.command {
        Command::Sources => print_sources(registry.all()),
        Command::Extract { url } => {
            let article = pipeline.extract_url(url).await;
            if let Some(reason) = &article.failure {
                warn!(%url, %reason, "Extraction produced a failure record");
            }
            let edition = json::edition_now(vec![article], Vec::new());
            emit(&edition, args.json_output_dir.as_deref()).await?;
        }
        Command::Crawl {
            sources,
            cap,
            concurrency,
        } => {
            let selected = select_sources(&registry, sources)?;
            let mut crawl = settings.crawl();
            if let Some(n) = concurrency {
                crawl.concurrency = (*n).max(1);
            }
            let cap = cap.unwrap_or(crawl.per_source_cap);

            let orchestrator = CrawlOrchestrator::new(pipeline, crawl);
            let stop = orchestrator.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; stopping batch");
                    stop.stop();
                }
            });

            let articles = orchestrator.start_batch(&selected, cap).await?;
            let progress = orchestrator.progress();
            let failed_sources = progress.iter().filter(|p| p.status == CrawlStatus::Error).count();
            info!(
                articles = articles.len(),
                sources = progress.len(),
                failed_sources,
                "Crawl finished"
            );
            let edition = json::edition_now(articles, progress);
            emit(&edition, args.json_output_dir.as_deref()).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Settings file (or defaults) with CLI overrides applied.
fn load_settings(args: &Cli) -> Result<Settings, Box<dyn Error>> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(ms) = args.timeout_ms {
        settings.fetch_timeout_ms = ms;
    }
    if let Some(prefix) = &args.proxy_prefix {
        settings.proxy = Some(ProxySettings {
            prefix: prefix.clone(),
            envelope: settings.proxy.take().map(|p| p.envelope).unwrap_or_default(),
        });
    }
    settings.validate()?;
    Ok(settings)
}

fn build_plan(settings: &Settings) -> Result<FetchPlan, Box<dyn Error>> {
    let direct = DirectTransport::new()?;
    let mut plan = FetchPlan::new(FetchGateway::new(Arc::new(direct.clone())), settings.fetch_timeout());
    if let Some(proxy) = &settings.proxy {
        info!(prefix = %proxy.prefix, "Indirection service enabled as fallback");
        plan = plan.with_fallback(FetchGateway::new(Arc::new(ProxyTransport::new(direct, proxy))));
    }
    Ok(plan)
}

/// Named sources in the order given, or every enabled source.
fn select_sources(registry: &SourceRegistry, ids: &[String]) -> Result<Vec<SourceConfig>, Box<dyn Error>> {
    if ids.is_empty() {
        return Ok(registry.enabled().cloned().collect());
    }
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        match registry.get(id) {
            Some(source) => selected.push(source.clone()),
            None => return Err(format!("unknown source id: {id}").into()),
        }
    }
    Ok(selected)
}

async fn emit(edition: &newsreel::Edition, json_output_dir: Option<&str>) -> Result<(), Box<dyn Error>> {
    match json_output_dir {
        Some(dir) => {
            let path = json::write_edition(edition, dir).await?;
            info!(path = %path.display(), "Edition written");
        }
        None => println!("{}", serde_json::to_string_pretty(edition)?),
    }
    Ok(())
}

fn print_sources(sources: &[SourceConfig]) {
    println!("{:<12} {:<24} {:<10} {:<8} BASE URL", "ID", "NAME", "CATEGORY", "ENABLED");
    for s in sources {
        println!(
            "{:<12} {:<24} {:<10} {:<8} {}",
            s.id, s.name, s.category, s.enabled, s.base_url
        );
    }
}

fn log_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::BatchStarted { sources } => info!(sources = sources.len(), "Batch started"),
        ProgressEvent::Source(p) => info!(
            source = %p.source_id,
            status = ?p.status,
            progress = p.progress,
            found = p.articles_found,
            processed = p.articles_processed,
            error = p.error.as_deref().unwrap_or(""),
            "Source progress"
        ),
        ProgressEvent::Extraction { url, stage, progress, message } => debug!(
            %url,
            ?stage,
            progress,
            message = message.as_deref().unwrap_or(""),
            "Extraction stage"
        ),
        ProgressEvent::BatchCompleted { articles } => info!(articles, "Batch completed"),
        ProgressEvent::BatchCancelled => warn!("Batch cancelled"),
    }
}
