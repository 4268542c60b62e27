//! Template-Harvest main entry point
//!
//! This is the command-line interface for collecting listing records and
//! downloading the templates they point at.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use template_harvest::config::{load_config_with_hash, validate, Config};
use template_harvest::crawler::collect;
use template_harvest::download::{
    batch_progress, build_http_client, cookie_jar, parse_cookie_string, run_batch, Downloader,
    RetryPolicy,
};
use template_harvest::output::{
    print_batch_summary, print_traversal_summary, read_targets, write_manifest, write_records,
};
use template_harvest::{FileType, Section};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Template-Harvest: listing collector and template downloader
///
/// `collect` walks a paginated listing page by page and writes the records
/// it finds to CSV. `download` reads such a CSV and fetches the PDF/Word
/// template behind every record.
#[derive(Parser, Debug)]
#[command(name = "template-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Collects listing records and downloads their templates", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a listing section and write the collected records to CSV
    Collect(CollectArgs),

    /// Download the templates of the records in a CSV file
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// Listing section to crawl
    #[arg(long, value_enum)]
    section: Option<Section>,

    /// Run the page session without a visible window
    #[arg(long)]
    headless: bool,

    /// Upper bound on pages when the page count cannot be read
    #[arg(long)]
    max_pages: Option<u32>,

    /// Proxy URL for every request
    #[arg(long)]
    proxy: Option<String>,

    /// Output CSV (default: outputs_all_{section}_by_clicks.csv)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// CSV with detail_url (or file_url/detail), title (or name) and section columns
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Comma-separated file types, e.g. "pdf,word"
    #[arg(long)]
    types: Option<String>,

    /// Cookie string copied from a browser ("k=v; k2=v2")
    #[arg(long)]
    cookie: Option<String>,

    /// Number of concurrent downloads
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Collect(args) => {
            apply_collect_args(&mut config, args);
            validate(&config).context("invalid configuration")?;
            handle_collect(&config).await
        }
        Command::Download(args) => {
            let input = args.input.clone();
            apply_download_args(&mut config, args)?;
            validate(&config).context("invalid configuration")?;
            handle_download(&config, &input, cli.quiet).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("template_harvest=info,warn"),
            1 => EnvFilter::new("template_harvest=debug,info"),
            2 => EnvFilter::new("template_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_collect_args(config: &mut Config, args: CollectArgs) {
    let collect = &mut config.collect;
    if let Some(section) = args.section {
        collect.section = section;
    }
    if args.headless {
        collect.headless = true;
    }
    if let Some(max_pages) = args.max_pages {
        collect.max_pages = max_pages;
    }
    if let Some(proxy) = args.proxy {
        collect.proxy = Some(proxy).filter(|p| !p.is_empty());
    }
    if let Some(output) = args.output {
        collect.output = Some(output);
    }
}

fn apply_download_args(config: &mut Config, args: DownloadArgs) -> anyhow::Result<()> {
    let download = &mut config.download;
    if let Some(out) = args.out {
        download.out_dir = out;
    }
    if let Some(types) = args.types {
        download.types = FileType::parse_list(&types)?;
    }
    if let Some(cookie) = args.cookie {
        download.cookie = Some(cookie);
    }
    if let Some(workers) = args.workers {
        download.workers = workers;
    }
    Ok(())
}

/// Handles the `collect` subcommand
///
/// The records gathered so far are written even when navigation aborts.
async fn handle_collect(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Collecting section '{}' from {} (max {} pages)",
        config.collect.section,
        config.portal.base_url,
        config.collect.max_pages
    );

    let outcome = collect(config).await.context("collection failed")?;

    let output = config.collect.output_path();
    write_records(&output, outcome.items.values())
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !outcome.stop.is_complete() {
        tracing::warn!("Collection ended early: {}", outcome.stop);
    }
    print_traversal_summary(&outcome, &output);

    Ok(())
}

/// Handles the `download` subcommand
async fn handle_download(
    config: &Config,
    input: &std::path::Path,
    quiet: bool,
) -> anyhow::Result<()> {
    let download = &config.download;
    let targets =
        read_targets(input).with_context(|| format!("failed to read {}", input.display()))?;
    tracing::info!("Total rows: {}", targets.len());

    let base_url = Url::parse(&config.portal.base_url)?;
    let jar = download
        .cookie
        .as_deref()
        .map(parse_cookie_string)
        .filter(|cookies| !cookies.is_empty())
        .map(|cookies| cookie_jar(&cookies, &base_url));
    let client = build_http_client(&config.http, None, jar)?;

    std::fs::create_dir_all(&download.out_dir)
        .with_context(|| format!("failed to create {}", download.out_dir.display()))?;
    let out_dir = std::fs::canonicalize(&download.out_dir)?;

    let downloader = Arc::new(Downloader::new(
        client,
        base_url,
        out_dir.clone(),
        RetryPolicy::from_config(download),
    ));

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        batch_progress(targets.len())
    };
    let entries = run_batch(
        downloader,
        targets,
        &download.types,
        download.workers,
        &progress,
    )
    .await;
    let manifest = write_manifest(&out_dir, &entries)?;

    print_batch_summary(&entries, &manifest);
    Ok(())
}
