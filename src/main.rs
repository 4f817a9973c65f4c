//! mkto-crawl main entry point
//!
//! This is the command-line interface for the Marketo form crawler.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mkto_crawl::config::{load_config_with_hash, validate, Config, CrawlScope, SeedKind};
use mkto_crawl::crawler::run_crawl;
use mkto_crawl::output::{print_statistics, CsvSink};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Crawl links from a site's URL and extract Marketo form ids
///
/// Starting from URL, pages whose path contains URL's path are crawled and
/// every embedded Marketo form is written as one CSV row.
#[derive(Parser, Debug)]
#[command(name = "mkto-crawl")]
#[command(version)]
#[command(about = "Crawl a site and extract embedded Marketo form ids", long_about = None)]
struct Cli {
    /// URL of the site to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// CSV output file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Append to the CSV file instead of overwriting it
    #[arg(short, long)]
    append: bool,

    /// Treat URL as a sitemap: crawl the pages it lists without following links
    #[arg(long)]
    sitemap: bool,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Disable autothrottle. Crawls faster, but the server may block the crawler
    #[arg(long)]
    no_autothrottle: bool,

    /// Maximum delay between requests in seconds (default 60)
    #[arg(long, value_name = "SECS")]
    autothrottle_max_delay: Option<f64>,

    /// Log file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "DEBUG")]
    log_level: LogLevel,

    /// Append to the log file instead of overwriting it
    #[arg(long)]
    log_append: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level, cli.log_file.as_deref(), cli.log_append)?;

    let config = load_effective_config(&cli)?;

    let kind = if cli.sitemap {
        SeedKind::Sitemap
    } else {
        SeedKind::StartPage
    };
    let scope = CrawlScope::from_seed(&cli.url, kind)
        .with_context(|| format!("Invalid start URL {}", cli.url))?;
    tracing::info!("{}", scope.seed());

    let mut sink = CsvSink::create(&cli.output, cli.append)
        .with_context(|| format!("Failed to open output {}", cli.output.display()))?;

    let stats = match run_crawl(config, scope, &mut sink).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_statistics(&stats);
    println!("\nRecords written to {}", sink.path().display());

    Ok(())
}

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if cli.no_autothrottle {
        config.throttle.enabled = false;
    }
    if let Some(max_delay) = cli.autothrottle_max_delay {
        config.throttle.max_delay = max_delay;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the tracing subscriber: stderr always, plus an optional log file
///
/// `RUST_LOG` takes precedence over `--log-level` when set.
fn setup_logging(level: LogLevel, log_file: Option<&Path>, append: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path, append)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

fn open_log_file(path: &Path, append: bool) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path)
}
