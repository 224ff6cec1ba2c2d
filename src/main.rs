// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Command-line interface for the tempo-digest binary.
//!
//! Each subcommand runs one pipeline and prints its notification lines to
//! stdout. Diagnostics go to stderr through `tracing`, so stdout stays
//! machine-consumable.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use chrono::{DateTime, Local, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use tempo_digest::{
    AggregateTotals, BatchOrchestrator, ConfigFile, DEFAULT_PREFIX, Error, Fetch, HttpFetcher,
    LineSink, RepositoryAnalyzer, RepositoryConfig, RepositoryOverrides, RepositoryReport,
    WeatherAnalyzer, WeatherConfig, WeatherOverrides, batch_progress_bar, load_config,
    render_failure, render_repository_digest, render_weather, write_report,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line interface for the digest pipelines.
#[derive(Debug, Parser,)]
#[command(name = "tempo-digest", version, about = "Render repository and weather digests")]
struct Cli
{
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported pipelines.
enum Command
{
    /// Summarize stars, forks, recent commits and releases of repositories.
    Repos(ReposArgs,),
    /// Report current conditions and today's forecast for a city.
    Weather(WeatherArgs,),
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `repos` subcommand.
struct ReposArgs
{
    /// Optional YAML file with a `repositories:` section.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Comma-delimited `owner/name` list.
    #[arg(long = "repos", env = "GITHUB_REPOS", value_name = "LIST")]
    repos: Option<String,>,

    /// API token sent as `Authorization: token <TOKEN>`.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String,>,

    /// Recent commits fetched per repository.
    #[arg(long = "commits", env = "GITHUB_COMMIT_COUNT", value_name = "N")]
    commits: Option<usize,>,

    /// Base URL of the repository API.
    #[arg(long = "api-base", env = "GITHUB_API_BASE", value_name = "URL")]
    api_base: Option<String,>,

    /// Repositories analyzed at the same time.
    #[arg(long = "concurrency", value_name = "N")]
    concurrency: Option<usize,>,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64,>,

    /// Also write the detailed results as JSON.
    #[arg(long = "report", value_name = "PATH")]
    report: Option<PathBuf,>,

    /// Text written before every notification line.
    #[arg(long = "prefix", default_value = DEFAULT_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `weather` subcommand.
struct WeatherArgs
{
    /// Optional YAML file with a `weather:` section.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// City to report on.
    #[arg(long = "city", env = "WEATHER_CITY")]
    city: Option<String,>,

    /// Language code of the condition description.
    #[arg(long = "lang", env = "WEATHER_LANG")]
    lang: Option<String,>,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64,>,

    /// Text written before every notification line.
    #[arg(long = "prefix", default_value = DEFAULT_PREFIX)]
    prefix: String,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();

    if let Err(error,) = run(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_target(false,).with_writer(io::stderr,).init();
}

/// Executes the selected pipeline.
///
/// # Errors
///
/// Propagates configuration, batch, report and sink errors.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    match cli.command {
        Command::Repos(args,) => run_repos(args,).await,
        Command::Weather(args,) => run_weather(args,).await,
    }
}

fn load_optional_config(path: Option<&Path,>,) -> Result<ConfigFile, Error,>
{
    match path {
        Some(path,) => load_config(path,),
        None => Ok(ConfigFile::default(),),
    }
}

async fn run_repos(args: ReposArgs,) -> Result<(), Error,>
{
    let file = load_optional_config(args.config.as_deref(),)?;
    let overrides = RepositoryOverrides {
        targets:      args.repos,
        token:        args.token,
        commit_count: args.commits,
        api_base:     args.api_base,
        concurrency:  args.concurrency,
        timeout_secs: args.timeout_secs,
    };
    let config = RepositoryConfig::resolve(&file.repositories, overrides,)?;

    if config.token.is_none() {
        warn!("GITHUB_TOKEN is not set; unauthenticated requests are rate limited");
    }
    info!("Analyzing {} repositories", config.targets.len());

    let fetcher = HttpFetcher::new(config.timeout,)?;
    let mut sink = LineSink::new(io::stdout(), args.prefix,);
    repository_pipeline(fetcher, &config, &Local::now(), args.report.as_deref(), &mut sink,).await
}

/// Runs the repository batch and emits its notification.
///
/// On batch failure the failure notification is emitted before the error is
/// returned.
async fn repository_pipeline<F, Tz, W,>(
    fetcher: F,
    config: &RepositoryConfig,
    now: &DateTime<Tz,>,
    report: Option<&Path,>,
    sink: &mut LineSink<W,>,
) -> Result<(), Error,>
where
    F: Fetch,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    W: Write,
{
    let utc_now = now.with_timezone(&Utc,);
    let analyzer = RepositoryAnalyzer::new(fetcher, config, utc_now,);
    let orchestrator = BatchOrchestrator::new(&analyzer,)
        .with_concurrency(config.concurrency,)
        .with_progress(batch_progress_bar(config.targets.len(),),);

    let batch = match orchestrator.run(&config.targets,).await {
        Ok(batch,) => batch,
        Err(error,) => {
            if let Error::BatchFailed {
                failures, ..
            } = &error
            {
                sink.emit_all(render_failure("GitHub stats failed", failures,),)?;
            }
            return Err(error,);
        }
    };

    let totals = AggregateTotals::from_batch(&batch,);
    if let Some(path,) = report {
        write_report(path, &RepositoryReport::new(&batch, &totals, utc_now,),)?;
    }

    sink.emit_all(render_repository_digest(&batch, &totals, now,),)?;
    info!("GitHub stats sent for {} of {} repositories", batch.succeeded(), batch.attempted);
    Ok((),)
}

async fn run_weather(args: WeatherArgs,) -> Result<(), Error,>
{
    let file = load_optional_config(args.config.as_deref(),)?;
    let overrides = WeatherOverrides {
        city: args.city, lang: args.lang, timeout_secs: args.timeout_secs,
    };
    let config = WeatherConfig::resolve(&file.weather, overrides,)?;

    let fetcher = HttpFetcher::new(config.timeout,)?;
    let mut sink = LineSink::new(io::stdout(), args.prefix,);
    weather_pipeline(fetcher, &config, &Local::now(), &mut sink,).await
}

/// Runs the single-city batch and emits its notification.
async fn weather_pipeline<F, Tz, W,>(
    fetcher: F,
    config: &WeatherConfig,
    now: &DateTime<Tz,>,
    sink: &mut LineSink<W,>,
) -> Result<(), Error,>
where
    F: Fetch,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    W: Write,
{
    let analyzer = WeatherAnalyzer::new(fetcher, config,);
    let targets = [config.city.clone()];

    let batch = match BatchOrchestrator::new(&analyzer,).run(&targets,).await {
        Ok(batch,) => batch,
        Err(error,) => {
            if let Error::BatchFailed {
                failures, ..
            } = &error
            {
                sink.emit_all(render_failure("Weather fetch failed", failures,),)?;
            }
            return Err(error,);
        }
    };

    for record in &batch.records {
        sink.emit_all(render_weather(record, now,),)?;
    }
    info!("Weather report sent for {}", config.city);
    Ok((),)
}
