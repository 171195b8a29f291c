//! # cofftool CLI
//!
//! Command parsing and wiring only: the conversion/upload pipeline lives in
//! [`crate::pipeline`], the API clients in [`crate::coveralls`] and [`crate::travis`].
//!
//! - `cofftool convert` writes the Coveralls JSON without touching the network.
//! - `cofftool submit` additionally resolves the Travis job id (when configured) and uploads.
//!
//! Settings come from an optional YAML file (`--config`); flags override file values and
//! secrets always come from the environment (`COVERALLS_REPO_TOKEN`, `TRAVIS_TOKEN`).
use crate::config::{Config, TravisConfig};
use crate::contract::{BuildResolver, ReportUploader};
use crate::coveralls::CoverallsClient;
use crate::load_config::{apply_env_secrets, load_config, TRAVIS_TOKEN_VAR};
use crate::pipeline::{self, PipelineReport};
use crate::travis::TravisClient;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Offline Coveralls uploader for JaCoCo coverage reports.
#[derive(Parser, Debug)]
#[clap(
    name = "cofftool",
    version,
    about = "Convert JaCoCo XML coverage into a Coveralls job and submit it"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the Coveralls JSON report only
    Convert(RunArgs),
    /// Write the Coveralls JSON report and upload it
    Submit(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// JaCoCo XML report
    #[clap(long)]
    pub report: Option<PathBuf>,
    /// Source root the report's package paths are relative to
    #[clap(long)]
    pub sources: Option<PathBuf>,
    /// Output path of the Coveralls JSON
    #[clap(long)]
    pub output: Option<PathBuf>,
    /// Travis repository slug (owner/name) to resolve the job id from
    #[clap(long)]
    pub travis_repository: Option<String>,
    /// Explicit service job id, used when no Travis repository is given
    #[clap(long)]
    pub service_job_id: Option<String>,
}

/// Merges the config file (if any) with command line overrides and environment secrets.
///
/// A loaded config file already carries its secrets, so they are read from the environment
/// once either way.
pub fn resolve_config(args: &RunArgs) -> Result<Config> {
    let from_file = args.config.is_some();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let report = args
                .report
                .clone()
                .context("--report is required without --config")?;
            let sources = args
                .sources
                .clone()
                .context("--sources is required without --config")?;
            Config::new(report, sources)
        }
    };

    if let Some(report) = &args.report {
        config.coverage_report = report.clone();
    }
    if let Some(sources) = &args.sources {
        config.source_root = sources.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(job_id) = &args.service_job_id {
        config.service_job_id = Some(job_id.clone());
    }
    if let Some(repository) = &args.travis_repository {
        match config.travis.as_mut() {
            Some(travis) => travis.repository = repository.clone(),
            None => {
                config.travis = Some(TravisConfig {
                    repository: repository.clone(),
                    token: from_file
                        .then(|| std::env::var(TRAVIS_TOKEN_VAR).ok())
                        .flatten(),
                    api_url: None,
                })
            }
        }
    }

    if !from_file {
        apply_env_secrets(&mut config);
    }
    Ok(config)
}

fn travis_client(config: &Config) -> Result<Option<TravisClient>> {
    let Some(travis) = config.travis.as_ref() else {
        return Ok(None);
    };
    let token = travis
        .token
        .as_deref()
        .context("TRAVIS_TOKEN must be set to resolve the Travis job id")?;
    let client = match travis.api_url.as_deref() {
        Some(url) => TravisClient::with_base_url(url, token)?,
        None => TravisClient::new(token)?,
    };
    Ok(Some(client))
}

fn coveralls_client(config: &Config) -> Result<CoverallsClient> {
    Ok(match config.coveralls_url.as_deref() {
        Some(url) => CoverallsClient::with_base_url(url)?,
        None => CoverallsClient::new()?,
    })
}

fn summarise(command: &str, report: &PipelineReport) {
    tracing::info!(
        command,
        output = %report.output.display(),
        matched = report.matched,
        skipped = report.skipped,
        job_id = report.job_id.as_deref().unwrap_or("-"),
        uploaded = report.outcome.is_some(),
        "Run complete"
    );
    println!(
        "Wrote {} ({} source files, {} skipped)",
        report.output.display(),
        report.matched,
        report.skipped
    );
    if let Some(outcome) = &report.outcome {
        println!("Coveralls accepted the report ({})", outcome.status);
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Convert(args) => {
            let config = resolve_config(&args)?;
            let report = pipeline::run(&config, None, None)
                .await
                .context("Conversion failed")?;
            summarise("convert", &report);
        }
        Commands::Submit(args) => {
            let config = resolve_config(&args)?;
            let travis = travis_client(&config)?;
            let coveralls = coveralls_client(&config)?;
            let report = pipeline::run(
                &config,
                travis.as_ref().map(|c| c as &dyn BuildResolver),
                Some(&coveralls as &dyn ReportUploader),
            )
            .await
            .context("Submission failed")?;
            summarise("submit", &report);
        }
    }
    Ok(())
}
