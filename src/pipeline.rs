//! End-to-end run: JaCoCo XML → Coveralls JSON → (optional) upload.
//!
//! Steps, in order:
//!   - parse the coverage report into a [`CoverageDocument`]
//!   - crawl the source root and correlate each source file with its coverage node
//!   - build and write the Coveralls JSON report
//!   - resolve the CI job id through a [`BuildResolver`], when one is configured
//!   - submit the written report through a [`ReportUploader`], when one is given
//!
//! Source files without a coverage node are left out of the report and counted as skipped.
//! Every other failure stops the run and is returned to the caller.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::contract::{BuildResolver, ReportUploader, UploadOutcome};
use crate::crawl::crawl;
use crate::error::PipelineError;
use crate::report::{CoverallsReport, SourceFileReport};
use crate::source_index::{find_node, CoverageDocument, SourceFile};

#[derive(Debug)]
pub struct PipelineReport {
    pub output: PathBuf,
    /// Source files that made it into the report.
    pub matched: usize,
    /// Source files without a coverage node.
    pub skipped: usize,
    pub job_id: Option<String>,
    /// `None` when nothing was uploaded.
    pub outcome: Option<UploadOutcome>,
}

/// Regular files under `config.source_root` with one of the configured extensions.
pub fn collect_sources(config: &Config) -> std::io::Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    crawl(&config.source_root, |path| {
        let wanted = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| config.extensions.iter().any(|e| e == ext));
        if wanted {
            sources.push(SourceFile::new(&config.source_root, path));
        }
    })?;
    debug!(count = sources.len(), "Collected source files");
    Ok(sources)
}

/// Builds the report body; returns it with the number of skipped source files.
pub fn build_report(
    config: &Config,
    document: &CoverageDocument,
) -> Result<(CoverallsReport, usize), PipelineError> {
    let mut report = CoverallsReport::new(config.service_name.clone());
    report.repo_token = config.repo_token.clone();
    report.service_job_id = config.service_job_id.clone();

    let mut skipped = 0;
    for source in collect_sources(config)? {
        match find_node(document, &config.source_root, &source.path) {
            Some(node) => {
                debug!(file = %source.relative_name, "Matched coverage node");
                report
                    .source_files
                    .push(SourceFileReport::build(&source, node)?);
            }
            None => {
                debug!(file = %source.relative_name, "No coverage node, skipping");
                skipped += 1;
            }
        }
    }
    Ok((report, skipped))
}

pub fn write_report(report: &CoverallsReport, output: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(report)?;
    std::fs::write(output, json)?;
    info!(output = %output.display(), files = report.source_files.len(), "Wrote Coveralls report");
    Ok(())
}

pub async fn run(
    config: &Config,
    resolver: Option<&dyn BuildResolver>,
    uploader: Option<&dyn ReportUploader>,
) -> Result<PipelineReport, PipelineError> {
    info!("[RUN] Starting coverage conversion");

    let document = CoverageDocument::open(&config.coverage_report).map_err(|e| {
        error!(error = %e, "[RUN][ERROR] Failed to load coverage report");
        e
    })?;
    let (mut report, skipped) = build_report(config, &document)?;
    info!(
        matched = report.source_files.len(),
        skipped,
        relevant_lines = report.relevant_lines(),
        covered_lines = report.covered_lines(),
        "[RUN] Correlated source files"
    );

    match (config.travis.as_ref(), resolver) {
        (Some(travis), Some(resolver)) => {
            let job_id = resolver
                .latest_job_id(&travis.repository)
                .await
                .map_err(|e| {
                    error!(
                        error = %e,
                        repository = %travis.repository,
                        "[RUN][CI] Job id resolution failed"
                    );
                    e
                })?;
            info!(job_id, "[RUN][CI] Using resolved job id");
            report.service_job_id = Some(job_id.to_string());
        }
        (Some(travis), None) => {
            warn!(
                repository = %travis.repository,
                "[RUN][CI] No resolver available, keeping configured job id"
            );
        }
        _ => {}
    }

    write_report(&report, &config.output)?;

    let outcome = match uploader {
        Some(uploader) => {
            let outcome = uploader.submit(&config.output).await?;
            if !outcome.success {
                error!(status = outcome.status, "[RUN][UPLOAD] Report rejected");
                return Err(PipelineError::Rejected {
                    status: outcome.status,
                    body: outcome.body,
                });
            }
            info!(status = outcome.status, "[RUN][UPLOAD] Report accepted");
            Some(outcome)
        }
        None => None,
    };

    Ok(PipelineReport {
        output: config.output.clone(),
        matched: report.source_files.len(),
        skipped,
        job_id: report.service_job_id,
        outcome,
    })
}
