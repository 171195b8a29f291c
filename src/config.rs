// cofftool/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::report::DEFAULT_SERVICE_NAME;

/// Everything one conversion/upload run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JaCoCo XML report.
    pub coverage_report: PathBuf,
    /// Directory the package paths in the report are relative to (e.g. `src/main/java`).
    pub source_root: PathBuf,
    /// Where the Coveralls JSON is written before upload.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Source file extensions considered during the crawl.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Used when no Travis repository is configured.
    #[serde(default)]
    pub service_job_id: Option<String>,
    /// Secret; normally injected from `COVERALLS_REPO_TOKEN`.
    #[serde(default, skip_serializing)]
    pub repo_token: Option<String>,
    #[serde(default)]
    pub coveralls_url: Option<String>,
    #[serde(default)]
    pub travis: Option<TravisConfig>,
}

/// Travis lookup of the `service_job_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravisConfig {
    /// `owner/name` slug.
    pub repository: String,
    /// Secret; normally injected from `TRAVIS_TOKEN`.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_output() -> PathBuf {
    PathBuf::from("coveralls.json")
}

fn default_extensions() -> Vec<String> {
    vec!["java".to_string()]
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Config {
    pub fn new(coverage_report: PathBuf, source_root: PathBuf) -> Self {
        Self {
            coverage_report,
            source_root,
            output: default_output(),
            extensions: default_extensions(),
            service_name: default_service_name(),
            service_job_id: None,
            repo_token: None,
            coveralls_url: None,
            travis: None,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            coverage_report = %self.coverage_report.display(),
            source_root = %self.source_root.display(),
            output = %self.output.display(),
            repo_token_set = self.repo_token.is_some(),
            travis_repository = self
                .travis
                .as_ref()
                .map(|t| t.repository.as_str())
                .unwrap_or("-"),
            "Loaded Config"
        );
        debug!(
            extensions = ?self.extensions,
            service_name = %self.service_name,
            "Config loaded (details)"
        );
    }
}
