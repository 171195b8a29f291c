//! # contract: seams between the pipeline and remote services
//!
//! The pipeline only talks to the CI API and the coverage service through the traits below,
//! so tests can swap in the `mockall` generated [`MockBuildResolver`] and
//! [`MockReportUploader`].
//!
//! - [`BuildResolver`]: resolves the latest CI job id of a repository (Travis CI in production).
//! - [`ReportUploader`]: submits a written JSON report (Coveralls in production).
//!
//! Both are `Send + Sync` and async. Errors are the typed enums from [`crate::error`].

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ApiError, UploadError};

/// Result of one submission. A rejected report is not an error, just `success == false`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub status: u16,
    /// Raw response (or error) body, kept for diagnostics.
    pub body: String,
}

impl UploadOutcome {
    /// Only an exact 200 counts as success.
    pub fn from_status(status: u16, body: String) -> Self {
        Self {
            success: status == 200,
            status,
            body,
        }
    }
}

/// Resolves CI job identifiers.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait BuildResolver: Send + Sync {
    /// Job id of the most recent job of the most recent build of `repository` (`owner/name`).
    async fn latest_job_id(&self, repository: &str) -> Result<u64, ApiError>;
}

/// Submits coverage reports to a coverage service.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ReportUploader: Send + Sync {
    /// Uploads the report file in a single round trip, without retries.
    async fn submit(&self, report: &Path) -> Result<UploadOutcome, UploadError>;
}
