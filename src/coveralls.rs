//! Coveralls jobs endpoint client.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{error, info};

use crate::contract::ReportUploader;
pub use crate::contract::UploadOutcome;
use crate::digest::new_boundary;
use crate::error::UploadError;
use crate::http::ConnectionOptions;
use crate::multipart::MultipartWriter;

pub const DEFAULT_BASE_URL: &str = "https://coveralls.io";
pub const JOBS_PATH: &str = "/api/v1/jobs";
/// Multipart field the jobs endpoint reads the report from.
pub const REPORT_FIELD: &str = "json_file";

pub struct CoverallsClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoverallsClient {
    pub fn new() -> Result<Self, UploadError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, UploadError> {
        let http = ConnectionOptions::default().build_client()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn jobs_url(&self) -> String {
        format!("{}{}", self.base_url, JOBS_PATH)
    }
}

/// Encodes `report` as the single `json_file` part of a multipart body.
///
/// Returns the `Content-Type` header value and the finished body.
pub fn encode_report(report: &Path, boundary: &str) -> Result<(String, Vec<u8>), UploadError> {
    let content_type = format!("multipart/form-data; boundary={boundary}");
    let body = MultipartWriter::scoped(Vec::new(), boundary, |writer| {
        writer.attach_file(REPORT_FIELD, report)
    })?;
    Ok((content_type, body))
}

#[async_trait]
impl ReportUploader for CoverallsClient {
    async fn submit(&self, report: &Path) -> Result<UploadOutcome, UploadError> {
        let url = self.jobs_url();
        info!(url = %url, report = %report.display(), "[UPLOAD] POST coverage report");

        let (content_type, body) = encode_report(report, &new_boundary())?;
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        info!(
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or(""),
            "[UPLOAD] Response received"
        );
        let body = response.text().await?;
        let outcome = UploadOutcome::from_status(status.as_u16(), body);
        if !outcome.success {
            error!(
                status = outcome.status,
                body = %outcome.body,
                "[UPLOAD] Coverage service rejected report"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn encodes_report_under_json_file_field() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("coveralls.json");
        fs::write(&report, r#"{"source_files":[]}"#).unwrap();

        let (content_type, body) = encode_report(&report, "abc123").unwrap();
        let body = String::from_utf8(body).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=abc123");
        assert!(body.starts_with("--abc123\r\n"));
        assert!(body.contains("name=\"json_file\"; filename=\"coveralls.json\"\r\n"));
        assert!(body.contains("\r\n\r\n{\"source_files\":[]}\r\n"));
        assert!(body.ends_with("\r\n--abc123--"));
    }

    #[test]
    fn missing_report_is_io_error() {
        let err = encode_report(Path::new("/definitely/not/here.json"), "b").unwrap_err();
        assert!(matches!(
            err,
            UploadError::Multipart(crate::error::MultipartError::Io(_))
        ));
    }

    #[test]
    fn jobs_url_joins_base() {
        let client = CoverallsClient::with_base_url("http://localhost:1234/").unwrap();
        assert_eq!(client.jobs_url(), "http://localhost:1234/api/v1/jobs");
    }
}
