//! Error taxonomy for the coverage conversion and upload pipeline.
//!
//! Every network operation is attempted once; failures are surfaced to the caller as one of
//! these variants and never defaulted away.

use thiserror::Error;

/// Reading or parsing the coverage XML report failed.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("failed to read coverage report: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed coverage XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Misuse of the multipart writer or a failing sink.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// Programming error: the writer was used outside of its `Open` state.
    #[error("multipart writer misuse: {0}")]
    IllegalState(&'static str),
    #[error("multipart sink error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the CI API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("CI API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid CI API token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("CI API responded with {status}: {body}")]
    Transport { status: u16, body: String },
    #[error("CI API returned malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The JSON parsed, but does not have the expected builds/jobs layout.
    #[error("unexpected CI API response shape: {0}")]
    Shape(String),
}

/// Failures submitting a report to the coverage service.
///
/// A non-200 reply is not an error; it is reported through
/// [`UploadOutcome`](crate::coveralls::UploadOutcome).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("failed to read report file: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure of an end-to-end pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Coverage(#[from] CoverageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("source crawl failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("coverage service rejected the report with {status}: {body}")]
    Rejected { status: u16, body: String },
}
