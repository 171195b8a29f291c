//! Travis CI v3 client used to resolve the `service_job_id` of a Coveralls job.
//!
//! Resolution takes one request: list the repository's builds, take the first build as the
//! latest one and its last job as the latest job. Both rules rely on the API's ordering
//! (builds newest first, jobs oldest first within a build). Nothing in the response is sorted
//! or compared by timestamp.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::contract::BuildResolver;
use crate::error::ApiError;
use crate::http::ConnectionOptions;

pub const DEFAULT_BASE_URL: &str = "https://api.travis-ci.org";
pub const API_VERSION: &str = "3";
pub const USER_AGENT_VALUE: &str = "Coveralls Offline Tool";

/// Form encoding: everything but alphanumerics and `-._*` is escaped.
const SLUG_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

pub struct TravisClient {
    http: reqwest::Client,
    base_url: String,
}

impl TravisClient {
    pub fn new(token: &str) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let mut authorization = HeaderValue::from_str(&format!("token {token}"))?;
        authorization.set_sensitive(true);
        let http = ConnectionOptions::default()
            .with_header(
                HeaderName::from_static("travis-api-version"),
                HeaderValue::from_static(API_VERSION),
            )
            .with_header(AUTHORIZATION, authorization)
            .with_header(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE))
            .build_client()?;
        info!(base_url, "Initialized Travis client");
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn builds_url(&self, repository: &str) -> String {
        format!(
            "{}/repo/{}/builds",
            self.base_url,
            utf8_percent_encode(repository, SLUG_ENCODE_SET)
        )
    }

    async fn get(&self, url: &str) -> Result<Value, ApiError> {
        info!(url, "[CI] GET");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        info!(status = status.as_u16(), "[CI] Response received");
        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "[CI] Request rejected");
            return Err(ApiError::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BuildResolver for TravisClient {
    async fn latest_job_id(&self, repository: &str) -> Result<u64, ApiError> {
        let response = self.get(&self.builds_url(repository)).await?;
        let job_id = latest_job_id_from(&response)?;
        info!(repository, job_id, "[CI] Latest job resolved");
        Ok(job_id)
    }
}

/// Extracts `builds[0].jobs[last].id` from a `/repo/{slug}/builds` response.
pub fn latest_job_id_from(response: &Value) -> Result<u64, ApiError> {
    let builds = response
        .get("builds")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Shape("response has no `builds` array".into()))?;
    let latest_build = builds
        .first()
        .ok_or_else(|| ApiError::Shape("`builds` array is empty".into()))?;
    let build_id = latest_build.get("id").and_then(Value::as_u64);
    debug!(
        build_id = ?build_id,
        builds = builds.len(),
        "[CI] Taking first build as latest (API order assumed newest first)"
    );

    let jobs = latest_build
        .get("jobs")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Shape("latest build has no `jobs` array".into()))?;
    let latest_job = jobs
        .last()
        .ok_or_else(|| ApiError::Shape("latest build has an empty `jobs` array".into()))?;

    latest_job
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::Shape("latest job has no non-negative integer `id`".into()))
}
