//! Shared connection setup for the Coveralls and Travis clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};
use reqwest::redirect::Policy;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport defaults plus headers a specific API adds to every request.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            extra_headers: Vec::new(),
        }
    }
}

impl ConnectionOptions {
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    /// Builds a client that never follows redirects and asks intermediaries not to cache.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), value.clone());
        }
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .redirect(Policy::none())
            .default_headers(headers)
            .build()
    }
}
