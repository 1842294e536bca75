use anyhow::{Context, Result};
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::time::Duration;

use crate::config::SourceConfig;

/// Create an HTTP client for the dashboard API, authenticated with the
/// configured bearer token when one is set.
pub fn create_client(source: &SourceConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = source.token.as_deref() {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("API token contains characters not allowed in a header")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("cluster-curator/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(15))
        .build()
        .context("Failed to create HTTP client")
}
