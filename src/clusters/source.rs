use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

use super::cache::{CacheConfig, CachedResponse, ResponseCache};
use super::types::Cluster;
use crate::config::{expand_home, SourceConfig, SourceKind};

/// Failures talking to the dashboard API that callers branch on.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    Unauthorized(String),
    UnknownClusterSet(String),
    Api(String),
}

impl SourceError {
    /// Worth retrying: network trouble and server errors, not bad
    /// credentials or missing cluster sets.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Api(_))
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unauthorized(url) => write!(
                f,
                "Authentication failed for {}. Check source.token in your config.",
                url
            ),
            SourceError::UnknownClusterSet(set) => write!(f, "Cluster set '{}' not found", set),
            SourceError::Api(msg) => write!(f, "Dashboard API error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

/// Where cluster records are loaded from.
#[derive(Clone)]
pub enum ClusterSource {
    File {
        path: PathBuf,
    },
    Api {
        client: reqwest::Client,
        base_url: String,
        cache: Option<ResponseCache>,
    },
}

/// Export files may be a bare list or wrapped in `clusters:`.
#[derive(Deserialize)]
struct ClusterExport {
    clusters: Vec<Cluster>,
}

enum FetchOutcome {
    Fresh { etag: Option<String>, body: Vec<u8> },
    NotModified,
}

impl ClusterSource {
    pub fn from_config(source: &SourceConfig, cache_config: &CacheConfig) -> Result<Self> {
        match source.kind {
            SourceKind::File => {
                let path = source
                    .path
                    .as_deref()
                    .context("source.path is required for file sources")?;
                Ok(ClusterSource::File {
                    path: expand_home(path),
                })
            }
            SourceKind::Api => {
                let base_url = source
                    .base_url
                    .as_deref()
                    .context("source.base_url is required for api sources")?
                    .trim_end_matches('/')
                    .to_string();
                let client = super::client::create_client(source)?;
                let cache = cache_config
                    .enabled
                    .then(|| ResponseCache::new(super::cache::get_cache_path()));
                Ok(ClusterSource::Api {
                    client,
                    base_url,
                    cache,
                })
            }
        }
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        match self {
            ClusterSource::Api { cache, .. } => cache.as_ref(),
            ClusterSource::File { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ClusterSource::File { path } => format!("file {}", path.display()),
            ClusterSource::Api { base_url, .. } => format!("api {}", base_url),
        }
    }

    /// Load all clusters belonging to one cluster set
    pub async fn load_cluster_set(&self, set_id: &str) -> Result<Vec<Cluster>> {
        match self {
            ClusterSource::File { path } => {
                let clusters = read_export_file(path).await?;
                Ok(select_set(path, &clusters, set_id))
            }
            ClusterSource::Api {
                client,
                base_url,
                cache,
            } => {
                let url = cluster_set_url(base_url, set_id);
                let body = fetch_with_cache(client, &url, set_id, cache.as_ref()).await?;
                parse_clusters_json(&body)
                    .with_context(|| format!("Failed to parse clusters returned by {}", url))
            }
        }
    }

    /// Load several cluster sets. Results line up with `set_ids`.
    ///
    /// A file export is read and parsed once, so every set comes from the
    /// same snapshot. API sets are requested concurrently.
    pub async fn load_cluster_sets(&self, set_ids: &[&str]) -> Vec<Result<Vec<Cluster>>> {
        match self {
            ClusterSource::File { path } => match read_export_file(path).await {
                Ok(clusters) => set_ids
                    .iter()
                    .map(|id| Ok(select_set(path, &clusters, id)))
                    .collect(),
                Err(e) => {
                    let msg = format!("{:#}", e);
                    set_ids.iter().map(|_| Err(anyhow::anyhow!(msg.clone()))).collect()
                }
            },
            ClusterSource::Api { .. } => {
                let mut pending: FuturesUnordered<_> = set_ids
                    .iter()
                    .enumerate()
                    .map(|(index, id)| async move { (index, self.load_cluster_set(id).await) })
                    .collect();

                let mut finished = Vec::with_capacity(set_ids.len());
                while let Some(done) = pending.next().await {
                    finished.push(done);
                }
                // Completion order varies from run to run
                finished.sort_by_key(|(index, _)| *index);
                finished.into_iter().map(|(_, result)| result).collect()
            }
        }
    }
}

fn select_set(path: &Path, clusters: &[Cluster], set_id: &str) -> Vec<Cluster> {
    let selected: Vec<Cluster> = clusters
        .iter()
        .filter(|c| c.cluster_set == set_id)
        .cloned()
        .collect();
    if selected.is_empty() {
        tracing::warn!(set_id, path = %path.display(), "no clusters for cluster set in export");
    }
    selected
}

pub fn cluster_set_url(base_url: &str, set_id: &str) -> String {
    format!(
        "{}/api/cluster-sets/{}/clusters",
        base_url.trim_end_matches('/'),
        set_id
    )
}

async fn read_export_file(path: &Path) -> Result<Vec<Cluster>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read cluster export at {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let parsed = if is_yaml {
        parse_clusters_yaml(&content)
    } else {
        parse_clusters_json(content.as_bytes())
    };
    parsed.with_context(|| format!("Failed to parse cluster export at {}", path.display()))
}

/// Whether an export's top level is a mapping (`clusters: [...]`) rather than
/// a bare list. Decides which shape to parse so that errors point at the
/// offending record instead of at the other shape.
fn is_wrapped_export(content: &str) -> bool {
    content
        .lines()
        .map(str::trim_start)
        .find(|line| !line.is_empty() && !line.starts_with('#') && *line != "---")
        .is_some_and(|line| !line.starts_with('-') && !line.starts_with('['))
}

fn parse_clusters_json(bytes: &[u8]) -> Result<Vec<Cluster>> {
    if bytes.trim_ascii_start().starts_with(b"{") {
        let export: ClusterExport = serde_json::from_slice(bytes)?;
        return Ok(export.clusters);
    }
    let clusters: Vec<Cluster> = serde_json::from_slice(bytes)?;
    Ok(clusters)
}

fn parse_clusters_yaml(content: &str) -> Result<Vec<Cluster>> {
    if is_wrapped_export(content) {
        let export: ClusterExport =
            serde_saphyr::from_str(content).map_err(|e| anyhow::anyhow!("invalid YAML: {}", e))?;
        return Ok(export.clusters);
    }
    let clusters: Vec<Cluster> =
        serde_saphyr::from_str(content).map_err(|e| anyhow::anyhow!("invalid YAML: {}", e))?;
    Ok(clusters)
}

async fn fetch_with_cache(
    client: &reqwest::Client,
    url: &str,
    set_id: &str,
    cache: Option<&ResponseCache>,
) -> Result<Vec<u8>> {
    let cached = cache.and_then(|c| c.lookup(url));
    let etag = cached.as_ref().and_then(|c| c.etag.clone());

    // Retry strategy: exponential backoff with 3 attempts
    let retry_strategy = ExponentialBackoff::from_millis(100)
        .max_delay(std::time::Duration::from_secs(5))
        .take(3);

    let outcome = RetryIf::spawn(
        retry_strategy,
        || fetch_once(client, url, set_id, etag.as_deref()),
        |e: &SourceError| e.is_transient(),
    )
    .await?;

    match (outcome, cached) {
        (FetchOutcome::NotModified, Some(entry)) => {
            tracing::debug!(url, "not modified, using cached response");
            Ok(entry.body)
        }
        (FetchOutcome::NotModified, None) => {
            Err(SourceError::Api(format!("{} answered 304 without a cached copy", url)).into())
        }
        (FetchOutcome::Fresh { etag, body }, _) => {
            if let Some(cache) = cache {
                cache.store(
                    url,
                    CachedResponse {
                        etag,
                        body: body.clone(),
                        fetched_at: Utc::now(),
                    },
                );
            }
            Ok(body)
        }
    }
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    set_id: &str,
    etag: Option<&str>,
) -> Result<FetchOutcome, SourceError> {
    let mut request = client.get(url);
    if let Some(etag) = etag {
        request = request.header(http::header::IF_NONE_MATCH, etag);
    }

    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Api(format!("request to {} failed: {}", url, e)))?;

    let status = response.status();
    if status == http::StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }
    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
        return Err(SourceError::Unauthorized(url.to_string()));
    }
    if status == http::StatusCode::NOT_FOUND {
        return Err(SourceError::UnknownClusterSet(set_id.to_string()));
    }
    if !status.is_success() {
        return Err(SourceError::Api(format!("{} returned HTTP {}", url, status)));
    }

    let etag = response
        .headers()
        .get(http::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response
        .bytes()
        .await
        .map_err(|e| SourceError::Api(format!("failed to read body from {}: {}", url, e)))?;

    Ok(FetchOutcome::Fresh {
        etag,
        body: body.to_vec(),
    })
}
