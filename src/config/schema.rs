use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::assessment::ThresholdConfig;

fn default_auto_refresh_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub source: SourceConfig,

    #[serde(default)]
    pub cluster_sets: Vec<ClusterSetQuery>,

    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Base URL of the web dashboard, used to open cluster pages
    #[serde(default)]
    pub dashboard_url: Option<String>,

    /// Where review decisions are stored (default: <config dir>/reviews.json)
    #[serde(default)]
    pub reviews_path: Option<PathBuf>,

    /// Seconds between TUI auto-refreshes
    #[serde(default = "default_auto_refresh_interval")]
    pub auto_refresh_interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Api,
}

/// Where cluster records come from.
///
/// `kind: file` reads a JSON or YAML export at `path`.
/// `kind: api` queries `{base_url}/api/cluster-sets/{id}/clusters`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token sent to the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSetQuery {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Glob patterns on cluster ids to leave out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl ClusterSetQuery {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
source:
  kind: api
  base_url: https://dashboard.example.org
  token: secret
cluster_sets:
  - id: set70
    name: "70% identity"
    exclude: ["*_singleton"]
  - id: set40
thresholds:
  tgroup_homogeneity: { high: 0.9, low: 0.6 }
dashboard_url: https://dashboard.example.org
auto_refresh_interval: 60
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.source.kind, SourceKind::Api);
        assert_eq!(config.source.token.as_deref(), Some("secret"));
        assert_eq!(config.cluster_sets.len(), 2);
        assert_eq!(config.cluster_sets[0].display_name(), "70% identity");
        assert_eq!(config.cluster_sets[1].display_name(), "set40");
        assert!(config.thresholds.is_some());
        assert_eq!(config.auto_refresh_interval, 60);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let yaml = r#"
source:
  kind: file
  path: clusters.json
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.source.kind, SourceKind::File);
        assert!(config.cluster_sets.is_empty());
        assert!(config.thresholds.is_none());
        assert!(config.reviews_path.is_none());
        assert_eq!(config.auto_refresh_interval, 300);
    }

    #[test]
    fn test_unknown_source_kind_rejected() {
        let yaml = r#"
source:
  kind: postgres
"#;
        let result: Result<Config, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }
}
