pub mod init;
mod schema;

pub use schema::{ClusterSetQuery, Config, SourceConfig, SourceKind};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assessment::validate_thresholds;

/// Get the config directory path (~/.config/cluster-curator/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("cluster-curator")
}

/// Get the default config file path (~/.config/cluster-curator/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/cluster-curator/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run `cluster-curator init` to create one.",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

/// Validate the loaded config at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match config.source.kind {
        SourceKind::File => {
            if config.source.path.is_none() {
                errors.push("source.path: required when source.kind is 'file'".to_string());
            }
        }
        SourceKind::Api => match config.source.base_url.as_deref() {
            None => errors.push("source.base_url: required when source.kind is 'api'".to_string()),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                errors.push(format!("source.base_url: must start with http:// or https://, got '{}'", url));
            }
            Some(_) => {}
        },
    }

    for (i, set) in config.cluster_sets.iter().enumerate() {
        if set.id.trim().is_empty() {
            errors.push(format!("cluster_sets[{}].id: must not be empty", i));
        }
        for (j, pattern) in set.exclude.iter().flatten().enumerate() {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(format!(
                    "cluster_sets[{}].exclude[{}]: invalid pattern '{}' - {}",
                    i, j, pattern, e
                ));
            }
        }
    }

    if config.auto_refresh_interval == 0 {
        errors.push("auto_refresh_interval: must be at least 1 second".to_string());
    }

    if let Some(thresholds) = &config.thresholds {
        if let Err(threshold_errors) = validate_thresholds(thresholds) {
            errors.extend(threshold_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Path of the review decisions file for this config
pub fn reviews_path(config: &Config) -> PathBuf {
    config
        .reviews_path
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(|| get_config_dir().join("reviews.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Band, ThresholdConfig};

    fn file_config() -> Config {
        Config {
            source: SourceConfig {
                kind: SourceKind::File,
                path: Some(PathBuf::from("clusters.json")),
                base_url: None,
                token: None,
            },
            cluster_sets: vec![ClusterSetQuery {
                id: "set70".to_string(),
                name: None,
                exclude: None,
            }],
            thresholds: None,
            dashboard_url: None,
            reviews_path: None,
            auto_refresh_interval: 300,
        }
    }

    #[test]
    fn test_valid_file_config() {
        assert!(validate_config(&file_config()).is_ok());
    }

    #[test]
    fn test_file_source_requires_path() {
        let mut config = file_config();
        config.source.path = None;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("source.path"));
    }

    #[test]
    fn test_api_source_requires_http_url() {
        let mut config = file_config();
        config.source.kind = SourceKind::Api;
        config.source.base_url = Some("dashboard.local".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("source.base_url"));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let mut config = file_config();
        config.cluster_sets[0].exclude = Some(vec!["[".to_string()]);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("cluster_sets[0].exclude[0]"));
    }

    #[test]
    fn test_threshold_errors_included() {
        let mut config = file_config();
        config.thresholds = Some(ThresholdConfig {
            structure_consistency: Some(Band::new(0.4, 0.9)),
            ..ThresholdConfig::default()
        });
        config.auto_refresh_interval = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_reviews_path_default_and_override() {
        let mut config = file_config();
        assert!(reviews_path(&config).ends_with("cluster-curator/reviews.json"));

        config.reviews_path = Some(PathBuf::from("/tmp/reviews.json"));
        assert_eq!(reviews_path(&config), PathBuf::from("/tmp/reviews.json"));
    }

    #[test]
    fn test_expand_home_leaves_relative_paths() {
        assert_eq!(expand_home(Path::new("data/x.json")), PathBuf::from("data/x.json"));
    }

    #[test]
    fn test_load_missing_config() {
        let path = std::env::temp_dir().join("cluster_curator_test_missing_config.yaml");
        let _ = std::fs::remove_file(&path);
        let err = load_config(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join("cluster_curator_test_load_config.yaml");
        std::fs::write(&path, "source:\n  kind: file\n  path: clusters.json\n").unwrap();
        let config = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.source.kind, SourceKind::File);
        let _ = std::fs::remove_file(&path);
    }
}
