use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::assessment::{AssessmentCache, ClassificationAssessment, ThresholdConfig};
use crate::clusters::{Cluster, ClusterSource};
use crate::config::{ClusterSetQuery, Config};
use crate::review::{filter_reviewed, filter_unreviewed, ReviewState};

/// A cluster paired with its computed assessment
pub type AssessedCluster = (Cluster, ClassificationAssessment);

/// Load clusters from every configured cluster set, deduplicate by id and
/// drop excluded ids.
///
/// Sets are loaded concurrently but merged in config order, so when a cluster
/// id appears in more than one set the copy from the earliest configured set
/// wins. A set that fails to load is logged and skipped; an error is returned
/// only when every set fails.
pub async fn load_clusters(source: &ClusterSource, config: &Config) -> Result<Vec<Cluster>> {
    tracing::debug!("Loading {} cluster set(s) from {}", config.cluster_sets.len(), source.describe());

    let set_ids: Vec<&str> = config.cluster_sets.iter().map(|s| s.id.as_str()).collect();
    let results = source.load_cluster_sets(&set_ids).await;

    let mut all_clusters = Vec::new();
    let mut any_succeeded = false;

    for (set, result) in config.cluster_sets.iter().zip(results) {
        match result {
            Ok(clusters) => {
                tracing::debug!("Found {} clusters in {}", clusters.len(), set.display_name());
                let before = clusters.len();
                let kept = apply_excludes(clusters, set);
                if kept.len() != before {
                    tracing::debug!("Excluded {} clusters from {}", before - kept.len(), set.display_name());
                }
                all_clusters.extend(kept);
                any_succeeded = true;
            }
            Err(e) => {
                tracing::warn!("Cluster set failed: {} - {:#}", set.display_name(), e);
            }
        }
    }

    if !any_succeeded && !config.cluster_sets.is_empty() {
        anyhow::bail!("All cluster sets failed to load. Check the data source in your config.");
    }

    // Same cluster may be listed under more than one configured set
    let mut seen_ids = HashSet::new();
    let unique: Vec<Cluster> = all_clusters
        .into_iter()
        .filter(|c| seen_ids.insert(c.id.clone()))
        .collect();

    tracing::debug!("After deduplication: {} unique clusters", unique.len());
    Ok(unique)
}

/// Drop clusters whose id matches one of the set's exclude patterns.
/// Patterns are checked by `validate_config`; invalid ones are ignored here.
fn apply_excludes(clusters: Vec<Cluster>, set: &ClusterSetQuery) -> Vec<Cluster> {
    let patterns: Vec<glob::Pattern> = set
        .exclude
        .iter()
        .flatten()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    if patterns.is_empty() {
        return clusters;
    }

    clusters
        .into_iter()
        .filter(|c| !patterns.iter().any(|p| p.matches(&c.id)))
        .collect()
}

/// Assess clusters and split them into the review queue and the reviewed
/// list, each sorted for display.
///
/// Metrics go through boundary validation first. A cluster whose metrics are
/// rejected is logged and left out.
pub fn assess_and_split(
    clusters: Vec<Cluster>,
    thresholds: &ThresholdConfig,
    review_state: &ReviewState,
    cache: &mut AssessmentCache,
) -> (Vec<AssessedCluster>, Vec<AssessedCluster>) {
    let policy = thresholds.range_policy();

    let mut accepted = Vec::with_capacity(clusters.len());
    for mut cluster in clusters {
        match cluster.validation.validated(policy) {
            Ok(input) => {
                cluster.validation = input;
                accepted.push(cluster);
            }
            Err(e) => {
                tracing::warn!("Skipping cluster {}: {}", cluster.short_ref(), e);
            }
        }
    }

    // Clusters gone since the last refresh drop out of the memo
    let live: HashSet<&str> = accepted.iter().map(|c| c.id.as_str()).collect();
    cache.retain_ids(&live);

    let queue = filter_unreviewed(accepted.clone(), review_state);
    let reviewed = filter_reviewed(accepted, review_state);

    tracing::debug!("After filter: {} in queue, {} reviewed", queue.len(), reviewed.len());

    let mut assess_all = |list: Vec<Cluster>| -> Vec<AssessedCluster> {
        list.into_iter()
            .map(|cluster| {
                let assessment = cache.get_or_assess(&cluster.id, &cluster.validation, thresholds);
                (cluster, assessment)
            })
            .collect()
    };

    let mut queue = assess_all(queue);
    let mut reviewed = assess_all(reviewed);

    queue.sort_by(queue_order);
    reviewed.sort_by(queue_order);

    let (hits, misses) = cache.stats();
    tracing::debug!("Assessment cache: {} hits, {} misses", hits, misses);

    (queue, reviewed)
}

/// Needs Review first, then Invalid, then Valid; within a status the weakest
/// structure consistency first (unknown before any value), then by id.
pub fn queue_order(a: &AssessedCluster, b: &AssessedCluster) -> Ordering {
    a.1.status
        .rank()
        .cmp(&b.1.status.rank())
        .then_with(|| {
            let sa = a.0.validation.structure_consistency.value();
            let sb = b.0.validation.structure_consistency.value();
            match (sa, sb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            }
        })
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Load, assess, split and sort in one go.
///
/// Called from main for CLI commands and the initial TUI load. The TUI's own
/// refreshes call `load_clusters` and `assess_and_split` separately so the
/// assessment cache survives between refreshes.
pub async fn fetch_and_assess_clusters(
    source: &ClusterSource,
    config: &Config,
    review_state: &ReviewState,
) -> Result<(Vec<AssessedCluster>, Vec<AssessedCluster>)> {
    let clusters = load_clusters(source, config).await?;
    let thresholds = config.thresholds.clone().unwrap_or_default();
    let mut cache = AssessmentCache::new();
    Ok(assess_and_split(clusters, &thresholds, review_state, &mut cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{RangePolicy, ValidationStatus};
    use crate::clusters::types::tests::sample_cluster;
    use crate::config::{SourceConfig, SourceKind};
    use crate::review::{ReviewDecision, Verdict};
    use std::env;

    fn ids(list: &[AssessedCluster]) -> Vec<&str> {
        list.iter().map(|(c, _)| c.id.as_str()).collect()
    }

    #[test]
    fn test_queue_order() {
        let clusters = vec![
            sample_cluster("valid", Some(0.9), Some(0.9)),
            sample_cluster("invalid", Some(0.3), Some(0.3)),
            sample_cluster("mixed-b", Some(0.7), Some(0.7)),
            sample_cluster("mixed-a", Some(0.7), Some(0.7)),
            sample_cluster("weak", Some(0.65), Some(0.9)),
            sample_cluster("unknown", None, Some(0.7)),
        ];

        let (queue, reviewed) = assess_and_split(
            clusters,
            &ThresholdConfig::default(),
            &ReviewState::new(),
            &mut AssessmentCache::new(),
        );

        assert!(reviewed.is_empty());
        assert_eq!(
            ids(&queue),
            vec!["unknown", "weak", "mixed-a", "mixed-b", "invalid", "valid"]
        );
        assert_eq!(queue[0].1.status, ValidationStatus::NeedsReview);
        assert_eq!(queue[4].1.status, ValidationStatus::Invalid);
        assert_eq!(queue[5].1.status, ValidationStatus::Valid);
    }

    #[test]
    fn test_split_reviewed() {
        let mut state = ReviewState::new();
        state.decide("c2".to_string(), ReviewDecision::new(Verdict::Accept));

        let clusters = vec![
            sample_cluster("c1", Some(0.9), Some(0.9)),
            sample_cluster("c2", Some(0.9), Some(0.9)),
        ];
        let (queue, reviewed) = assess_and_split(
            clusters,
            &ThresholdConfig::default(),
            &state,
            &mut AssessmentCache::new(),
        );
        assert_eq!(ids(&queue), vec!["c1"]);
        assert_eq!(ids(&reviewed), vec!["c2"]);
    }

    #[test]
    fn test_rejected_metrics_skipped() {
        let thresholds = ThresholdConfig {
            out_of_range: Some(RangePolicy::Reject),
            ..ThresholdConfig::default()
        };
        let clusters = vec![
            sample_cluster("ok", Some(0.9), Some(0.9)),
            sample_cluster("bad", Some(1.4), Some(0.9)),
        ];
        let (queue, _) =
            assess_and_split(clusters, &thresholds, &ReviewState::new(), &mut AssessmentCache::new());
        assert_eq!(ids(&queue), vec!["ok"]);
    }

    #[test]
    fn test_clamped_metrics_kept() {
        let clusters = vec![sample_cluster("loud", Some(1.4), Some(0.9))];
        let (queue, _) = assess_and_split(
            clusters,
            &ThresholdConfig::default(),
            &ReviewState::new(),
            &mut AssessmentCache::new(),
        );
        assert_eq!(queue[0].0.validation.structure_consistency.value(), Some(1.0));
        assert_eq!(queue[0].1.status, ValidationStatus::Valid);
    }

    #[test]
    fn test_cache_reused_across_refreshes() {
        let mut cache = AssessmentCache::new();
        let thresholds = ThresholdConfig::default();
        let state = ReviewState::new();

        let first = vec![sample_cluster("c1", Some(0.9), Some(0.9))];
        assess_and_split(first.clone(), &thresholds, &state, &mut cache);
        assess_and_split(first, &thresholds, &state, &mut cache);

        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_cache_pruned_to_loaded_clusters() {
        let mut cache = AssessmentCache::new();
        let thresholds = ThresholdConfig::default();
        let state = ReviewState::new();

        let first = vec![
            sample_cluster("c1", Some(0.9), Some(0.9)),
            sample_cluster("c2", Some(0.3), Some(0.3)),
        ];
        assess_and_split(first, &thresholds, &state, &mut cache);
        assert_eq!(cache.len(), 2);

        let second = vec![sample_cluster("c2", Some(0.3), Some(0.3))];
        assess_and_split(second, &thresholds, &state, &mut cache);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (1, 2));
    }

    #[test]
    fn test_apply_excludes() {
        let set = ClusterSetQuery {
            id: "set70".to_string(),
            name: None,
            exclude: Some(vec!["*_singleton".to_string()]),
        };
        let clusters = vec![
            sample_cluster("c1", None, None),
            sample_cluster("c2_singleton", None, None),
        ];
        let kept = apply_excludes(clusters, &set);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "c1");
    }

    fn file_config(path: &std::path::Path, sets: &[&str]) -> Config {
        Config {
            source: SourceConfig {
                kind: SourceKind::File,
                path: Some(path.to_path_buf()),
                base_url: None,
                token: None,
            },
            cluster_sets: sets
                .iter()
                .map(|id| ClusterSetQuery {
                    id: id.to_string(),
                    name: None,
                    exclude: None,
                })
                .collect(),
            thresholds: None,
            dashboard_url: None,
            reviews_path: None,
            auto_refresh_interval: 300,
        }
    }

    #[tokio::test]
    async fn test_fetch_from_file_dedups() {
        let path = env::temp_dir().join("cluster_curator_test_fetch.json");
        let mut a = sample_cluster("c1", Some(0.9), Some(0.9));
        let b = sample_cluster("c2", Some(0.3), Some(0.3));
        let mut dup = a.clone();
        dup.cluster_set = "set90".to_string();
        a.cluster_set = "set70".to_string();
        std::fs::write(&path, serde_json::to_string(&vec![a, b, dup]).unwrap()).unwrap();

        let config = file_config(&path, &["set70", "set90"]);
        let source = ClusterSource::File { path: path.clone() };

        let (queue, reviewed) = fetch_and_assess_clusters(&source, &config, &ReviewState::new())
            .await
            .unwrap();
        assert_eq!(queue.len(), 2);
        assert!(reviewed.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_duplicate_id_taken_from_first_configured_set() {
        let path = env::temp_dir().join("cluster_curator_test_fetch_first_set_wins.json");
        let mut strong = sample_cluster("c1", Some(0.9), Some(0.9));
        strong.cluster_set = "setA".to_string();
        let mut weak = sample_cluster("c1", Some(0.1), Some(0.1));
        weak.cluster_set = "setB".to_string();

        // Enough rows that the two sets take noticeably different time to load
        let mut export = vec![weak, strong];
        for i in 0..500 {
            let mut filler = sample_cluster(&format!("f{}", i), Some(0.5), Some(0.5));
            filler.cluster_set = "setB".to_string();
            export.push(filler);
        }
        std::fs::write(&path, serde_json::to_string(&export).unwrap()).unwrap();
        let source = ClusterSource::File { path: path.clone() };

        for _ in 0..5 {
            let clusters = load_clusters(&source, &file_config(&path, &["setA", "setB"]))
                .await
                .unwrap();
            let c1 = clusters.iter().find(|c| c.id == "c1").unwrap();
            assert_eq!(c1.cluster_set, "setA");
            assert_eq!(c1.validation.structure_consistency.value(), Some(0.9));
        }

        let (queue, _) = fetch_and_assess_clusters(
            &source,
            &file_config(&path, &["setB", "setA"]),
            &ReviewState::new(),
        )
        .await
        .unwrap();
        let (c1, assessment) = queue.iter().find(|(c, _)| c.id == "c1").unwrap();
        assert_eq!(c1.cluster_set, "setB");
        assert_eq!(assessment.status, ValidationStatus::Invalid);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_all_sets_failing_is_error() {
        let path = env::temp_dir().join("cluster_curator_test_fetch_missing.json");
        let _ = std::fs::remove_file(&path);

        let config = file_config(&path, &["set70"]);
        let source = ClusterSource::File { path };

        let err = load_clusters(&source, &config).await.unwrap_err();
        assert!(err.to_string().contains("All cluster sets failed"));
    }
}
