use std::collections::{HashMap, HashSet};

use super::config::ThresholdConfig;
use super::engine::{assess, ClassificationAssessment, ClusterValidationInput};

/// Per-cluster memo of assessments.
///
/// Assessment is pure, so a cached entry stays good as long as the input for
/// that cluster id is unchanged. The cache is bound to one threshold config;
/// build a new cache when thresholds change.
#[derive(Debug, Default)]
pub struct AssessmentCache {
    entries: HashMap<String, (ClusterValidationInput, ClassificationAssessment)>,
    hits: u64,
    misses: u64,
}

impl AssessmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_assess(
        &mut self,
        cluster_id: &str,
        input: &ClusterValidationInput,
        config: &ThresholdConfig,
    ) -> ClassificationAssessment {
        if let Some((cached_input, assessment)) = self.entries.get(cluster_id) {
            if cached_input == input {
                self.hits += 1;
                return assessment.clone();
            }
        }

        self.misses += 1;
        let assessment = assess(input, config);
        self.entries
            .insert(cluster_id.to_string(), (*input, assessment.clone()));
        assessment
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Forget clusters that are no longer loaded
    pub fn retain_ids(&mut self, live: &HashSet<&str>) {
        self.entries.retain(|id, _| live.contains(id.as_str()));
    }
}
