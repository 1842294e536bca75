use serde::{Deserialize, Serialize};

use super::metric::RangePolicy;

/// Threshold configuration for cluster assessment.
///
/// Each signal is bucketed by a `high`/`low` band. The composite status uses
/// the structure consistency and t-group homogeneity bands; the other two
/// signals only feed the rationale. Omitted bands fall back to defaults.
///
/// Example YAML:
/// ```yaml
/// thresholds:
///   structure_consistency: { high: 0.8, low: 0.6 }
///   tgroup_homogeneity: { high: 0.85, low: 0.6 }
///   out_of_range: reject
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub structure_consistency: Option<Band>,

    #[serde(default)]
    pub experimental_support: Option<Band>,

    #[serde(default)]
    pub taxonomic_diversity: Option<Band>,

    #[serde(default)]
    pub tgroup_homogeneity: Option<Band>,

    /// Handling of known metrics outside [0, 1] (default: clamp)
    #[serde(default)]
    pub out_of_range: Option<RangePolicy>,
}

/// Two cut points splitting [0, 1] into three tiers.
///
/// `value >= high` is the top tier, `value >= low` the middle tier,
/// anything below `low` the bottom tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Band {
    pub high: f64,
    pub low: f64,
}

impl Band {
    pub const fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }
}

pub const DEFAULT_STRUCTURE_BAND: Band = Band::new(0.8, 0.6);
pub const DEFAULT_SUPPORT_BAND: Band = Band::new(0.7, 0.4);
pub const DEFAULT_DIVERSITY_BAND: Band = Band::new(0.7, 0.4);
pub const DEFAULT_HOMOGENEITY_BAND: Band = Band::new(0.8, 0.6);

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            structure_consistency: Some(DEFAULT_STRUCTURE_BAND),
            experimental_support: Some(DEFAULT_SUPPORT_BAND),
            taxonomic_diversity: Some(DEFAULT_DIVERSITY_BAND),
            tgroup_homogeneity: Some(DEFAULT_HOMOGENEITY_BAND),
            out_of_range: Some(RangePolicy::Clamp),
        }
    }
}

impl ThresholdConfig {
    pub fn structure_band(&self) -> Band {
        self.structure_consistency.unwrap_or(DEFAULT_STRUCTURE_BAND)
    }

    pub fn support_band(&self) -> Band {
        self.experimental_support.unwrap_or(DEFAULT_SUPPORT_BAND)
    }

    pub fn diversity_band(&self) -> Band {
        self.taxonomic_diversity.unwrap_or(DEFAULT_DIVERSITY_BAND)
    }

    pub fn homogeneity_band(&self) -> Band {
        self.tgroup_homogeneity.unwrap_or(DEFAULT_HOMOGENEITY_BAND)
    }

    pub fn range_policy(&self) -> RangePolicy {
        self.out_of_range.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_config() {
        let config = ThresholdConfig::default();
        assert_eq!(config.structure_band(), Band::new(0.8, 0.6));
        assert_eq!(config.support_band(), Band::new(0.7, 0.4));
        assert_eq!(config.diversity_band(), Band::new(0.7, 0.4));
        assert_eq!(config.homogeneity_band(), Band::new(0.8, 0.6));
        assert_eq!(config.range_policy(), RangePolicy::Clamp);
    }

    #[test]
    fn test_threshold_config_serde_roundtrip() {
        let config = ThresholdConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ThresholdConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_threshold_config_parse() {
        let yaml = r#"
tgroup_homogeneity:
  high: 0.9
  low: 0.5
out_of_range: reject
"#;
        let config: ThresholdConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.homogeneity_band(), Band::new(0.9, 0.5));
        assert!(config.structure_consistency.is_none());
        // Missing bands fall back to defaults
        assert_eq!(config.structure_band(), DEFAULT_STRUCTURE_BAND);
        assert_eq!(config.range_policy(), RangePolicy::Reject);
    }

    #[test]
    fn test_empty_threshold_config_parse() {
        let config: ThresholdConfig = serde_saphyr::from_str("{}").unwrap();
        assert!(config.structure_consistency.is_none());
        assert!(config.out_of_range.is_none());
        assert_eq!(config.range_policy(), RangePolicy::Clamp);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "structure: { high: 0.8, low: 0.6 }";
        let result: Result<ThresholdConfig, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }
}
