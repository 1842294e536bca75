use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::ThresholdConfig;
use super::metric::{Metric, RangePolicy, ValidationError};
use super::tiers::{Signal, Tier};

/// Cluster-level metrics feeding the assessment. Field names follow the
/// database export; the dashboard API's camelCase keys are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterValidationInput {
    #[serde(default, alias = "structureConsistency")]
    pub structure_consistency: Metric,
    #[serde(default, alias = "experimentalSupport")]
    pub experimental_support: Metric,
    #[serde(default, alias = "taxonomicDiversity")]
    pub taxonomic_diversity: Metric,
    #[serde(default, alias = "tgroupHomogeneity")]
    pub tgroup_homogeneity: Metric,
}

impl ClusterValidationInput {
    pub fn new(
        structure_consistency: Option<f64>,
        experimental_support: Option<f64>,
        taxonomic_diversity: Option<f64>,
        tgroup_homogeneity: Option<f64>,
    ) -> Self {
        Self {
            structure_consistency: structure_consistency.into(),
            experimental_support: experimental_support.into(),
            taxonomic_diversity: taxonomic_diversity.into(),
            tgroup_homogeneity: tgroup_homogeneity.into(),
        }
    }

    pub fn metric(&self, signal: Signal) -> Metric {
        match signal {
            Signal::StructureConsistency => self.structure_consistency,
            Signal::ExperimentalSupport => self.experimental_support,
            Signal::TaxonomicDiversity => self.taxonomic_diversity,
            Signal::TgroupHomogeneity => self.tgroup_homogeneity,
        }
    }

    /// Boundary check: every known metric must be finite and in [0, 1].
    /// Out-of-range values are clamped or rejected per `policy`.
    pub fn validated(&self, policy: RangePolicy) -> Result<Self, ValidationError> {
        Ok(Self {
            structure_consistency: self
                .structure_consistency
                .checked("structure_consistency", policy)?,
            experimental_support: self
                .experimental_support
                .checked("experimental_support", policy)?,
            taxonomic_diversity: self
                .taxonomic_diversity
                .checked("taxonomic_diversity", policy)?,
            tgroup_homogeneity: self
                .tgroup_homogeneity
                .checked("tgroup_homogeneity", policy)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStatus {
    Valid,
    Invalid,
    #[serde(rename = "Needs Review", alias = "NeedsReview")]
    NeedsReview,
}

impl ValidationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "Valid",
            ValidationStatus::Invalid => "Invalid",
            ValidationStatus::NeedsReview => "Needs Review",
        }
    }

    /// Queue order: clusters needing attention first.
    pub fn rank(&self) -> u8 {
        match self {
            ValidationStatus::NeedsReview => 0,
            ValidationStatus::Invalid => 1,
            ValidationStatus::Valid => 2,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalReading {
    pub signal: Signal,
    pub value: Metric,
    pub tier: Option<Tier>,
}

impl SignalReading {
    /// e.g. "Structure consistency excellent (0.85)" or "Structure consistency unknown"
    pub fn describe(&self) -> String {
        match self.tier {
            Some(tier) => format!(
                "{} {} ({})",
                self.signal.label(),
                self.signal.tier_name(tier),
                self.value
            ),
            None => format!("{} unknown", self.signal.label()),
        }
    }

    pub fn tier_name(&self) -> &'static str {
        self.tier.map(|t| self.signal.tier_name(t)).unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentBreakdown {
    pub readings: Vec<SignalReading>,
    pub rule: String, // which branch of the composite policy decided
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationAssessment {
    pub status: ValidationStatus,
    pub notes: String,
    pub incomplete: bool, // at least one signal was unknown
    pub breakdown: AssessmentBreakdown,
}

/// Assess a cluster from its validation metrics.
///
/// `Valid` when every known composite signal (structure consistency,
/// t-group homogeneity) is in its top tier, `Invalid` when every known
/// composite signal is in its bottom tier, `NeedsReview` otherwise. Unknown
/// signals are left out of the decision; with no known composite signal the
/// result is `NeedsReview`.
///
/// Expects input already passed through `ClusterValidationInput::validated`.
pub fn assess(input: &ClusterValidationInput, config: &ThresholdConfig) -> ClassificationAssessment {
    let readings: Vec<SignalReading> = Signal::ALL
        .iter()
        .map(|&signal| {
            let value = input.metric(signal);
            SignalReading {
                signal,
                value,
                tier: Tier::of(value, signal.band(config)),
            }
        })
        .collect();

    let missing: Vec<&SignalReading> = readings.iter().filter(|r| r.tier.is_none()).collect();
    let incomplete = !missing.is_empty();

    if missing.len() == readings.len() {
        return ClassificationAssessment {
            status: ValidationStatus::NeedsReview,
            notes: "Insufficient data: no validation metrics available.".to_string(),
            incomplete,
            breakdown: AssessmentBreakdown {
                readings,
                rule: "insufficient data".to_string(),
            },
        };
    }

    let composite: Vec<Tier> = readings
        .iter()
        .filter(|r| r.signal.is_composite())
        .filter_map(|r| r.tier)
        .collect();

    let (status, rule, reason) = if composite.is_empty() {
        (
            ValidationStatus::NeedsReview,
            "no composite signal known",
            "Insufficient data for a composite decision; curator review needed.",
        )
    } else if composite.iter().all(|t| *t == Tier::Top) {
        (
            ValidationStatus::Valid,
            "composite signals in top tier",
            if incomplete {
                "Meets validation thresholds on available signals."
            } else {
                "Meets validation thresholds."
            },
        )
    } else if composite.iter().all(|t| *t == Tier::Bottom) {
        (
            ValidationStatus::Invalid,
            "composite signals in bottom tier",
            if incomplete {
                "Below validation thresholds on available signals."
            } else {
                "Below validation thresholds."
            },
        )
    } else {
        (
            ValidationStatus::NeedsReview,
            "mixed composite signals",
            "Mixed signals; curator review needed.",
        )
    };

    let mut sentences: Vec<String> = readings
        .iter()
        .filter(|r| r.tier.is_some())
        .map(|r| format!("{}.", r.describe()))
        .collect();

    if incomplete {
        let names: Vec<String> = missing
            .iter()
            .map(|r| r.signal.label().to_lowercase())
            .collect();
        sentences.push(format!("Missing: {}.", names.join(", ")));
    }
    sentences.push(reason.to_string());

    ClassificationAssessment {
        status,
        notes: sentences.join(" "),
        incomplete,
        breakdown: AssessmentBreakdown {
            readings,
            rule: rule.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(s: Option<f64>, e: Option<f64>, d: Option<f64>, h: Option<f64>) -> ClusterValidationInput {
        ClusterValidationInput::new(s, e, d, h)
    }

    fn status_of(i: &ClusterValidationInput) -> ValidationStatus {
        assess(i, &ThresholdConfig::default()).status
    }

    #[test]
    fn test_example_valid() {
        let i = input(Some(0.85), Some(0.75), Some(0.72), Some(0.83));
        let result = assess(&i, &ThresholdConfig::default());
        assert_eq!(result.status, ValidationStatus::Valid);
        assert!(!result.incomplete);
        assert!(result.notes.contains("Structure consistency excellent (0.85)"));
        assert!(result.notes.ends_with("Meets validation thresholds."));
    }

    #[test]
    fn test_example_invalid() {
        let i = input(Some(0.45), Some(0.3), Some(0.2), Some(0.5));
        assert_eq!(status_of(&i), ValidationStatus::Invalid);
    }

    #[test]
    fn test_example_needs_review() {
        let i = input(Some(0.65), Some(0.5), Some(0.5), Some(0.65));
        let result = assess(&i, &ThresholdConfig::default());
        assert_eq!(result.status, ValidationStatus::NeedsReview);
        assert_eq!(result.breakdown.rule, "mixed composite signals");
    }

    #[test]
    fn test_all_unknown_needs_review() {
        let result = assess(&ClusterValidationInput::default(), &ThresholdConfig::default());
        assert_eq!(result.status, ValidationStatus::NeedsReview);
        assert!(result.incomplete);
        assert!(result.notes.to_lowercase().contains("insufficient data"));
    }

    #[test]
    fn test_boundaries_inclusive_for_valid() {
        let i = input(Some(0.8), None, None, Some(0.8));
        assert_eq!(status_of(&i), ValidationStatus::Valid);
    }

    #[test]
    fn test_lower_bound_not_invalid() {
        // 0.6 is the "good"/"medium" tier, not bottom
        let i = input(Some(0.6), None, None, Some(0.59));
        assert_eq!(status_of(&i), ValidationStatus::NeedsReview);
    }

    #[test]
    fn test_one_high_one_low_needs_review() {
        let i = input(Some(0.95), Some(0.9), Some(0.9), Some(0.3));
        assert_eq!(status_of(&i), ValidationStatus::NeedsReview);
    }

    #[test]
    fn test_unknown_homogeneity_excluded() {
        let i = input(Some(0.9), Some(0.8), Some(0.8), None);
        let result = assess(&i, &ThresholdConfig::default());
        assert_eq!(result.status, ValidationStatus::Valid);
        assert!(result.incomplete);
        assert!(result.notes.contains("Missing: t-group homogeneity."));
        assert!(result.notes.contains("on available signals"));
    }

    #[test]
    fn test_unknown_structure_excluded() {
        let i = input(None, None, None, Some(0.2));
        assert_eq!(status_of(&i), ValidationStatus::Invalid);
    }

    #[test]
    fn test_only_supplementary_signals_needs_review() {
        // Support and diversity never decide on their own
        let i = input(None, Some(0.95), Some(0.95), None);
        let result = assess(&i, &ThresholdConfig::default());
        assert_eq!(result.status, ValidationStatus::NeedsReview);
        assert_eq!(result.breakdown.rule, "no composite signal known");
    }

    #[test]
    fn test_supplementary_signals_do_not_change_status() {
        let low = input(Some(0.85), Some(0.0), Some(0.0), Some(0.85));
        let high = input(Some(0.85), Some(1.0), Some(1.0), Some(0.85));
        assert_eq!(status_of(&low), status_of(&high));
    }

    #[test]
    fn test_monotonic_in_structure_consistency() {
        let others = [None, Some(0.0), Some(0.3), Some(0.59), Some(0.6), Some(0.79), Some(0.8), Some(1.0)];
        for h in others {
            let mut previous: Option<ValidationStatus> = None;
            for step in 0..=100 {
                let s = step as f64 / 100.0;
                let status = status_of(&input(Some(s), Some(0.5), Some(0.5), h));
                // Once Valid, raising structure consistency keeps it Valid
                if previous == Some(ValidationStatus::Valid) {
                    assert_eq!(status, ValidationStatus::Valid, "s={} h={:?}", s, h);
                }
                previous = Some(status);
            }
        }
    }

    #[test]
    fn test_totality_over_grid() {
        let values = [None, Some(0.0), Some(0.4), Some(0.6), Some(0.7), Some(0.8), Some(1.0)];
        for s in values {
            for e in values {
                for d in values {
                    for h in values {
                        let result = assess(&input(s, e, d, h), &ThresholdConfig::default());
                        assert!(matches!(
                            result.status,
                            ValidationStatus::Valid
                                | ValidationStatus::Invalid
                                | ValidationStatus::NeedsReview
                        ));
                        assert!(!result.notes.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let i = input(Some(0.65), None, Some(0.5), Some(0.81));
        let config = ThresholdConfig::default();
        assert_eq!(assess(&i, &config), assess(&i, &config));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ThresholdConfig {
            structure_consistency: Some(crate::assessment::Band::new(0.9, 0.5)),
            ..ThresholdConfig::default()
        };
        let i = input(Some(0.85), None, None, Some(0.85));
        assert_eq!(assess(&i, &config).status, ValidationStatus::NeedsReview);
    }

    #[test]
    fn test_breakdown_has_all_signals() {
        let i = input(Some(0.85), None, Some(0.2), Some(0.83));
        let result = assess(&i, &ThresholdConfig::default());
        assert_eq!(result.breakdown.readings.len(), 4);
        let support = result
            .breakdown
            .readings
            .iter()
            .find(|r| r.signal == Signal::ExperimentalSupport)
            .unwrap();
        assert_eq!(support.tier_name(), "unknown");
        assert_eq!(support.describe(), "Experimental support unknown");
    }

    #[test]
    fn test_validated_clamps_before_assessment() {
        let raw = input(Some(1.4), None, None, Some(0.9));
        let checked = raw.validated(RangePolicy::Clamp).unwrap();
        assert_eq!(checked.structure_consistency, Metric::Known(1.0));
        assert_eq!(status_of(&checked), ValidationStatus::Valid);
    }

    #[test]
    fn test_validated_rejects() {
        let raw = input(None, Some(-0.5), None, None);
        let err = raw.validated(RangePolicy::Reject).unwrap_err();
        assert!(err.to_string().contains("experimental_support"));
    }

    #[test]
    fn test_input_deserialize_camel_case_and_missing() {
        let json = r#"{"structureConsistency": 0.85, "tgroupHomogeneity": null}"#;
        let parsed: ClusterValidationInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.structure_consistency, Metric::Known(0.85));
        assert_eq!(parsed.tgroup_homogeneity, Metric::Unknown);
        assert_eq!(parsed.experimental_support, Metric::Unknown);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::NeedsReview).unwrap(),
            "\"Needs Review\""
        );
        let parsed: ValidationStatus = serde_json::from_str("\"NeedsReview\"").unwrap();
        assert_eq!(parsed, ValidationStatus::NeedsReview);
    }
}
