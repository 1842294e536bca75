use super::config::{Band, ThresholdConfig};
use super::metric::Metric;

/// Position of a value within a `Band`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Bottom,
    Middle,
    Top,
}

impl Tier {
    /// Bucket a metric. Unknown metrics have no tier.
    pub fn of(metric: Metric, band: Band) -> Option<Tier> {
        let v = metric.value()?;
        Some(if v >= band.high {
            Tier::Top
        } else if v >= band.low {
            Tier::Middle
        } else {
            Tier::Bottom
        })
    }
}

/// The four cluster-level signals the assessment reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    StructureConsistency,
    ExperimentalSupport,
    TaxonomicDiversity,
    TgroupHomogeneity,
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::StructureConsistency,
        Signal::TgroupHomogeneity,
        Signal::ExperimentalSupport,
        Signal::TaxonomicDiversity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Signal::StructureConsistency => "Structure consistency",
            Signal::ExperimentalSupport => "Experimental support",
            Signal::TaxonomicDiversity => "Taxonomic diversity",
            Signal::TgroupHomogeneity => "T-group homogeneity",
        }
    }

    /// Field name in exports and config
    pub fn key(&self) -> &'static str {
        match self {
            Signal::StructureConsistency => "structure_consistency",
            Signal::ExperimentalSupport => "experimental_support",
            Signal::TaxonomicDiversity => "taxonomic_diversity",
            Signal::TgroupHomogeneity => "tgroup_homogeneity",
        }
    }

    pub fn band(&self, config: &ThresholdConfig) -> Band {
        match self {
            Signal::StructureConsistency => config.structure_band(),
            Signal::ExperimentalSupport => config.support_band(),
            Signal::TaxonomicDiversity => config.diversity_band(),
            Signal::TgroupHomogeneity => config.homogeneity_band(),
        }
    }

    /// Whether the signal takes part in the composite status decision.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Signal::StructureConsistency | Signal::TgroupHomogeneity
        )
    }

    /// Display name for a tier of this signal, as shown on dashboard badges.
    pub fn tier_name(&self, tier: Tier) -> &'static str {
        match (self, tier) {
            (Signal::StructureConsistency, Tier::Top) => "excellent",
            (Signal::StructureConsistency, Tier::Middle) => "good",
            (Signal::StructureConsistency, Tier::Bottom) => "moderate",
            (Signal::ExperimentalSupport, Tier::Top) => "strong",
            (Signal::ExperimentalSupport, Tier::Middle) => "moderate",
            (Signal::ExperimentalSupport, Tier::Bottom) => "limited",
            (Signal::TaxonomicDiversity | Signal::TgroupHomogeneity, Tier::Top) => "high",
            (Signal::TaxonomicDiversity | Signal::TgroupHomogeneity, Tier::Middle) => "medium",
            (Signal::TaxonomicDiversity | Signal::TgroupHomogeneity, Tier::Bottom) => "low",
        }
    }
}
