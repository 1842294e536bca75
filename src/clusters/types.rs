use serde::{Deserialize, Serialize};

use crate::assessment::ClusterValidationInput;

/// One cluster as exported by the clustering database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(alias = "clusterSet", alias = "cluster_set_id")]
    pub cluster_set: String,
    #[serde(alias = "representativeDomain", alias = "representative_domain")]
    pub representative: String,
    #[serde(default)]
    pub size: u32,
    /// T-group currently assigned to the cluster
    #[serde(default)]
    pub tgroup: Option<String>,
    #[serde(default, alias = "tgroupDistribution")]
    pub tgroup_distribution: Vec<TGroupShare>,
    #[serde(default)]
    pub taxonomy: Option<TaxonomySummary>,
    #[serde(default)]
    pub quality: Option<StructureQuality>,
    #[serde(default)]
    pub validation: ClusterValidationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TGroupShare {
    pub tgroup: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySummary {
    #[serde(default, alias = "distinctSpecies")]
    pub distinct_species: Option<u32>,
    #[serde(default, alias = "distinctPhyla")]
    pub distinct_phyla: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureQuality {
    #[serde(default, alias = "meanPlddt")]
    pub mean_plddt: Option<f64>,
    #[serde(default, alias = "meanTmScore")]
    pub mean_tm_score: Option<f64>,
    #[serde(default, alias = "meanRmsd")]
    pub mean_rmsd: Option<f64>,
}

impl Cluster {
    /// Return a short reference in the format "cluster_set/id"
    pub fn short_ref(&self) -> String {
        format!("{}/{}", self.cluster_set, self.id)
    }

    /// Members with a T-group assignment
    pub fn classified_members(&self) -> u64 {
        self.tgroup_distribution.iter().map(|s| u64::from(s.count)).sum()
    }

    /// Most frequent T-group among members. Ties go to the first listed.
    pub fn dominant_tgroup(&self) -> Option<&TGroupShare> {
        self.tgroup_distribution
            .iter()
            .fold(None, |best: Option<&TGroupShare>, share| match best {
                Some(b) if b.count >= share.count => Some(b),
                _ => Some(share),
            })
    }

    /// Fraction of classified members in `tgroup`, or None when no member
    /// has a T-group.
    pub fn tgroup_share(&self, tgroup: &str) -> Option<f64> {
        let total = self.classified_members();
        if total == 0 {
            return None;
        }
        let count: u64 = self
            .tgroup_distribution
            .iter()
            .filter(|s| s.tgroup == tgroup)
            .map(|s| u64::from(s.count))
            .sum();
        Some(count as f64 / total as f64)
    }
}
