mod parse;

pub use parse::{is_tgroup_id, tgroup_from_note};

use serde::Serialize;

use crate::assessment::{ClassificationAssessment, ValidationStatus};
use crate::clusters::Cluster;
use crate::review::{ReviewDecision, ReviewState, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Bucket the proposed T-group's share of classified members.
    pub fn from_share(share: Option<f64>) -> Self {
        match share {
            Some(s) if s >= 0.8 => Confidence::High,
            Some(s) if s >= 0.5 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }
}

/// Where the proposed T-group came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProposalSource {
    /// Set explicitly on the review decision
    Curator,
    /// Parsed from the decision note
    Note,
    /// Dominant T-group among cluster members
    Distribution,
}

impl ProposalSource {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalSource::Curator => "curator",
            ProposalSource::Note => "note",
            ProposalSource::Distribution => "distribution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassificationProposal {
    pub cluster_id: String,
    pub cluster_set: String,
    pub current_tgroup: Option<String>,
    pub proposed_tgroup: String,
    pub confidence: Confidence,
    pub status: ProposalStatus,
    pub source: ProposalSource,
}

/// Build a reclassification proposal for one cluster, if there is one to make.
///
/// The proposed T-group is taken from the decision's explicit field, then
/// from its note, then from the member distribution. The distribution is only
/// consulted when the computed status is not `Valid`.
pub fn propose(
    cluster: &Cluster,
    computed: ValidationStatus,
    decision: Option<&ReviewDecision>,
) -> Option<ReclassificationProposal> {
    let from_decision = decision.and_then(|d| {
        d.proposed_tgroup
            .clone()
            .map(|t| (t, ProposalSource::Curator))
            .or_else(|| {
                d.note
                    .as_deref()
                    .and_then(tgroup_from_note)
                    .map(|t| (t, ProposalSource::Note))
            })
    });

    let (proposed, source) = match from_decision {
        Some(found) => found,
        None if computed != ValidationStatus::Valid => {
            let dominant = cluster.dominant_tgroup()?;
            (dominant.tgroup.clone(), ProposalSource::Distribution)
        }
        None => return None,
    };

    if cluster.tgroup.as_deref() == Some(proposed.as_str()) {
        return None;
    }

    let status = match decision.map(|d| d.verdict) {
        Some(Verdict::Accept) => ProposalStatus::Accepted,
        Some(Verdict::Reject) => ProposalStatus::Rejected,
        _ => ProposalStatus::Pending,
    };

    Some(ReclassificationProposal {
        cluster_id: cluster.id.clone(),
        cluster_set: cluster.cluster_set.clone(),
        current_tgroup: cluster.tgroup.clone(),
        confidence: Confidence::from_share(cluster.tgroup_share(&proposed)),
        proposed_tgroup: proposed,
        status,
        source,
    })
}

/// Proposals for every cluster, in the order given.
pub fn collect_proposals(
    clusters: &[(Cluster, ClassificationAssessment)],
    state: &ReviewState,
) -> Vec<ReclassificationProposal> {
    clusters
        .iter()
        .filter_map(|(cluster, assessment)| {
            propose(cluster, assessment.status, state.decision(&cluster.id))
        })
        .collect()
}
