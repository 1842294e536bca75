use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::assessment::ValidationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
    Defer,
}

impl Verdict {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Verdict::Accept => "Accepted",
            Verdict::Reject => "Rejected",
            Verdict::Defer => "Deferred",
        }
    }
}

/// Turn a curator-typed defer duration (`3d`, `1w 2d`) into an expiry.
///
/// Empty input and `indefinite` mean no expiry. A duration that lands past
/// the last representable date is an error, never a defer that has already
/// expired.
pub fn defer_until(input: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, String> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("indefinite") {
        return Ok(None);
    }

    let duration = humantime::parse_duration(input)
        .map_err(|e| format!("Invalid duration '{}': {}", input, e))?;

    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .map(Some)
        .ok_or_else(|| format!("Duration '{}' is too large", input))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub verdict: Verdict,
    #[serde(default)]
    pub note: Option<String>,
    /// T-group the curator wants the cluster moved to
    #[serde(default)]
    pub proposed_tgroup: Option<String>,
    pub decided_at: DateTime<Utc>,
    /// Expiry for deferrals; None means indefinite
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl ReviewDecision {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            note: None,
            proposed_tgroup: None,
            decided_at: Utc::now(),
            until: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_proposed_tgroup(mut self, tgroup: Option<String>) -> Self {
        self.proposed_tgroup = tgroup.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn deferred_until(mut self, until: Option<DateTime<Utc>>) -> Self {
        self.until = until;
        self
    }

    /// Accept and reject never lapse; a deferral lapses at `until`.
    pub fn is_active(&self) -> bool {
        match (self.verdict, self.until) {
            (Verdict::Defer, Some(until)) => Utc::now() < until,
            _ => true,
        }
    }

    /// Status shown to the curator: their verdict wins over the computed one,
    /// except a deferral which leaves the computed status in place.
    pub fn effective_status(&self, computed: ValidationStatus) -> ValidationStatus {
        match self.verdict {
            Verdict::Accept => ValidationStatus::Valid,
            Verdict::Reject => ValidationStatus::Invalid,
            Verdict::Defer => computed,
        }
    }

    /// Format the remaining time until a deferral expires in human-friendly form
    /// Returns "" for accept/reject, "indefinite" for open-ended deferrals
    pub fn format_remaining(&self) -> String {
        if self.verdict != Verdict::Defer {
            return String::new();
        }
        match self.until {
            None => "indefinite".to_string(),
            Some(until) => {
                let now = Utc::now();
                if until <= now {
                    "expired".to_string()
                } else {
                    let duration = until - now;
                    let hours = duration.num_hours();
                    let days = duration.num_days();
                    let weeks = days / 7;

                    if weeks >= 1 {
                        format!("{}w left", weeks)
                    } else if days >= 1 {
                        format!("{}d left", days)
                    } else if hours >= 1 {
                        format!("{}h left", hours)
                    } else {
                        let minutes = duration.num_minutes();
                        if minutes >= 1 {
                            format!("{}m left", minutes)
                        } else {
                            "<1m left".to_string()
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewState {
    pub version: u32,
    #[serde(default)]
    pub decisions: HashMap<String, ReviewDecision>,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewState {
    /// Create a new empty review state with version 1
    pub fn new() -> Self {
        Self {
            version: 1,
            decisions: HashMap::new(),
        }
    }

    /// The decision for a cluster, if one exists and has not lapsed
    pub fn decision(&self, cluster_id: &str) -> Option<&ReviewDecision> {
        self.decisions.get(cluster_id).filter(|d| d.is_active())
    }

    pub fn is_reviewed(&self, cluster_id: &str) -> bool {
        self.decision(cluster_id).is_some()
    }

    /// Record a decision, replacing any earlier one.
    /// Returns the replaced decision.
    pub fn decide(&mut self, cluster_id: String, decision: ReviewDecision) -> Option<ReviewDecision> {
        self.decisions.insert(cluster_id, decision)
    }

    /// Remove a cluster's decision. Returns the removed decision.
    pub fn revoke(&mut self, cluster_id: &str) -> Option<ReviewDecision> {
        self.decisions.remove(cluster_id)
    }

    /// Remove lapsed deferrals
    pub fn clean_expired(&mut self) {
        self.decisions.retain(|_id, decision| decision.is_active());
    }

    pub fn decisions(&self) -> &HashMap<String, ReviewDecision> {
        &self.decisions
    }
}
