use super::types::ReviewState;
use crate::clusters::Cluster;

/// Clusters without an active review decision (the curator's queue)
pub fn filter_unreviewed(clusters: Vec<Cluster>, state: &ReviewState) -> Vec<Cluster> {
    clusters
        .into_iter()
        .filter(|c| !state.is_reviewed(&c.id))
        .collect()
}

/// Clusters with an active review decision
pub fn filter_reviewed(clusters: Vec<Cluster>, state: &ReviewState) -> Vec<Cluster> {
    clusters
        .into_iter()
        .filter(|c| state.is_reviewed(&c.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::types::tests::sample_cluster;
    use crate::review::{ReviewDecision, Verdict};
    use chrono::{Duration, Utc};

    #[test]
    fn test_filter_unreviewed_removes_decided() {
        let mut state = ReviewState::new();
        state.decide("c1".to_string(), ReviewDecision::new(Verdict::Accept));

        let clusters = vec![sample_cluster("c1", None, None), sample_cluster("c2", None, None)];

        let queue = filter_unreviewed(clusters, &state);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "c2");
    }

    #[test]
    fn test_expired_deferral_returns_to_queue() {
        let mut state = ReviewState::new();
        state.decide(
            "c1".to_string(),
            ReviewDecision::new(Verdict::Defer).deferred_until(Some(Utc::now() - Duration::minutes(5))),
        );

        let clusters = vec![sample_cluster("c1", None, None)];
        assert_eq!(filter_unreviewed(clusters.clone(), &state).len(), 1);
        assert!(filter_reviewed(clusters, &state).is_empty());
    }

    #[test]
    fn test_filter_reviewed_keeps_order() {
        let mut state = ReviewState::new();
        state.decide("c1".to_string(), ReviewDecision::new(Verdict::Reject));
        state.decide("c3".to_string(), ReviewDecision::new(Verdict::Defer));

        let clusters = vec![
            sample_cluster("c1", None, None),
            sample_cluster("c2", None, None),
            sample_cluster("c3", None, None),
        ];

        let reviewed = filter_reviewed(clusters, &state);
        assert_eq!(reviewed.len(), 2);
        assert_eq!(reviewed[0].id, "c1");
        assert_eq!(reviewed[1].id, "c3");
    }
}
