use crate::assessment::{AssessmentCache, ThresholdConfig};
use crate::clusters::{Cluster, ClusterSource};
use crate::config::Config;
use crate::fetch::{assess_and_split, queue_order, AssessedCluster};
use crate::review::{ReviewDecision, ReviewState, Verdict};
use crate::tui::theme::ThemeColors;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

const MAX_UNDO: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Queue,
    Reviewed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    DeferInput,
    Help,
    Breakdown,
}

#[derive(Debug, Clone)]
pub enum UndoAction {
    Decided {
        cluster_id: String,
        label: String,
        previous: Option<ReviewDecision>,
    },
    Revoked {
        cluster_id: String,
        label: String,
        decision: ReviewDecision,
    },
}

pub struct App {
    pub queue: Vec<AssessedCluster>,
    pub reviewed: Vec<AssessedCluster>,
    pub table_state: ratatui::widgets::TableState,
    pub current_view: View,
    pub review_state: ReviewState,
    pub reviews_path: PathBuf,
    pub input_mode: InputMode,
    pub defer_input: String,
    pub flash_message: Option<(String, Instant)>,
    pub undo_stack: VecDeque<UndoAction>,
    pub last_refresh: Instant,
    pub last_interaction: Instant,
    pub needs_refresh: bool,
    pub force_refresh: bool,
    pub should_quit: bool,
    pub config: Config,
    pub thresholds: ThresholdConfig,
    pub source: ClusterSource,
    pub assessment_cache: AssessmentCache,
    pub theme: ThemeColors,
    pub is_loading: bool,
    pub spinner_frame: usize,
}

impl App {
    /// Create a new App with empty cluster lists in loading state
    /// Used for launching TUI before data arrives
    pub fn new_loading(
        source: ClusterSource,
        config: Config,
        review_state: ReviewState,
        reviews_path: PathBuf,
        theme: ThemeColors,
    ) -> Self {
        let thresholds = config.thresholds.clone().unwrap_or_default();
        Self {
            queue: Vec::new(),
            reviewed: Vec::new(),
            table_state: ratatui::widgets::TableState::default(),
            current_view: View::Queue,
            review_state,
            reviews_path,
            input_mode: InputMode::Normal,
            defer_input: String::new(),
            flash_message: None,
            undo_stack: VecDeque::new(),
            last_refresh: Instant::now(),
            last_interaction: Instant::now(),
            needs_refresh: false,
            force_refresh: false,
            should_quit: false,
            config,
            thresholds,
            source,
            assessment_cache: AssessmentCache::new(),
            theme,
            is_loading: true,
            spinner_frame: 0,
        }
    }

    pub fn current_clusters(&self) -> &[AssessedCluster] {
        match self.current_view {
            View::Queue => &self.queue,
            View::Reviewed => &self.reviewed,
        }
    }

    pub fn next_row(&mut self) {
        let clusters = self.current_clusters();
        if clusters.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= clusters.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let clusters = self.current_clusters();
        if clusters.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    clusters.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected(&self) -> Option<&AssessedCluster> {
        let clusters = self.current_clusters();
        self.table_state.selected().and_then(|i| clusters.get(i))
    }

    pub fn selected_cluster(&self) -> Option<&Cluster> {
        self.selected().map(|(cluster, _)| cluster)
    }

    pub fn push_undo(&mut self, action: UndoAction) {
        self.undo_stack.push_front(action);
        if self.undo_stack.len() > MAX_UNDO {
            self.undo_stack.pop_back();
        }
    }

    pub fn update_flash(&mut self) {
        if let Some((_, timestamp)) = self.flash_message {
            if timestamp.elapsed().as_secs() >= 3 {
                self.flash_message = None;
            }
        }
    }

    pub fn show_flash(&mut self, msg: String) {
        self.flash_message = Some((msg, Instant::now()));
    }

    /// Open the selected cluster's dashboard page in the browser
    pub fn open_selected(&self) -> anyhow::Result<()> {
        let dashboard_url = self
            .config
            .dashboard_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("dashboard_url is not set in config"))?;
        if let Some(cluster) = self.selected_cluster() {
            crate::browser::open_url(&crate::browser::cluster_url(dashboard_url, &cluster.id))?;
        }
        Ok(())
    }

    pub fn accept_selected(&mut self) {
        self.decide_selected(Verdict::Accept, None);
    }

    pub fn reject_selected(&mut self) {
        self.decide_selected(Verdict::Reject, None);
    }

    /// Record a decision for the selected cluster, persist it and move the
    /// cluster to the list it now belongs in.
    fn decide_selected(&mut self, verdict: Verdict, until: Option<DateTime<Utc>>) {
        let (cluster_id, label) = match self.selected_cluster() {
            Some(c) => (c.id.clone(), c.short_ref()),
            None => return,
        };

        // Keep the note and proposed T-group of an earlier decision (set via the CLI)
        let carried = self.review_state.decisions().get(&cluster_id).cloned();
        let mut decision = ReviewDecision::new(verdict).deferred_until(until);
        if let Some(earlier) = &carried {
            decision = decision
                .with_note(earlier.note.clone())
                .with_proposed_tgroup(earlier.proposed_tgroup.clone());
        }

        let previous = self.review_state.decide(cluster_id.clone(), decision);
        if let Err(e) = crate::review::save_review_state(&self.reviews_path, &self.review_state) {
            self.restore_decision(&cluster_id, previous);
            self.show_flash(format!("Failed to save review state: {}", e));
            return;
        }

        self.push_undo(UndoAction::Decided {
            cluster_id: cluster_id.clone(),
            label: label.clone(),
            previous,
        });
        self.place_cluster(&cluster_id);
        self.show_flash(format!("{}: {} (z to undo)", verdict.past_tense(), label));
    }

    /// Start defer input mode
    pub fn start_defer_input(&mut self) {
        if self.selected().is_some() {
            self.input_mode = InputMode::DeferInput;
            self.defer_input.clear();
        }
    }

    /// Confirm and apply the defer input
    pub fn confirm_defer_input(&mut self) {
        // Empty input defers indefinitely
        let parsed = crate::review::defer_until(&self.defer_input, Utc::now());
        self.input_mode = InputMode::Normal;
        self.defer_input.clear();

        match parsed {
            Ok(until) => self.decide_selected(Verdict::Defer, until),
            Err(msg) => self.show_flash(msg),
        }
    }

    /// Cancel defer input
    pub fn cancel_defer_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.defer_input.clear();
    }

    /// Remove the selected cluster's decision (only works in Reviewed view)
    pub fn revoke_selected(&mut self) {
        if !matches!(self.current_view, View::Reviewed) {
            return;
        }

        let (cluster_id, label) = match self.selected_cluster() {
            Some(c) => (c.id.clone(), c.short_ref()),
            None => return,
        };

        let decision = match self.review_state.revoke(&cluster_id) {
            Some(d) => d,
            None => return,
        };

        if let Err(e) = crate::review::save_review_state(&self.reviews_path, &self.review_state) {
            self.review_state.decide(cluster_id, decision);
            self.show_flash(format!("Failed to save review state: {}", e));
            return;
        }

        self.push_undo(UndoAction::Revoked {
            cluster_id: cluster_id.clone(),
            label: label.clone(),
            decision,
        });
        self.place_cluster(&cluster_id);
        self.show_flash(format!("Revoked: {} (z to undo)", label));
    }

    /// Undo the last decision or revocation
    pub fn undo_last(&mut self) {
        let action = match self.undo_stack.pop_front() {
            Some(action) => action,
            None => {
                self.show_flash("Nothing to undo".to_string());
                return;
            }
        };

        let (cluster_id, message) = match action {
            UndoAction::Decided {
                cluster_id,
                label,
                previous,
            } => {
                self.restore_decision(&cluster_id, previous);
                (cluster_id, format!("Undid decision: {}", label))
            }
            UndoAction::Revoked {
                cluster_id,
                label,
                decision,
            } => {
                self.review_state.decide(cluster_id.clone(), decision);
                (cluster_id, format!("Undid revoke: {}", label))
            }
        };

        if let Err(e) = crate::review::save_review_state(&self.reviews_path, &self.review_state) {
            self.show_flash(format!("Failed to save review state: {}", e));
            return;
        }

        self.place_cluster(&cluster_id);
        self.show_flash(message);
    }

    fn restore_decision(&mut self, cluster_id: &str, previous: Option<ReviewDecision>) {
        match previous {
            Some(decision) => {
                self.review_state.decide(cluster_id.to_string(), decision);
            }
            None => {
                self.review_state.revoke(cluster_id);
            }
        }
    }

    /// Put a cluster in the queue or the reviewed list according to the
    /// current review state, keeping both lists in display order.
    fn place_cluster(&mut self, cluster_id: &str) {
        let entry = if let Some(pos) = self.queue.iter().position(|(c, _)| c.id == cluster_id) {
            self.queue.remove(pos)
        } else if let Some(pos) = self.reviewed.iter().position(|(c, _)| c.id == cluster_id) {
            self.reviewed.remove(pos)
        } else {
            return;
        };

        let dest = if self.review_state.is_reviewed(cluster_id) {
            &mut self.reviewed
        } else {
            &mut self.queue
        };

        let insert_pos = dest
            .iter()
            .position(|existing| queue_order(existing, &entry) == std::cmp::Ordering::Greater)
            .unwrap_or(dest.len());
        dest.insert(insert_pos, entry);

        self.clamp_selection();
    }

    /// Keep the table selection within the current list
    fn clamp_selection(&mut self) {
        let len = self.current_clusters().len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            match self.table_state.selected() {
                Some(selected) if selected >= len => self.table_state.select(Some(len - 1)),
                Some(_) => {}
                None => self.table_state.select(Some(0)),
            }
        }
    }

    /// Toggle between Queue and Reviewed views
    pub fn toggle_view(&mut self) {
        self.current_view = match self.current_view {
            View::Queue => View::Reviewed,
            View::Reviewed => View::Queue,
        };

        // Reset selection to first item in the new view, or None if empty
        if self.current_clusters().is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(0));
        }
    }

    pub fn show_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn dismiss_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Show assessment breakdown overlay
    pub fn show_breakdown(&mut self) {
        if self.selected().is_some() {
            self.input_mode = InputMode::Breakdown;
        }
    }

    pub fn dismiss_breakdown(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Replace cluster lists with freshly loaded data
    pub fn update_clusters(&mut self, clusters: Vec<Cluster>) {
        // Reload review state from disk (the CLI may have recorded decisions meanwhile)
        match crate::review::load_review_state(&self.reviews_path) {
            Ok(state) => self.review_state = state,
            Err(e) => tracing::warn!("Keeping in-memory review state: {:#}", e),
        }

        let (queue, reviewed) = assess_and_split(
            clusters,
            &self.thresholds,
            &self.review_state,
            &mut self.assessment_cache,
        );
        self.queue = queue;
        self.reviewed = reviewed;

        self.clamp_selection();
        self.last_refresh = Instant::now();

        self.show_flash(format!(
            "Refreshed ({} in queue, {} reviewed)",
            self.queue.len(),
            self.reviewed.len()
        ));
    }

    /// Advance the loading spinner animation frame
    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::types::tests::sample_cluster;
    use crate::config::{SourceConfig, SourceKind};
    use std::env;

    fn test_app(name: &str) -> App {
        let reviews_path = env::temp_dir().join(format!("cluster_curator_test_app_{}.json", name));
        let _ = std::fs::remove_file(&reviews_path);

        let config = Config {
            source: SourceConfig {
                kind: SourceKind::File,
                path: Some(PathBuf::from("clusters.json")),
                base_url: None,
                token: None,
            },
            cluster_sets: vec![],
            thresholds: None,
            dashboard_url: None,
            reviews_path: None,
            auto_refresh_interval: 300,
        };

        let mut app = App::new_loading(
            ClusterSource::File {
                path: PathBuf::from("clusters.json"),
            },
            config,
            ReviewState::new(),
            reviews_path,
            ThemeColors::dark(),
        );
        app.update_clusters(vec![
            sample_cluster("c1", Some(0.65), Some(0.7)),
            sample_cluster("c2", Some(0.3), Some(0.3)),
            sample_cluster("c3", Some(0.9), Some(0.9)),
        ]);
        app.is_loading = false;
        app
    }

    fn queue_ids(app: &App) -> Vec<&str> {
        app.queue.iter().map(|(c, _)| c.id.as_str()).collect()
    }

    fn cleanup(app: &App) {
        let _ = std::fs::remove_file(&app.reviews_path);
    }

    #[test]
    fn test_initial_state() {
        let app = test_app("initial");
        assert_eq!(queue_ids(&app), vec!["c1", "c2", "c3"]);
        assert!(app.reviewed.is_empty());
        assert_eq!(app.table_state.selected(), Some(0));
        cleanup(&app);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = test_app("nav");
        app.previous_row();
        assert_eq!(app.table_state.selected(), Some(2));
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(0));
        cleanup(&app);
    }

    #[test]
    fn test_accept_moves_to_reviewed_and_persists() {
        let mut app = test_app("accept");
        app.accept_selected();

        assert_eq!(queue_ids(&app), vec!["c2", "c3"]);
        assert_eq!(app.reviewed.len(), 1);
        assert_eq!(app.reviewed[0].0.id, "c1");

        let saved = crate::review::load_review_state(&app.reviews_path).unwrap();
        assert_eq!(saved.decision("c1").map(|d| d.verdict), Some(Verdict::Accept));
        cleanup(&app);
    }

    #[test]
    fn test_undo_decision() {
        let mut app = test_app("undo");
        app.reject_selected();
        assert_eq!(app.reviewed.len(), 1);

        app.undo_last();
        assert_eq!(queue_ids(&app), vec!["c1", "c2", "c3"]);
        assert!(app.reviewed.is_empty());
        assert!(!app.review_state.is_reviewed("c1"));

        app.undo_last();
        assert_eq!(
            app.flash_message.as_ref().map(|(m, _)| m.as_str()),
            Some("Nothing to undo")
        );
        cleanup(&app);
    }

    #[test]
    fn test_defer_input() {
        let mut app = test_app("defer");
        app.start_defer_input();
        assert_eq!(app.input_mode, InputMode::DeferInput);

        app.defer_input = "2d".to_string();
        app.confirm_defer_input();

        assert_eq!(app.input_mode, InputMode::Normal);
        let decision = app.review_state.decision("c1").unwrap();
        assert_eq!(decision.verdict, Verdict::Defer);
        assert!(decision.until.is_some());
        assert_eq!(app.reviewed.len(), 1);
        cleanup(&app);
    }

    #[test]
    fn test_defer_invalid_duration() {
        let mut app = test_app("defer_invalid");
        app.start_defer_input();
        app.defer_input = "soon".to_string();
        app.confirm_defer_input();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.reviewed.is_empty());
        assert!(app
            .flash_message
            .as_ref()
            .is_some_and(|(m, _)| m.starts_with("Invalid duration")));
        cleanup(&app);
    }

    #[test]
    fn test_defer_too_long_is_refused() {
        let mut app = test_app("defer_too_long");
        app.start_defer_input();
        app.defer_input = "1000000years".to_string();
        app.confirm_defer_input();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.review_state.decision("c1").is_none());
        assert!(app.reviewed.is_empty());
        assert!(app
            .flash_message
            .as_ref()
            .is_some_and(|(m, _)| m.ends_with("is too large")));
        cleanup(&app);
    }

    #[test]
    fn test_revoke_only_in_reviewed_view() {
        let mut app = test_app("revoke");
        app.accept_selected();

        // Queue view: no-op
        app.revoke_selected();
        assert_eq!(app.reviewed.len(), 1);

        app.toggle_view();
        assert_eq!(app.current_view, View::Reviewed);
        app.revoke_selected();
        assert!(app.reviewed.is_empty());
        assert_eq!(app.queue.len(), 3);
        assert_eq!(app.table_state.selected(), None);

        app.undo_last();
        assert_eq!(app.reviewed.len(), 1);
        assert!(app.review_state.is_reviewed("c1"));
        cleanup(&app);
    }

    #[test]
    fn test_redecide_undo_restores_previous() {
        let mut app = test_app("redecide");
        app.accept_selected();
        app.toggle_view();
        app.reject_selected();
        assert_eq!(app.review_state.decision("c1").map(|d| d.verdict), Some(Verdict::Reject));

        app.undo_last();
        assert_eq!(app.review_state.decision("c1").map(|d| d.verdict), Some(Verdict::Accept));
        cleanup(&app);
    }

    #[test]
    fn test_breakdown_requires_selection() {
        let mut app = test_app("breakdown");
        app.show_breakdown();
        assert_eq!(app.input_mode, InputMode::Breakdown);
        app.dismiss_breakdown();

        app.toggle_view();
        app.show_breakdown();
        assert_eq!(app.input_mode, InputMode::Normal);
        cleanup(&app);
    }

    #[test]
    fn test_update_clamps_selection() {
        let mut app = test_app("clamp");
        app.table_state.select(Some(2));
        app.update_clusters(vec![sample_cluster("c1", Some(0.65), Some(0.7))]);
        assert_eq!(app.table_state.selected(), Some(0));
        cleanup(&app);
    }

    #[test]
    fn test_open_without_dashboard_url() {
        let app = test_app("open");
        assert!(app.open_selected().is_err());
        cleanup(&app);
    }

    #[test]
    fn test_undo_stack_bounded() {
        let mut app = test_app("bounded");
        for _ in 0..(MAX_UNDO + 5) {
            app.push_undo(UndoAction::Revoked {
                cluster_id: "c1".to_string(),
                label: "set70/c1".to_string(),
                decision: ReviewDecision::new(Verdict::Accept),
            });
        }
        assert_eq!(app.undo_stack.len(), MAX_UNDO);
        cleanup(&app);
    }
}
