use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use cluster_curator::assessment::ValidationStatus;
use cluster_curator::clusters::{CacheConfig, ClusterSource, SourceError};
use cluster_curator::config::Config;
use cluster_curator::fetch::AssessedCluster;
use cluster_curator::output::{self, ClusterRow};
use cluster_curator::review::{ReviewDecision, ReviewState, Verdict};

const EXIT_SUCCESS: i32 = 0;
const EXIT_DATA_SOURCE: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Tsv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusFilter {
    Valid,
    Invalid,
    NeedsReview,
}

impl StatusFilter {
    fn matches(&self, status: ValidationStatus) -> bool {
        matches!(
            (self, status),
            (StatusFilter::Valid, ValidationStatus::Valid)
                | (StatusFilter::Invalid, ValidationStatus::Invalid)
                | (StatusFilter::NeedsReview, ValidationStatus::NeedsReview)
        )
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ReviewAction {
    /// Accept the cluster's classification
    #[arg(long)]
    accept: bool,

    /// Reject the cluster's classification
    #[arg(long)]
    reject: bool,

    /// Defer the review for a duration (e.g. "3d", "1w"), or "indefinite"
    #[arg(long, value_name = "DURATION")]
    defer: Option<String>,

    /// Remove the recorded decision
    #[arg(long)]
    revoke: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List clusters awaiting review, most urgent first
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Only show clusters with this status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,

        /// List reviewed clusters instead of the queue
        #[arg(long)]
        reviewed: bool,
    },
    /// Show a cluster's assessment breakdown by its index number
    Show {
        /// Index number of the cluster (1-based, as shown in list)
        index: usize,

        /// Index refers to the reviewed list
        #[arg(long)]
        reviewed: bool,
    },
    /// Open a cluster's dashboard page in the browser by its index number
    Open {
        /// Index number of the cluster (1-based, as shown in list)
        index: usize,
    },
    /// Record a review decision for a cluster
    Review {
        /// Cluster id
        cluster_id: String,

        #[command(flatten)]
        action: ReviewAction,

        /// Free-text note stored with the decision
        #[arg(long)]
        note: Option<String>,

        /// T-group the cluster should be reclassified to (e.g. 2004.1.1)
        #[arg(long, value_name = "ID")]
        tgroup: Option<String>,
    },
    /// List reclassification proposals
    Reclassifications {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Create a config file interactively
    Init,
    /// Remove the HTTP response cache
    ClearCache,
}

#[derive(Parser, Debug)]
#[command(name = "cluster-curator")]
#[command(about = "Assess and curate protein-domain clusters", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/cluster-curator/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bypass the HTTP response cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn exit_with_config_errors(errors: Vec<String>) -> ! {
    eprintln!("Config errors:");
    for error in errors {
        eprintln!("  - {}", error);
    }
    std::process::exit(EXIT_CONFIG);
}

#[tokio::main]
async fn main() {
    // rustls 0.23+ needs a process-wide crypto provider; a second install is harmless
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    cluster_curator::logging::init(cli.verbose);
    let start_time = Instant::now();
    let config_path = cli.config.map(PathBuf::from);

    // Commands that don't need a config
    match &cli.command {
        Some(Commands::Init) => {
            if let Err(e) = cluster_curator::config::init::run_init_wizard(config_path) {
                eprintln!("Init failed: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Some(Commands::ClearCache) => {
            if let Err(e) = cluster_curator::clusters::cache::clear_cache() {
                eprintln!("Failed to clear cache: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Cache cleared.");
            std::process::exit(EXIT_SUCCESS);
        }
        _ => {}
    }

    let config = match cluster_curator::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = cluster_curator::config::validate_config(&config) {
        exit_with_config_errors(errors);
    }

    tracing::debug!("Loaded {} cluster sets from config", config.cluster_sets.len());

    let reviews_path = cluster_curator::config::reviews_path(&config);
    let mut review_state = match cluster_curator::review::load_review_state(&reviews_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Review state error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Expired deferrals go back to the queue
    let before = review_state.decisions().len();
    review_state.clean_expired();
    if review_state.decisions().len() != before {
        if let Err(e) = cluster_curator::review::save_review_state(&reviews_path, &review_state) {
            tracing::warn!("Failed to prune expired deferrals: {:#}", e);
        }
    }

    // Review only touches the local review file
    let command = match cli.command {
        Some(Commands::Review {
            cluster_id,
            action,
            note,
            tgroup,
        }) => {
            run_review(&reviews_path, review_state, cluster_id, action, note, tgroup);
            std::process::exit(EXIT_SUCCESS);
        }
        other => other,
    };

    if config.cluster_sets.is_empty() {
        eprintln!("No cluster sets configured in config file.");
        eprintln!("Add cluster sets to ~/.config/cluster-curator/config.yaml:");
        eprintln!("  cluster_sets:");
        eprintln!("    - id: \"v2024-70\"");
        eprintln!("      name: \"70% identity\"");
        std::process::exit(EXIT_CONFIG);
    }

    let cache_config = CacheConfig {
        enabled: !cli.no_cache,
    };
    tracing::debug!(
        "Cache: {}",
        if cache_config.enabled { "enabled" } else { "disabled (--no-cache)" }
    );

    let source = match ClusterSource::from_config(&config.source, &cache_config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Data source error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let command = match command {
        Some(c) => c,
        None if std::io::stdout().is_terminal() => {
            run_dashboard(source, config, review_state, reviews_path).await;
            std::process::exit(EXIT_SUCCESS);
        }
        None => Commands::List {
            format: OutputFormat::Table,
            status: None,
            reviewed: false,
        },
    };

    let (queue, reviewed) =
        match cluster_curator::fetch::fetch_and_assess_clusters(&source, &config, &review_state).await {
            Ok(lists) => lists,
            Err(e) => {
                if let Some(source_error) = e.downcast_ref::<SourceError>() {
                    eprintln!("{}", source_error);
                } else {
                    eprintln!("Failed to load clusters: {:#}", e);
                }
                std::process::exit(EXIT_DATA_SOURCE);
            }
        };

    let use_colors = output::should_use_colors();

    match command {
        Commands::List {
            format,
            status,
            reviewed: show_reviewed,
        } => {
            let list = if show_reviewed { &reviewed } else { &queue };
            let rows: Vec<ClusterRow> = ClusterRow::from_list(list, &review_state)
                .into_iter()
                .filter(|row| status.map_or(true, |s| s.matches(row.effective_status())))
                .collect();

            match format {
                OutputFormat::Table => println!("{}", output::format_cluster_table(&rows, use_colors)),
                OutputFormat::Tsv => println!("{}", output::format_tsv(&rows)),
                OutputFormat::Json => match output::format_json(&rows) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to export clusters: {:#}", e);
                        std::process::exit(EXIT_DATA_SOURCE);
                    }
                },
            }

            tracing::debug!("Total: {} clusters in {:?}", rows.len(), start_time.elapsed());
        }
        Commands::Show {
            index,
            reviewed: show_reviewed,
        } => {
            let list = if show_reviewed { &reviewed } else { &queue };
            let (cluster, assessment) = pick(list, index);
            let row = ClusterRow {
                cluster,
                assessment,
                decision: review_state.decision(&cluster.id),
            };
            println!("{}", output::format_cluster_detail(&row, use_colors));
        }
        Commands::Open { index } => {
            let dashboard_url = match config.dashboard_url.as_deref() {
                Some(url) => url,
                None => {
                    eprintln!("dashboard_url is not set in config.");
                    std::process::exit(EXIT_CONFIG);
                }
            };
            let (cluster, _) = pick(&queue, index);
            let url = cluster_curator::browser::cluster_url(dashboard_url, &cluster.id);

            if let Err(e) = cluster_curator::browser::open_url(&url) {
                eprintln!("Failed to open browser: {:#}", e);
                std::process::exit(EXIT_DATA_SOURCE);
            }

            println!("Opening cluster {} in browser: {}", cluster.short_ref(), url);
        }
        Commands::Reclassifications { format } => {
            let all: Vec<AssessedCluster> = queue.into_iter().chain(reviewed).collect();
            let proposals = cluster_curator::reclassify::collect_proposals(&all, &review_state);

            match format {
                OutputFormat::Json => match serde_json::to_string_pretty(&proposals) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to export proposals: {}", e);
                        std::process::exit(EXIT_DATA_SOURCE);
                    }
                },
                OutputFormat::Table | OutputFormat::Tsv => {
                    println!("{}", output::format_reclassifications(&proposals, use_colors))
                }
            }
        }
        Commands::Review { .. } | Commands::Init | Commands::ClearCache => {}
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Entry at `index` (1-based) or exit with a usage error
fn pick(list: &[AssessedCluster], index: usize) -> &AssessedCluster {
    if index < 1 || index > list.len() {
        eprintln!(
            "Invalid index {}. Must be between 1 and {}.",
            index,
            list.len()
        );
        std::process::exit(EXIT_CONFIG);
    }
    &list[index - 1]
}

/// Verdict and defer expiry for `review --accept | --reject | --defer`
fn verdict_from_action(
    action: &ReviewAction,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(Verdict, Option<chrono::DateTime<chrono::Utc>>), String> {
    if action.accept {
        Ok((Verdict::Accept, None))
    } else if action.reject {
        Ok((Verdict::Reject, None))
    } else {
        let input = action.defer.as_deref().unwrap_or("indefinite");
        let until = cluster_curator::review::defer_until(input, now)?;
        Ok((Verdict::Defer, until))
    }
}

fn run_review(
    reviews_path: &std::path::Path,
    mut state: ReviewState,
    cluster_id: String,
    action: ReviewAction,
    note: Option<String>,
    tgroup: Option<String>,
) {
    if let Some(t) = tgroup.as_deref() {
        if !cluster_curator::reclassify::is_tgroup_id(t) {
            eprintln!("Invalid T-group '{}': expected a dotted numeric id like 2004.1.1", t);
            std::process::exit(EXIT_CONFIG);
        }
    }

    let message = if action.revoke {
        if state.revoke(&cluster_id).is_none() {
            println!("No decision recorded for {}.", cluster_id);
            return;
        }
        format!("Revoked decision for {}", cluster_id)
    } else {
        let (verdict, until) = match verdict_from_action(&action, chrono::Utc::now()) {
            Ok(v) => v,
            Err(msg) => {
                eprintln!("{}", msg);
                std::process::exit(EXIT_CONFIG);
            }
        };

        let decision = ReviewDecision::new(verdict)
            .with_note(note)
            .with_proposed_tgroup(tgroup)
            .deferred_until(until);
        let remaining = decision.format_remaining();
        state.decide(cluster_id.clone(), decision);

        if remaining.is_empty() {
            format!("{} {}", verdict.past_tense(), cluster_id)
        } else {
            format!("{} {} ({})", verdict.past_tense(), cluster_id, remaining)
        }
    };

    if let Err(e) = cluster_curator::review::save_review_state(reviews_path, &state) {
        eprintln!("Failed to save review state: {:#}", e);
        std::process::exit(EXIT_CONFIG);
    }
    println!("{}", message);
}

async fn run_dashboard(
    source: ClusterSource,
    config: Config,
    review_state: ReviewState,
    reviews_path: PathBuf,
) {
    // Query the terminal background before raw mode takes over
    let theme = cluster_curator::tui::resolve_theme();
    let app = cluster_curator::tui::App::new_loading(
        source,
        config,
        review_state,
        reviews_path,
        theme.colors(),
    );

    if let Err(e) = cluster_curator::tui::run_tui(app).await {
        eprintln!("TUI error: {:#}", e);
        std::process::exit(EXIT_DATA_SOURCE);
    }
}
