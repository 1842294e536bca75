use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::assessment::{validate_thresholds, Band, RangePolicy, Signal, ThresholdConfig};
use crate::config::{get_config_path, ClusterSetQuery, Config, SourceConfig, SourceKind};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Print text with a typewriter effect, one character at a time.
fn typewriter(text: &str) {
    use std::thread;
    use std::time::Duration;
    for c in text.chars() {
        print!("{}", c);
        std::io::stdout().flush().ok();
        thread::sleep(Duration::from_millis(18));
    }
    println!();
}

/// Parse "high,low" (comma or whitespace separated) into a band.
fn parse_band(input: &str) -> Result<Band, String> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 2 {
        return Err("expected two numbers: high,low".to_string());
    }
    let high: f64 = parts[0]
        .parse()
        .map_err(|_| format!("'{}' is not a number", parts[0]))?;
    let low: f64 = parts[1]
        .parse()
        .map_err(|_| format!("'{}' is not a number", parts[1]))?;
    Ok(Band::new(high, low))
}

/// Parse a comma-separated list of glob patterns. Empty input means none.
fn parse_excludes(input: &str) -> Result<Option<Vec<String>>, String> {
    let patterns: Vec<String> = input
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();
    for pattern in &patterns {
        glob::Pattern::new(pattern).map_err(|e| format!("invalid pattern '{}' - {}", pattern, e))?;
    }
    Ok(if patterns.is_empty() {
        None
    } else {
        Some(patterns)
    })
}

fn prompt_source() -> Result<SourceConfig> {
    typewriter("Clusters can be read from an exported JSON/YAML file or from the dashboard API.");
    let kind = loop {
        match prompt_with_default("Data source (file/api)", "file")?.to_lowercase().as_str() {
            "file" => break SourceKind::File,
            "api" => break SourceKind::Api,
            other => println!("  Invalid: '{}'. Enter 'file' or 'api'.", other),
        }
    };

    match kind {
        SourceKind::File => {
            let path = loop {
                let p = prompt("Path to cluster export: ")?;
                if !p.is_empty() {
                    break p;
                }
                println!("  Path is required.");
            };
            Ok(SourceConfig {
                kind,
                path: Some(PathBuf::from(path)),
                base_url: None,
                token: None,
            })
        }
        SourceKind::Api => {
            let base_url = loop {
                let url = prompt("Dashboard API base URL: ")?;
                if url.starts_with("http://") || url.starts_with("https://") {
                    break url;
                }
                println!("  Invalid: must start with http:// or https://.");
            };
            let token = prompt("API token (leave empty for none): ")?;
            Ok(SourceConfig {
                kind,
                path: None,
                base_url: Some(base_url),
                token: (!token.is_empty()).then_some(token),
            })
        }
    }
}

fn prompt_cluster_sets() -> Result<Vec<ClusterSetQuery>> {
    println!();
    typewriter("Now list the cluster sets to review. Use the cluster set ids as they appear in the dashboard.");

    let mut sets = Vec::new();
    loop {
        let id = loop {
            let id = prompt("Cluster set id: ")?;
            if !id.is_empty() {
                break id;
            }
            println!("  Cluster set id is required.");
        };
        let name = prompt("Display name (optional): ")?;
        let exclude = loop {
            let input = prompt("Exclude cluster ids matching (comma-separated globs, optional): ")?;
            match parse_excludes(&input) {
                Ok(patterns) => break patterns,
                Err(e) => println!("  Invalid: {}. Try again.", e),
            }
        };

        sets.push(ClusterSetQuery {
            id,
            name: (!name.is_empty()).then_some(name),
            exclude,
        });

        if !prompt_yes_no("Add another cluster set?", false)? {
            break;
        }
        println!();
    }
    Ok(sets)
}

fn prompt_thresholds() -> Result<ThresholdConfig> {
    println!();
    typewriter("Each signal is split into three tiers by a high and a low cut point, both between 0 and 1.");
    typewriter("Structure consistency and t-group homogeneity decide the status; the others only inform the notes.");

    let defaults = ThresholdConfig::default();
    let mut config = ThresholdConfig::default();

    for signal in Signal::ALL {
        let current = signal.band(&defaults);
        let band = loop {
            let input = prompt_with_default(
                &format!("{} (high,low)", signal.label()),
                &format!("{},{}", current.high, current.low),
            )?;
            let band = match parse_band(&input) {
                Ok(b) => b,
                Err(e) => {
                    println!("  Invalid: {}. Try again.", e);
                    continue;
                }
            };
            let candidate = ThresholdConfig {
                structure_consistency: Some(band),
                ..ThresholdConfig::default()
            };
            match validate_thresholds(&candidate) {
                Ok(()) => break band,
                Err(errors) => {
                    for error in errors {
                        println!("  Invalid: {}", error.trim_start_matches("thresholds.structure_consistency"));
                    }
                }
            }
        };
        match signal {
            Signal::StructureConsistency => config.structure_consistency = Some(band),
            Signal::ExperimentalSupport => config.experimental_support = Some(band),
            Signal::TaxonomicDiversity => config.taxonomic_diversity = Some(band),
            Signal::TgroupHomogeneity => config.tgroup_homogeneity = Some(band),
        }
    }

    typewriter("Metrics outside [0, 1] can be clamped into range or rejected (the cluster is skipped).");
    config.out_of_range = loop {
        match prompt_with_default("Out-of-range metrics (clamp/reject)", "clamp")?.as_str() {
            "clamp" => break Some(RangePolicy::Clamp),
            "reject" => break Some(RangePolicy::Reject),
            other => println!("  Invalid: '{}'. Enter 'clamp' or 'reject'.", other),
        }
    };

    Ok(config)
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    typewriter("Cluster Curator Configuration Wizard");
    println!("====================================");
    println!();

    // 1. Data source
    let source = prompt_source()?;

    // 2. Cluster sets (at least one required)
    let cluster_sets = prompt_cluster_sets()?;

    // 3. Thresholds
    println!();
    let thresholds = if prompt_yes_no("Configure thresholds? (n accepts defaults)", false)? {
        Some(prompt_thresholds()?)
    } else {
        None
    };

    // 4. Dashboard URL for opening clusters in the browser
    println!();
    let dashboard_default = source.base_url.clone().unwrap_or_default();
    let dashboard_url = if dashboard_default.is_empty() {
        prompt("Web dashboard URL for opening clusters (optional): ")?
    } else {
        prompt_with_default("Web dashboard URL for opening clusters", &dashboard_default)?
    };

    // 5. Config path
    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    // 6. Write config
    let config = Config {
        source,
        cluster_sets,
        thresholds,
        dashboard_url: (!dashboard_url.is_empty()).then_some(dashboard_url),
        reviews_path: None,
        auto_refresh_interval: 300,
    };

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Run `cluster-curator` to get started.");

    Ok(())
}
