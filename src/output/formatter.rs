use std::io::IsTerminal;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeMap;
use terminal_size::{Width, terminal_size};

use crate::assessment::{ClassificationAssessment, ValidationStatus};
use crate::clusters::Cluster;
use crate::reclassify::ReclassificationProposal;
use crate::review::{ReviewDecision, ReviewState};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Status in compact form for table columns.
/// If incomplete is true, appends asterisk to indicate some signals were unknown
pub fn format_status(status: ValidationStatus, incomplete: bool) -> String {
    let label = match status {
        ValidationStatus::Valid => "valid",
        ValidationStatus::Invalid => "invalid",
        ValidationStatus::NeedsReview => "review",
    };
    if incomplete {
        format!("{}*", label)
    } else {
        label.to_string()
    }
}

fn colorize_status(text: &str, status: ValidationStatus) -> String {
    match status {
        ValidationStatus::Valid => text.green().to_string(),
        ValidationStatus::Invalid => text.red().to_string(),
        ValidationStatus::NeedsReview => text.yellow().to_string(),
    }
}

/// A cluster with its assessment and any review decision, ready for display
pub struct ClusterRow<'a> {
    pub cluster: &'a Cluster,
    pub assessment: &'a ClassificationAssessment,
    pub decision: Option<&'a ReviewDecision>,
}

impl<'a> ClusterRow<'a> {
    pub fn from_list(
        list: &'a [(Cluster, ClassificationAssessment)],
        state: &'a ReviewState,
    ) -> Vec<ClusterRow<'a>> {
        list.iter()
            .map(|(cluster, assessment)| ClusterRow {
                cluster,
                assessment,
                decision: state.decision(&cluster.id),
            })
            .collect()
    }

    /// Curator verdict if present, computed status otherwise
    pub fn effective_status(&self) -> ValidationStatus {
        match self.decision {
            Some(d) => d.effective_status(self.assessment.status),
            None => self.assessment.status,
        }
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate_text(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format clusters as a table with columns: Index, Status, Structure,
/// Representative, Reference. No headers.
/// Index column: 3 chars (fits "99."), right-aligned
/// Status column: 8 chars (fits "invalid*")
pub fn format_cluster_table(rows: &[ClusterRow], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No clusters found.".to_string();
    }

    let term_width = get_terminal_width();

    let index_width = 3;
    let status_width = 8;
    let structure_width = 4;
    let separator = "  ";

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let index_str = format!("{:>2}.", idx + 1);
            let status = row.effective_status();
            let status_str = format!(
                "{:<width$}",
                format_status(status, row.assessment.incomplete),
                width = status_width
            );
            let structure_str = format!(
                "{:>width$}",
                row.cluster.validation.structure_consistency.to_string(),
                width = structure_width
            );

            let short_ref = row.cluster.short_ref();
            let fixed_width = index_width
                + 1
                + status_width
                + structure_width
                + separator.len() * 3
                + short_ref.len();

            let representative = if let Some(width) = term_width {
                if width > fixed_width + 10 {
                    truncate_text(&row.cluster.representative, width - fixed_width)
                } else {
                    truncate_text(&row.cluster.representative, 20)
                }
            } else {
                row.cluster.representative.clone()
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    colorize_status(&status_str, status),
                    separator,
                    structure_str.bold(),
                    separator,
                    representative,
                    separator,
                    short_ref.underline()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str,
                    status_str,
                    separator,
                    structure_str,
                    separator,
                    representative,
                    separator,
                    short_ref
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format clusters as tab-separated values for scripting
/// Columns: status, structure_consistency, tgroup_homogeneity, representative,
/// cluster_ref, size (no headers, no colors). Unknown metrics are empty.
pub fn format_tsv(rows: &[ClusterRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let metric = |m: crate::assessment::Metric| m.value().map(|v| format!("{:.2}", v)).unwrap_or_default();

    rows.iter()
        .map(|row| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.effective_status().label(),
                metric(row.cluster.validation.structure_consistency),
                metric(row.cluster.validation.tgroup_homogeneity),
                row.cluster.representative,
                row.cluster.short_ref(),
                row.cluster.size
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct ClusterExportRecord<'a> {
    id: &'a str,
    cluster_set: &'a str,
    representative: &'a str,
    size: u32,
    tgroup: Option<&'a str>,
    status: ValidationStatus,
    computed_status: ValidationStatus,
    notes: &'a str,
    incomplete: bool,
    signals: BTreeMap<&'static str, SignalExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<&'a ReviewDecision>,
}

#[derive(Serialize)]
struct SignalExport {
    value: Option<f64>,
    tier: &'static str,
}

/// Format clusters as a pretty-printed JSON array
pub fn format_json(rows: &[ClusterRow]) -> anyhow::Result<String> {
    let records: Vec<ClusterExportRecord> = rows
        .iter()
        .map(|row| ClusterExportRecord {
            id: &row.cluster.id,
            cluster_set: &row.cluster.cluster_set,
            representative: &row.cluster.representative,
            size: row.cluster.size,
            tgroup: row.cluster.tgroup.as_deref(),
            status: row.effective_status(),
            computed_status: row.assessment.status,
            notes: &row.assessment.notes,
            incomplete: row.assessment.incomplete,
            signals: row
                .assessment
                .breakdown
                .readings
                .iter()
                .map(|r| {
                    (
                        r.signal.key(),
                        SignalExport {
                            value: r.value.value(),
                            tier: r.tier_name(),
                        },
                    )
                })
                .collect(),
            decision: row.decision,
        })
        .collect();

    Ok(serde_json::to_string_pretty(&records)?)
}

/// Format a single cluster with detailed multi-line output, including the
/// assessment breakdown
pub fn format_cluster_detail(row: &ClusterRow, use_colors: bool) -> String {
    let cluster = row.cluster;
    let assessment = row.assessment;
    let status = row.effective_status();

    let mut lines = Vec::new();

    let header = format!("{}  {}", cluster.representative, cluster.short_ref());
    lines.push(if use_colors {
        header.bold().to_string()
    } else {
        header
    });

    let mut status_line = status.label().to_string();
    if assessment.incomplete {
        status_line.push_str(" (incomplete data)");
    }
    if status != assessment.status {
        status_line.push_str(&format!(" [computed: {}]", assessment.status.label()));
    }
    lines.push(format!(
        "  Status: {}",
        if use_colors {
            colorize_status(&status_line, status)
        } else {
            status_line
        }
    ));
    lines.push(format!("  Size: {}", cluster.size));

    match cluster.tgroup.as_deref() {
        Some(tgroup) => match cluster.tgroup_share(tgroup) {
            Some(share) => lines.push(format!(
                "  T-group: {} ({:.0}% of classified members)",
                tgroup,
                share * 100.0
            )),
            None => lines.push(format!("  T-group: {}", tgroup)),
        },
        None => lines.push("  T-group: unassigned".to_string()),
    }

    if let Some(taxonomy) = &cluster.taxonomy {
        let count = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        lines.push(format!(
            "  Taxonomy: {} species, {} phyla",
            count(taxonomy.distinct_species),
            count(taxonomy.distinct_phyla)
        ));
    }

    if let Some(quality) = &cluster.quality {
        let value = |v: Option<f64>, precision: usize| {
            v.map(|v| format!("{:.*}", precision, v))
                .unwrap_or_else(|| "n/a".to_string())
        };
        lines.push(format!(
            "  Quality: pLDDT {}, TM-score {}, RMSD {}",
            value(quality.mean_plddt, 1),
            value(quality.mean_tm_score, 2),
            value(quality.mean_rmsd, 2)
        ));
    }

    lines.push(format!("  Breakdown ({}):", assessment.breakdown.rule));
    for reading in &assessment.breakdown.readings {
        let marker = if reading.signal.is_composite() { "*" } else { " " };
        lines.push(format!(
            "   {}{:<24}{:>5}  {}",
            marker,
            reading.signal.label(),
            reading.value.to_string(),
            reading.tier_name()
        ));
    }

    lines.push(format!("  Notes: {}", assessment.notes));

    if let Some(decision) = row.decision {
        let mut review = decision.verdict.past_tense().to_string();
        let remaining = decision.format_remaining();
        if !remaining.is_empty() {
            review.push_str(&format!(" ({})", remaining));
        }
        if let Some(tgroup) = &decision.proposed_tgroup {
            review.push_str(&format!(", proposed T-group {}", tgroup));
        }
        lines.push(format!("  Review: {}", review));
        if let Some(note) = &decision.note {
            lines.push(format!("  Review note: {}", note));
        }
    }

    lines.join("\n")
}

/// Format reclassification proposals, one per line
pub fn format_reclassifications(proposals: &[ReclassificationProposal], use_colors: bool) -> String {
    if proposals.is_empty() {
        return "No reclassification proposals.".to_string();
    }

    proposals
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let index_str = format!("{:>2}.", idx + 1);
            let reference = format!("{}/{}", p.cluster_set, p.cluster_id);
            let current = p.current_tgroup.as_deref().unwrap_or("unassigned");
            let line = format!(
                "{}  {} -> {}  {:<6}  {:<8}  ({})",
                reference,
                current,
                p.proposed_tgroup,
                p.confidence.label(),
                p.status.label(),
                p.source.label()
            );
            if use_colors {
                format!("{} {}", index_str.dimmed(), line)
            } else {
                format!("{} {}", index_str, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
