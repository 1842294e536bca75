use ratatui::prelude::*;
use ratatui::widgets::{Block, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};

use crate::assessment::Metric;
use crate::tui::app::{App, InputMode, View};
use crate::tui::theme::ThemeColors;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Handle very small terminal sizes gracefully
    if area.height < 6 || area.width < 30 {
        let msg = Paragraph::new("Terminal too small").alignment(Alignment::Center);
        frame.render_widget(msg, area);
        return;
    }

    // Layout: Title(1) + Tabs(1) + Table(fill) + Status(1)
    let chunks = Layout::vertical([
        Constraint::Length(1), // Title bar
        Constraint::Length(1), // Tab bar
        Constraint::Fill(1),   // Cluster table
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    render_title(frame, chunks[0], app);
    render_tabs(frame, chunks[1], app);
    render_table(frame, chunks[2], app);
    render_status_bar(frame, chunks[3], app);

    match app.input_mode {
        InputMode::DeferInput => render_defer_popup(frame, app),
        InputMode::Help => render_help_popup(frame, &app.theme),
        InputMode::Breakdown => render_breakdown_popup(frame, app),
        InputMode::Normal => {}
    }

    // Loading overlay goes on top of everything
    if app.is_loading {
        render_loading_overlay(frame, app);
    }
}

fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let name = "Cluster Curator";
    let mut spans = vec![Span::styled(
        name,
        Style::default().fg(app.theme.title_color).bold(),
    )];

    let source = app.source.describe();
    let padding_len = (area.width as usize).saturating_sub(name.len() + source.chars().count());
    spans.push(Span::raw(" ".repeat(padding_len)));
    spans.push(Span::styled(source, Style::default().fg(app.theme.muted)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let titles = vec![
        format!("Queue ({})", app.queue.len()),
        format!("Reviewed ({})", app.reviewed.len()),
    ];
    let selected = match app.current_view {
        View::Queue => 0,
        View::Reviewed => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive_style)
        .highlight_style(app.theme.tab_active_style)
        .divider(" | ");

    frame.render_widget(tabs, area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &mut App) {
    let theme = &app.theme;
    let clusters = match app.current_view {
        View::Queue => &app.queue,
        View::Reviewed => &app.reviewed,
    };

    if clusters.is_empty() {
        let text = match app.current_view {
            View::Queue => "No clusters awaiting review",
            View::Reviewed => "No reviewed clusters",
        };
        let empty_msg = Paragraph::new(text).alignment(Alignment::Center);
        frame.render_widget(empty_msg, area);
        return;
    }

    let rows: Vec<Row> = clusters
        .iter()
        .enumerate()
        .map(|(idx, (cluster, assessment))| {
            let index = format!("{}.", idx + 1);
            let decision = app.review_state.decision(&cluster.id);
            let status = decision
                .map(|d| d.effective_status(assessment.status))
                .unwrap_or(assessment.status);

            let mut badge = crate::output::format_status(status, assessment.incomplete);
            if let Some(d) = decision {
                let remaining = d.format_remaining();
                if !remaining.is_empty() {
                    badge = format!("{} {}", badge, remaining);
                }
            }

            let structure = cluster.validation.structure_consistency;
            let mut structure_spans = vec![Span::raw(format!("{:>4} ", structure.to_string()))];
            structure_spans.extend(structure_bar(structure, 8, theme).spans);

            let row_style = if idx % 2 == 1 {
                Style::default().bg(theme.row_alt_bg)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(index).style(Style::default().fg(theme.index_color)),
                Cell::from(badge).style(Style::default().fg(theme.status_color(status))),
                Cell::from(Line::from(structure_spans)),
                Cell::from(truncate_text(&cluster.representative, 40)),
                Cell::from(cluster.cluster_set.clone()),
                Cell::from(format!("{:>5}", cluster.size)),
            ])
            .style(row_style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),  // Index: "99."
        Constraint::Length(18), // Status: "review* 3d left"
        Constraint::Length(14), // Structure + bar: "0.85 ███████░"
        Constraint::Fill(1),    // Representative
        Constraint::Length(16), // Cluster set
        Constraint::Length(6),  // Size
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Status", "Structure", "Representative", "Set", "Size"])
                .style(theme.header_style)
                .bottom_margin(1),
        )
        .row_highlight_style(theme.row_selected);

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let text = if let Some((ref msg, _)) = app.flash_message {
        let msg_color = if msg.starts_with("Failed")
            || msg.starts_with("Invalid")
            || msg.contains("timed out")
            || msg.contains("panicked")
        {
            theme.flash_error
        } else if msg.starts_with("Accepted:")
            || msg.starts_with("Rejected:")
            || msg.starts_with("Deferred:")
            || msg.starts_with("Revoked:")
            || msg.starts_with("Refreshed")
            || msg.starts_with("Opened:")
        {
            theme.flash_success
        } else {
            theme.flash_default
        };
        Line::from(Span::styled(msg.clone(), Style::default().fg(msg_color)))
    } else {
        let count = format!("{} clusters", app.current_clusters().len());

        let elapsed = app.last_refresh.elapsed();
        let refresh_time = if elapsed.as_secs() < 60 {
            format!("refreshed {}s ago", elapsed.as_secs())
        } else {
            format!("refreshed {}m ago", elapsed.as_secs() / 60)
        };

        let hints: &[(&str, &str)] = match app.current_view {
            View::Queue => &[
                ("j/k", ":nav "),
                ("a", ":accept "),
                ("x", ":reject "),
                ("d", ":defer "),
                ("b", ":breakdown "),
                ("Tab", ":reviewed "),
                ("?", ":help "),
                ("q", ":quit"),
            ],
            View::Reviewed => &[
                ("j/k", ":nav "),
                ("u", ":revoke "),
                ("z", ":undo "),
                ("b", ":breakdown "),
                ("Tab", ":queue "),
                ("?", ":help "),
                ("q", ":quit"),
            ],
        };

        let mut spans = vec![
            Span::styled(count, Style::default().fg(theme.muted)),
            Span::raw(" "),
            Span::styled(refresh_time, Style::default().fg(theme.muted)),
            Span::raw("  "),
        ];
        for (i, (key, label)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(theme.status_key_color)));
            spans.push(Span::raw(*label));
        }
        Line::from(spans)
    };

    frame.render_widget(
        Paragraph::new(text).style(Style::default().bg(theme.status_bar_bg)),
        area,
    );
}

fn structure_bar(metric: Metric, width: usize, theme: &ThemeColors) -> Line<'static> {
    let filled = match metric.value() {
        Some(v) => (v.clamp(0.0, 1.0) * width as f64).round() as usize,
        None => 0,
    };
    let empty = width.saturating_sub(filled);

    let mut spans = Vec::new();
    if filled > 0 {
        spans.push(Span::styled("█".repeat(filled), Style::default().fg(theme.bar_filled)));
    }
    if empty > 0 {
        spans.push(Span::styled("░".repeat(empty), Style::default().fg(theme.bar_empty)));
    }

    Line::from(spans)
}

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

fn popup_block<'a>(title: &'a str, theme: &ThemeColors) -> Block<'a> {
    Block::bordered()
        .title(Span::styled(title, theme.popup_title))
        .border_style(Style::default().fg(theme.popup_border))
        .style(Style::default().bg(theme.popup_bg))
}

/// Render the defer duration input popup
fn render_defer_popup(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect_fixed(44, 5, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = popup_block(" Defer Review ", &app.theme);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::vertical([
        Constraint::Length(1), // Input line
        Constraint::Length(1), // Help text
    ])
    .split(inner);

    let input = Paragraph::new(format!("{}|", app.defer_input));
    frame.render_widget(input, chunks[0]);

    let help = Paragraph::new("Enter: confirm | Esc: cancel | empty = indefinite")
        .style(Style::default().fg(app.theme.muted));
    frame.render_widget(help, chunks[1]);
}

/// Render the assessment breakdown for the selected cluster
fn render_breakdown_popup(frame: &mut Frame, app: &App) {
    let Some((cluster, assessment)) = app.selected() else {
        return;
    };
    let theme = &app.theme;

    let popup_area = centered_rect_fixed(64, 16, frame.area());
    frame.render_widget(Clear, popup_area);

    let title = format!(" {} ", cluster.short_ref());
    let block = popup_block(&title, theme);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(
                assessment.status.label(),
                Style::default().fg(theme.status_color(assessment.status)).bold(),
            ),
            Span::styled(
                format!("  ({})", assessment.breakdown.rule),
                Style::default().fg(theme.muted),
            ),
        ]),
        Line::from(""),
    ];

    for reading in &assessment.breakdown.readings {
        let label_style = if reading.signal.is_composite() {
            Style::default().bold()
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<24}", reading.signal.label()), label_style),
            Span::raw(format!("{:>5}  ", reading.value.to_string())),
            Span::styled(reading.tier_name(), Style::default().fg(theme.muted)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(assessment.notes.clone()));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Bold signals decide the status. Esc/b: close",
        Style::default().fg(theme.muted),
    )));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

/// Create a centered rectangle with fixed width and height
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Render the help overlay popup
fn render_help_popup(frame: &mut Frame, theme: &ThemeColors) {
    let popup_area = centered_rect_fixed(50, 18, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = popup_block(" Keyboard Shortcuts ", theme);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key_style = Style::default().fg(theme.status_key_color).bold();
    let entries = [
        ("j / Down      ", "Move down"),
        ("k / Up        ", "Move up"),
        ("Enter / o     ", "Open cluster in dashboard"),
        ("a             ", "Accept classification"),
        ("x             ", "Reject classification"),
        ("d             ", "Defer review"),
        ("u             ", "Revoke decision (Reviewed)"),
        ("z             ", "Undo last action"),
        ("b             ", "Assessment breakdown"),
        ("Tab           ", "Toggle Queue/Reviewed"),
        ("r             ", "Refresh (bypasses cache)"),
        ("?             ", "Show/hide this help"),
        ("q / Ctrl-c    ", "Quit"),
    ];

    let mut help_lines: Vec<Line> = entries
        .iter()
        .map(|(key, action)| Line::from(vec![Span::styled(*key, key_style), Span::raw(*action)]))
        .collect();
    help_lines.push(Line::from(""));
    help_lines.push(Line::from(Span::styled(
        "Press any key to close",
        Style::default().fg(theme.muted),
    )));

    frame.render_widget(Paragraph::new(help_lines), inner);
}

/// Render the loading spinner overlay
fn render_loading_overlay(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect_fixed(30, 3, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().border_style(Style::default().fg(app.theme.popup_border));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Braille spinner animation
    let spinner_chars = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let spinner = spinner_chars[app.spinner_frame % 10];

    let text = if app.queue.is_empty() && app.reviewed.is_empty() {
        format!("{} Loading clusters...", spinner)
    } else {
        format!("{} Refreshing...", spinner)
    };

    let loading_text = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(app.theme.title_color));

    frame.render_widget(loading_text, inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_bar() {
        let theme = ThemeColors::dark();
        let full = structure_bar(Metric::Known(1.0), 8, &theme);
        assert_eq!(full.spans.len(), 1);
        assert_eq!(full.spans[0].content, "████████");

        let half = structure_bar(Metric::Known(0.5), 8, &theme);
        assert_eq!(half.spans[0].content, "████");
        assert_eq!(half.spans[1].content, "░░░░");

        let unknown = structure_bar(Metric::Unknown, 8, &theme);
        assert_eq!(unknown.spans[0].content, "░░░░░░░░");
    }

    #[test]
    fn test_centered_rect_clamps() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect_fixed(50, 5, area);
        assert_eq!(rect.width, 20);
        assert_eq!(rect.y, 2);
    }
}
