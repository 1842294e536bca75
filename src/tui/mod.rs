pub mod app;
pub mod event;
pub mod theme;
pub mod ui;

pub use app::App;
pub use theme::{resolve_theme, Theme, ThemeColors};

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use event::{Event, EventHandler};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::error::Elapsed;

use crate::clusters::{Cluster, SourceError};
use app::InputMode;

const TICK: Duration = Duration::from_millis(250);
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Auto-refresh is held back this long after the last key press
const IDLE_BEFORE_REFRESH: Duration = Duration::from_secs(10);

type FetchResult = Result<anyhow::Result<Vec<Cluster>>, Elapsed>;

fn spawn_fetch(app: &mut App) -> JoinHandle<FetchResult> {
    let source = app.source.clone();
    let config = app.config.clone();
    app.is_loading = true;
    tokio::spawn(async move {
        tokio::time::timeout(FETCH_TIMEOUT, crate::fetch::load_clusters(&source, &config)).await
    })
}

fn finish_fetch(app: &mut App, outcome: Result<FetchResult, JoinError>) {
    app.is_loading = false;
    match outcome {
        Ok(Ok(Ok(clusters))) => app.update_clusters(clusters),
        Ok(Ok(Err(e))) => match e.downcast_ref::<SourceError>() {
            Some(source_error) => app.show_flash(format!("Failed: {}", source_error)),
            None => app.show_flash(format!("Refresh failed: {}", e)),
        },
        Ok(Err(_)) => app.show_flash(format!(
            "Refresh timed out ({}s). Will retry on next refresh.",
            FETCH_TIMEOUT.as_secs()
        )),
        Err(e) => app.show_flash(format!("Refresh task panicked: {}", e)),
    }
}

/// Whether a pending refresh request may start a fetch now
fn refresh_allowed(app: &App) -> bool {
    app.force_refresh
        || (app.input_mode == InputMode::Normal
            && app.last_interaction.elapsed() >= IDLE_BEFORE_REFRESH)
}

pub async fn run_tui(mut app: App) -> anyhow::Result<()> {
    // Log lines would tear the alternate screen; hold them until exit
    crate::stderr_buffer::activate();
    let mut terminal = ratatui::init();

    let mut events = EventHandler::new(
        TICK,
        Duration::from_secs(app.config.auto_refresh_interval),
    );
    let mut pending_fetch = Some(spawn_fetch(&mut app));

    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &mut app)) {
            break Err(e.into());
        }

        match events.next().await {
            Event::Key(key) => {
                app.last_interaction = Instant::now();
                handle_key_event(&mut app, key);
            }
            Event::Tick => {
                app.update_flash();
                app.advance_spinner();
            }
            Event::Refresh => app.needs_refresh = true,
            Event::Resize => {}
        }

        if let Some(handle) = pending_fetch.take_if(|h| h.is_finished()) {
            finish_fetch(&mut app, handle.await);
        }

        // An unmet request stays set and is retried on the next event
        if app.needs_refresh && pending_fetch.is_none() && refresh_allowed(&app) {
            app.needs_refresh = false;
            if app.force_refresh {
                app.force_refresh = false;
                if let Some(cache) = app.source.cache() {
                    cache.clear_memory();
                }
            }
            pending_fetch = Some(spawn_fetch(&mut app));
        }

        if app.should_quit {
            break Ok(());
        }
    };

    ratatui::restore();
    for line in crate::stderr_buffer::drain() {
        eprintln!("{}", line);
    }

    result
}

fn handle_key_event(app: &mut App, key: KeyEvent) {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::DeferInput => handle_defer_key(app, key),
        InputMode::Breakdown => handle_breakdown_key(app, key),
        // Any key closes help
        InputMode::Help => app.dismiss_help(),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }

        KeyCode::Char('j') | KeyCode::Down => app.next_row(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_row(),
        KeyCode::Tab => app.toggle_view(),

        KeyCode::Enter | KeyCode::Char('o') => open_in_browser(app),

        KeyCode::Char('a') => app.accept_selected(),
        KeyCode::Char('x') => app.reject_selected(),
        KeyCode::Char('d') => app.start_defer_input(),
        KeyCode::Char('u') => app.revoke_selected(),
        KeyCode::Char('z') => app.undo_last(),

        // Manual refresh bypasses the in-memory response cache
        KeyCode::Char('r') => {
            app.needs_refresh = true;
            app.force_refresh = true;
            app.show_flash("Refreshing (fresh data)...".to_string());
        }

        KeyCode::Char('b') => app.show_breakdown(),
        KeyCode::Char('?') => app.show_help(),
        _ => {}
    }
}

fn handle_defer_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.confirm_defer_input(),
        KeyCode::Esc => app.cancel_defer_input(),
        KeyCode::Backspace => {
            app.defer_input.pop();
        }
        // Durations are things like "3d" or "1w 2d"
        KeyCode::Char(c) if c.is_alphanumeric() || c == ' ' => app.defer_input.push(c),
        _ => {}
    }
}

fn handle_breakdown_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('b') => app.dismiss_breakdown(),
        // Browse breakdowns without closing the popup
        KeyCode::Char('j') | KeyCode::Down => app.next_row(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_row(),
        _ => {}
    }
}

fn open_in_browser(app: &mut App) {
    let Some(label) = app.selected_cluster().map(|c| c.short_ref()) else {
        return;
    };
    match app.open_selected() {
        Ok(()) => app.show_flash(format!("Opened: {}", label)),
        Err(e) => app.show_flash(format!("Failed to open browser: {}", e)),
    }
}
