use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::{App, Focus, SelectionOutcome};
use crate::catalog::{CatalogClient, PendingFetch};
use crate::config;
use crate::playback::{PlaybackController, PlaybackEvent};
use crate::ui;

/// How long to wait for input before the next playback poll and redraw.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Main terminal event loop: applies fetch results, drives the playback
/// controller, draws and handles input. Returns `Ok(())` on quit.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &mut PlaybackController,
    client: &CatalogClient,
) -> anyhow::Result<()> {
    let mut pending = Some(start_fetch(app, client));

    loop {
        if let Some(result) = pending.as_ref().and_then(PendingFetch::try_take) {
            pending = None;
            app.apply_catalog(result);
        }

        player.poll();
        for event in player.drain_events() {
            report_event(app, event);
        }

        terminal.draw(|f| ui::draw(f, app, player, &settings.ui))?;

        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, app, player, client, &mut pending) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Show a playback notification on the status line.
fn report_event(app: &mut App, event: PlaybackEvent) {
    match event {
        PlaybackEvent::PlayFailed(_) | PlaybackEvent::Ended(_) | PlaybackEvent::ControlFailed(_) => {
            app.set_error_status(event.to_string())
        }
        _ => app.set_status(event.to_string()),
    }
}

fn start_fetch(app: &mut App, client: &CatalogClient) -> PendingFetch {
    app.loading = true;
    app.set_status(format!("Fetching songs from {}", client.base_url()));
    client.spawn_fetch()
}

/// Hand a selection to the playback controller.
fn route_selection(outcome: SelectionOutcome, player: &mut PlaybackController) {
    match outcome {
        SelectionOutcome::Play(path) => player.play(&path),
        SelectionOutcome::Browsed | SelectionOutcome::Failed => {}
    }
}

/// Returns `true` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    app: &mut App,
    player: &mut PlaybackController,
    client: &CatalogClient,
    pending: &mut Option<PendingFetch>,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            Focus::Tree => app.next(),
            Focus::Table => app.table_next(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            Focus::Tree => app.prev(),
            Focus::Table => app.table_prev(),
        },
        KeyCode::Char('g') | KeyCode::Home => app.first(),
        KeyCode::Char('G') | KeyCode::End => app.last(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            let outcome = match app.focus {
                Focus::Tree => app.select_current(),
                Focus::Table => app.select_table_row(),
            };
            route_selection(outcome, player);
        }
        KeyCode::Char('h') | KeyCode::Left => match app.focus {
            Focus::Tree => app.collapse_or_parent(),
            Focus::Table => app.toggle_focus(),
        },
        KeyCode::Char(' ') | KeyCode::Char('p') => player.toggle_pause(),
        KeyCode::Char('s') => player.stop(),
        KeyCode::Char('r') => {
            if pending.is_none() {
                *pending = Some(start_fetch(app, client));
            }
        }
        _ => {}
    }

    false
}
