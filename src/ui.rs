//! ratatui rendering: library tree, track table, progress gauge and status.
//!
//! Drawing only reads `App` and the playback controller; it never mutates them.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{
        Block, Borders, Cell, Gauge, List, ListItem, ListState, Padding, Paragraph, Row, Table,
        TableState, Wrap,
    },
};
use std::time::Duration;

use crate::app::{App, Focus, TreeRow};
use crate::config::UiSettings;
use crate::library::NodeKey;
use crate::playback::{PlaybackController, ProgressState};

const CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("enter/l", "open/play"),
    ("h", "collapse"),
    ("g/G", "top/bottom"),
    ("tab", "tree/table"),
    ("space/p", "play/pause"),
    ("s", "stop"),
    ("r", "refresh"),
    ("q", "quit"),
];

/// Render the controls help text.
fn controls_text() -> String {
    CONTROLS
        .iter()
        .map(|(k, v)| format!("[{}] {}", k, v))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
pub fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Label for the progress gauge: `elapsed / total (pct%)`.
pub fn progress_label(player: &PlaybackController) -> String {
    if player.session().is_none() {
        return "stopped".to_string();
    }

    let elapsed = format_mmss(player.elapsed());
    let state = if player.is_playing() { "" } else { " (paused)" };
    match player.duration() {
        Some(total) => format!(
            "{} / {}  {:.0}%{}",
            elapsed,
            format_mmss(total),
            player.percent(),
            state
        ),
        None => format!("{} / --:--{}", elapsed, state),
    }
}

fn tree_item(row: &TreeRow) -> ListItem<'static> {
    let indent = "  ".repeat(row.key.depth());
    let marker = match (&row.key, row.expandable, row.expanded) {
        (NodeKey::Track { .. }, _, _) => "♪ ",
        (NodeKey::Directory(_), _, _) => "◆ ",
        (_, true, true) => "▾ ",
        (_, true, false) => "▸ ",
        (_, false, _) => "  ",
    };
    ListItem::new(format!("{}{}{}", indent, marker, row.key.label()))
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn draw_tree(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app.rows().iter().map(tree_item).collect();
    let title = if app.loading {
        " library (loading…) ".to_string()
    } else {
        format!(" library ({} tracks) ", app.tree.track_count())
    };

    let list = List::new(items)
        .block(pane_block(title, app.focus == Focus::Tree))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if app.has_rows() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_table(frame: &mut Frame, app: &App, player: &PlaybackController, area: Rect) {
    let playing_path = player.session().map(|s| s.track_path.as_str());

    let rows: Vec<Row> = app
        .table
        .iter()
        .map(|r| {
            let row = Row::new(vec![
                Cell::from(r.number.clone()),
                Cell::from(r.title.clone()),
                Cell::from(r.artist.clone()),
                Cell::from(r.album.clone()),
                Cell::from(r.year.clone()),
                Cell::from(r.duration.clone()),
            ]);
            if r.file_path.is_none() {
                row.style(Style::default().fg(Color::Red))
            } else if r.file_path.as_deref() == playing_path {
                row.style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(35),
        Constraint::Percentage(22),
        Constraint::Percentage(25),
        Constraint::Length(6),
        Constraint::Length(7),
    ];
    let header = Row::new(vec!["#", "Title", "Artist", "Album", "Year", "Time"])
        .style(Style::default().add_modifier(Modifier::UNDERLINED));

    let title = if app.table_title.is_empty() {
        " tracks ".to_string()
    } else {
        format!(" tracks: {} ", app.table_title)
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(pane_block(title, app.focus == Focus::Table))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !app.table.is_empty() {
        state.select(Some(app.table_selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_progress(frame: &mut Frame, player: &PlaybackController, area: Rect) {
    let title = match player.session() {
        Some(s) => format!(" {} ", s.name),
        None => " progress ".to_string(),
    };
    let color = match player.progress_state() {
        ProgressState::Complete => Color::Green,
        _ => Color::Cyan,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(color))
        .ratio((player.percent() / 100.0).clamp(0.0, 1.0))
        .label(progress_label(player));
    frame.render_widget(gauge, area);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, player: &PlaybackController, ui_settings: &UiSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    // Header
    let header_title = match &app.server {
        Some(server) => format!(" cadenza @ {} ", server),
        None => " cadenza ".to_string(),
    };
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(header_title)
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Tree | table
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[1]);
    draw_tree(frame, app, body[0]);
    draw_table(frame, app, player, body[1]);

    draw_progress(frame, player, chunks[2]);

    let status_style = if app.status_is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let status = Paragraph::new(app.status.as_str())
        .style(status_style)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[3]);

    let footer = Paragraph::new(controls_text())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
