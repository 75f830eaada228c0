use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::catalog::CatalogClient;
use crate::playback::{ExternalBackend, PlaybackController, SystemClock};

mod cli;
mod event_loop;
mod logging;
mod settings;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let settings::LoadedSettings {
        mut settings,
        fallback,
    } = settings::load_settings();

    if let Some(base_url) = args.base_url {
        settings.server.base_url = base_url;
        settings.validate().context("invalid base URL argument")?;
    }

    if args.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let _log_guard = logging::init(&settings.logging, args.log_filter.as_deref())?;
    if let Some(e) = &fallback {
        tracing::warn!(error = %e, "config rejected, running with defaults");
    }
    tracing::info!(
        base_url = %settings.server.base_url,
        player = %settings.player.command,
        "starting cadenza"
    );

    let client = CatalogClient::new(
        &settings.server.base_url,
        Duration::from_secs(settings.server.request_timeout_secs),
    )?;
    let mut player = PlaybackController::new(
        Box::new(ExternalBackend::new(settings.player.clone())),
        Box::new(SystemClock),
        client.base_url().clone(),
    );

    let mut app = App::new(settings.ui.show_directories);
    app.set_server(client.base_url().to_string());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &mut player, &client);

    // Kill the player before the terminal comes back.
    player.stop();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &run_result {
        tracing::error!(error = %e, "event loop failed");
    }
    tracing::info!("shutting down");
    run_result
}
