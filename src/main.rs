mod app;
mod catalog;
mod config;
mod library;
mod playback;
mod runtime;
mod ui;

fn main() -> anyhow::Result<()> {
    runtime::run()
}
