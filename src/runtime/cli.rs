use clap::Parser;

/// cadenza - browse a remote music catalog and play it from the terminal
#[derive(Parser, Debug)]
#[command(name = "cadenza", version, about)]
pub struct Args {
    /// Catalog server base URL (overrides `server.base_url`)
    pub base_url: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log filter directive, e.g. `cadenza=debug` (overrides RUST_LOG and config)
    #[arg(long)]
    pub log_filter: Option<String>,
}
