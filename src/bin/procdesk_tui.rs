//! procdesk TUI binary entry point

use anyhow::Result;
use clap::Parser;
use tracing::info;

use procdesk::{config::Config, screens::ScreenKind};

#[derive(Parser)]
#[command(name = "procdesk-tui")]
#[command(about = "Procurement desk terminal user interface")]
#[command(version)]
pub struct Cli {
    /// Screen to open first: dashboard, reports, orders, facilities, transactions
    #[arg(long, value_parser = parse_screen)]
    pub screen: Option<ScreenKind>,

    /// API base URL (overrides PROCDESK_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,
}

fn parse_screen(value: &str) -> Result<ScreenKind, String> {
    ScreenKind::parse(value).ok_or_else(|| format!("unknown screen '{}'", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "procdesk=info");
    }

    // Log to a file so tracing output does not draw over the terminal UI
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("procdesk_tui.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting procdesk TUI...");

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }
    config.validate()?;

    procdesk::tui::run_tui(config, cli.screen).await
}
