//! Terminal user interface over the five data screens

pub mod app;
pub mod data_screen;
pub mod ui;

pub use app::App;
pub use data_screen::{DataScreen, ScreenAction};

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{error, info};

use crate::config::Config;
use crate::screens::ScreenKind;

/// Set up the terminal, run the app on `start`, and restore the terminal
pub async fn run_tui(config: Config, start: Option<ScreenKind>) -> Result<()> {
    let mut app = App::new(config)?;
    if let Some(kind) = start {
        app.open(kind);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    match &result {
        Ok(_) => info!("TUI exited successfully"),
        Err(e) => error!("TUI encountered an error: {}", e),
    }
    result
}
