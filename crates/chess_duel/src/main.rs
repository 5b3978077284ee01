//! Chess Duel - terminal client
//!
//! Loads the settings, applies command-line overrides and runs the screen
//! controller until the user quits.

#![warn(missing_docs)]

mod cli;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use chess_duel::{PeerAddress, SandboxEngine, ScreenController, Settings, TcpConnector};
use clap::Parser;
use cli::Cli;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli)?;

    info!(settings = %cli.settings.display(), "Starting Chess Duel");
    let settings = load_settings(&cli)?;

    let mut controller = ScreenController::new(
        settings,
        Some(cli.settings.clone()),
        Box::new(SandboxEngine::new()),
        Arc::new(TcpConnector::new()),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = controller.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Event loop error");
    }
    info!("Chess Duel exited");
    res
}

/// Sends tracing output to the log file so it doesn't fight with the UI.
fn initialize_tracing(cli: &Cli) -> Result<()> {
    let log_file = std::fs::File::create(&cli.log_file)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chess_duel=debug")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Loads the settings file and applies `--host` / `--port`.
#[instrument(skip(cli))]
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(&cli.settings)?;
    if cli.host.is_some() || cli.port.is_some() {
        let current = settings.address();
        let host = cli.host.clone().unwrap_or_else(|| current.host().clone());
        let port = cli.port.unwrap_or(*current.port());
        let address = PeerAddress::new(host, port);
        info!(address = %address, "Peer address overridden from the command line");
        settings.set_address(address);
    }
    Ok(settings)
}
