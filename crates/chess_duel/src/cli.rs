//! Command-line interface for chess_duel.

use std::path::PathBuf;

use clap::Parser;

/// Chess Duel - two-player chess, on one terminal or between two machines
#[derive(Parser, Debug)]
#[command(name = "chess_duel")]
#[command(about = "Two-player chess client with local and online matches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (created on save if it doesn't exist)
    #[arg(long, default_value = "chess_duel.toml")]
    pub settings: PathBuf,

    /// Peer host; overrides the settings file
    #[arg(long)]
    pub host: Option<String>,

    /// Peer port; overrides the settings file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "chess_duel.log")]
    pub log_file: PathBuf,
}
