//! Command-line interface for shwordle.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shwordle - shared two-player word guessing
#[derive(Parser, Debug)]
#[command(name = "shwordle")]
#[command(about = "Play a shared Wordle session from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Player identifier (falls back to SHWORDLE_PLAYER)
    #[arg(short, long, global = true)]
    pub player: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new game with WORD as the hidden target
    Create {
        /// Five-letter target word
        word: String,
    },

    /// Guess a word in the game in progress
    Guess {
        /// Five-letter guess
        word: String,
    },

    /// Print the current board
    Show,

    /// Give up on the game in progress
    Abandon,

    /// Follow the game and print changes until interrupted
    Watch,
}
