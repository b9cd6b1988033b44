//! Shwordle - operator CLI
//!
//! Plays the shared session stored in a SQLite file, so several terminals
//! (or machines sharing the file) can take turns in the same game.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use shwordle::{
    GameController, GameEvent, GameView, LocalIdentity, Phase, ShwordleConfig, SqliteStore,
    SubmitOutcome, TracingNotifier,
};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let player = cli
        .player
        .clone()
        .or_else(|| std::env::var("SHWORDLE_PLAYER").ok());

    let (mut controller, events) = build_controller(&config, player)?;
    controller.start().await?;

    match cli.command {
        Command::Create { word } => run_create(&mut controller, &word).await,
        Command::Guess { word } => run_guess(&mut controller, &word).await,
        Command::Show => {
            print_view(&controller.view());
            Ok(())
        }
        Command::Abandon => run_abandon(&mut controller).await,
        Command::Watch => run_watch(controller, events).await,
    }
}

/// Reads the config file if given, then applies command-line overrides.
#[instrument(skip(cli))]
fn load_config(cli: &Cli) -> Result<ShwordleConfig> {
    let config = match &cli.config {
        Some(path) => ShwordleConfig::from_file(path)?,
        None => ShwordleConfig::default(),
    };
    Ok(match &cli.db {
        Some(db) => config.with_database_path(db.clone()),
        None => config,
    })
}

fn build_controller(
    config: &ShwordleConfig,
    player: Option<String>,
) -> Result<(GameController, mpsc::UnboundedReceiver<GameEvent>)> {
    let store = SqliteStore::open(config.database_path(), *config.event_capacity())?;
    let dictionary = config.dictionary()?;
    let identity = match player {
        Some(player) => LocalIdentity::signed_in(player),
        None => LocalIdentity::signed_out(),
    };

    Ok(GameController::new(
        Arc::new(store),
        Arc::new(dictionary),
        Arc::new(identity),
        Arc::new(TracingNotifier),
        config.sync(),
    ))
}

async fn run_create(controller: &mut GameController, word: &str) -> Result<()> {
    let id = controller.create(word).await?;
    info!(session_id = %id, "Game created");
    println!("Started game {}", id);
    Ok(())
}

async fn run_guess(controller: &mut GameController, word: &str) -> Result<()> {
    let outcome = controller.submit_guess(word).await?;
    match &outcome {
        SubmitOutcome::Accepted { move_number } => {
            controller.resume().await?;
            print_view(&controller.view());
            println!("Guess {} recorded.", move_number);
        }
        SubmitOutcome::Won(result) => {
            println!("You got it: {}", result.word().as_str().to_uppercase());
        }
        SubmitOutcome::Exhausted(result) => {
            println!(
                "Out of guesses. The word was {}.",
                result.word().as_str().to_uppercase()
            );
        }
        SubmitOutcome::Rejected => {
            println!("Move rejected: the game changed before your guess landed.");
            print_view(&controller.view());
        }
        SubmitOutcome::SessionGone => println!("That game no longer exists."),
    }
    Ok(())
}

async fn run_abandon(controller: &mut GameController) -> Result<()> {
    let result = controller.abandon().await?;
    println!(
        "Game abandoned. The word was {}.",
        result.word().as_str().to_uppercase()
    );
    Ok(())
}

async fn run_watch(
    mut controller: GameController,
    mut events: mpsc::UnboundedReceiver<GameEvent>,
) -> Result<()> {
    print_view(&controller.view());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            more = controller.next_update() => {
                if !more {
                    break;
                }
            }
        }

        let mut changed = false;
        while let Ok(event) = events.try_recv() {
            println!("* {}", describe(&event));
            changed = true;
        }
        if changed {
            print_view(&controller.view());
        }
    }
    Ok(())
}

fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::SessionAdopted { session_id } => format!("joined game {}", session_id),
        GameEvent::SessionUpdated {
            session_id,
            players,
        } => format!("game {} now has {} players", session_id, players),
        GameEvent::BoardUpdated { filled_rows, .. } => format!("{} guesses on the board", filled_rows),
        GameEvent::MoveAccepted { move_number, .. } => format!("guess {} recorded", move_number),
        GameEvent::MoveRejected { .. } => "guess rejected, game changed".to_string(),
        GameEvent::GameEnded(result) => format!(
            "game over ({}), the word was {}",
            result.status(),
            result.word().as_str().to_uppercase()
        ),
        GameEvent::SessionRemoved { session_id } => format!("game {} was removed", session_id),
        GameEvent::Reset => "local state reset".to_string(),
        GameEvent::SignedIn { player_id } => format!("signed in as {}", player_id),
        GameEvent::SignedOut => "signed out".to_string(),
    }
}

fn print_view(view: &GameView) {
    match view.phase() {
        Phase::NoSession => {
            println!("No game in progress.");
            match view.last_player() {
                Some(holder) if !*view.may_start_new_game() => {
                    println!("Waiting for {} to start the next game.", holder)
                }
                _ if *view.may_start_new_game() => {
                    println!("Start one with `shwordle create <word>`.")
                }
                _ => {}
            }
        }
        Phase::Active => {
            if let Some(id) = view.session_id() {
                println!("Game {}  players: {}", id, view.players().join(", "));
            }
            println!("{}", view.board().display());
            let keys: String = view
                .board()
                .keyboard()
                .iter()
                .map(|(letter, state)| format!("{}:{} ", letter, state))
                .collect();
            if !keys.is_empty() {
                println!("{}", keys.trim_end());
            }
        }
        Phase::Ended => {
            println!("{}", view.board().display());
            if let (Some(status), Some(word)) = (view.status(), view.target_word()) {
                println!("Game over ({}). The word was {}.", status, word.as_str().to_uppercase());
            }
            match view.last_player() {
                Some(holder) if !*view.may_start_new_game() => {
                    println!("Waiting for {} to start the next game.", holder)
                }
                _ => println!("You may start the next game."),
            }
        }
    }
}
