//! Session lifecycle: discovery, creation, guessing, and game end.

mod controller;
mod error;
mod state;

pub use controller::GameController;
pub use error::ControllerError;
pub use state::{
    ActiveGame, GameEvent, GameResult, GameView, LifecycleState, Phase, SubmitOutcome,
};
