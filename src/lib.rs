pub mod action;
pub mod action_log;
pub mod bot;
pub mod card;
pub mod config;
pub mod controller;
pub mod deck;
pub mod display;
pub mod error;
pub mod game_loop;
pub mod input;
pub mod logging;
pub mod player;
pub mod snapshot;

pub use action::{Action, Phase, State};
pub use action_log::ActionLog;
pub use card::Card;
pub use config::GameConfig;
pub use controller::Controller;
pub use error::{CoupError, Result};
pub use input::{InputHandler, Signal};
pub use player::Player;
pub use snapshot::{InputData, Snapshot};
