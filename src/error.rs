use thiserror::Error;
use crate::action::{Phase, State};

#[derive(Error, Debug)]
pub enum CoupError {
    #[error("no handler registered for state {0:?}")]
    UnhandledState(State),

    #[error("selection {selection} from seat {seat} is not valid in state {state:?}")]
    InvalidSelection {
        state: State,
        selection: usize,
        seat: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("user quit")]
    Quit,

    #[error("bot in seat {seat} found no valid option during {phase:?} after {attempts} attempts")]
    BotExhausted {
        seat: usize,
        phase: Phase,
        attempts: usize,
    },

    #[error("invalid player: {0}")]
    InvalidPlayer(String),

    #[error("seat count must be between 2 and 6, got {0}")]
    InvalidSeatCount(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("input task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CoupError {
    /// Quitting is the only error that ends the process successfully.
    pub fn is_quit(&self) -> bool {
        matches!(self, CoupError::Quit)
    }
}

pub type Result<T> = std::result::Result<T, CoupError>;
